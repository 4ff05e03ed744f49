use serde::{Deserialize, Serialize};

/// The Git hosting platform recognized by the Git URL parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Github,
    Gitlab,
    Bitbucket,
    Generic,
}

impl Platform {
    pub fn env_token_var(&self) -> Option<&'static str> {
        match self {
            Platform::Github => Some("GITHUB_TOKEN"),
            Platform::Gitlab => Some("GITLAB_TOKEN"),
            Platform::Bitbucket => Some("BITBUCKET_TOKEN"),
            Platform::Generic => None,
        }
    }
}

/// Parsed representation of a Git repository URL, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrlInfo {
    pub platform: Platform,
    pub owner: String,
    pub repo: String,
    /// Free of a trailing `.git` suffix.
    pub repo_url: String,
    pub branch: Option<String>,
    /// Slash-normalized, percent-decoded.
    pub subpath: Option<String>,
}

impl RepoUrlInfo {
    /// Archive download URL template for this platform, per spec §6
    /// (reproduced bit-exact).
    pub fn archive_url(&self, branch: &str) -> String {
        match self.platform {
            Platform::Github => format!(
                "https://github.com/{}/{}/archive/refs/heads/{}.tar.gz",
                self.owner, self.repo, branch
            ),
            Platform::Gitlab => format!(
                "https://gitlab.com/{}/{}/-/archive/{}/{}-{}.tar.gz",
                self.owner, self.repo, branch, self.repo, branch
            ),
            Platform::Bitbucket => format!(
                "https://bitbucket.org/{}/{}/get/{}.tar.gz",
                self.owner, self.repo, branch
            ),
            Platform::Generic => format!("{}/archive/{}.tar.gz", self.repo_url, branch),
        }
    }

    pub fn blob_url(&self, branch: &str, relative_path: &str) -> String {
        format!("{}/blob/{}/{}", self.repo_url, branch, relative_path)
    }

    pub fn clone_url(&self) -> String {
        format!("{}.git", self.repo_url)
    }
}
