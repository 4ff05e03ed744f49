//! Git-repository documentation harvester (spec §4.5): archive download
//! with branch fallback, shallow-clone fallback, hardened tar extraction,
//! and a recursive Markdown-family file walk.

use crate::common::content_hash_hex;
use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use doctide_convert::{fence_as_code_block, Converter};
use doctide_fetch::Fetcher;
use doctide_types::{DocError, DocResult, Document, Platform, RepoUrlInfo, SourceStrategy};
use futures::stream::{self, StreamExt};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Directory names skipped outright during the file walk.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    ".nuxt",
];

/// Extensions collected from the working tree. `.md`/`.mdx` pass through
/// as-is; the rest are wrapped in a fenced code block keyed by extension.
const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "adoc", "txt"];
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Hosts handled by the dedicated generated-API-docs strategy; the Git
/// strategy defers to it even when a host otherwise looks git-shaped.
const DOCS_HOST_EXCLUSIONS: &[&str] = &["docs.rs", "pkg.go.dev", "hexdocs.pm"];

pub struct GitStrategy;

#[async_trait]
impl Strategy for GitStrategy {
    fn name(&self) -> &'static str {
        "git"
    }

    fn can_handle(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https" | "ssh") {
            return false;
        }
        if looks_like_wiki_path(url.path()) {
            return false;
        }
        if url
            .host_str()
            .map(|h| DOCS_HOST_EXCLUSIONS.contains(&h.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
        {
            return false;
        }
        parse_repo_url(url).is_some()
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        let info = parse_repo_url(url).ok_or_else(|| DocError::UrlParse(url.to_string()))?;
        harvest(container, &info).await
    }
}

fn looks_like_wiki_path(path: &str) -> bool {
    path.ends_with(".wiki.git") || path.split('/').any(|s| s.eq_ignore_ascii_case("wiki"))
}

/// Owns the temp directory the repository was acquired into, so it stays
/// alive for the duration of the walk.
struct AcquiredRepo {
    root: PathBuf,
    branch: String,
    _tempdir: tempfile::TempDir,
}

async fn harvest(container: &Container, info: &RepoUrlInfo) -> DocResult<()> {
    container.check_cancelled()?;

    let acquired = if wants_ssh_clone(info) {
        clone_shallow(container, info).await?
    } else {
        match acquire_via_archive(container, info).await {
            Ok(repo) => repo,
            Err(e) => {
                debug!(repo = %info.repo_url, error = %e, "archive acquisition failed, falling back to clone");
                clone_shallow(container, info).await?
            }
        }
    };

    let walk_root = match &info.subpath {
        Some(subpath) => {
            let candidate = acquired.root.join(subpath);
            if !candidate.is_dir() {
                return Err(DocError::FilterSubpathMissing(subpath.clone()));
            }
            candidate
        }
        None => acquired.root.clone(),
    };

    let files = collect_doc_files(&walk_root, &acquired.root)?;
    process_files(container, info, &acquired.branch, files).await
}

/// `git@host:owner/repo.git`-shaped input never reaches here as a parsed
/// `Url` (no scheme), so this only fires for `ssh://` URLs or an explicit
/// `git` userinfo — the one shape that *does* parse.
fn wants_ssh_clone(info: &RepoUrlInfo) -> bool {
    info.repo_url.starts_with("ssh://") || info.clone_url().starts_with("git@")
}

async fn acquire_via_archive(container: &Container, info: &RepoUrlInfo) -> DocResult<AcquiredRepo> {
    let branch = detect_default_branch(container, info)
        .await
        .unwrap_or_else(|| "main".to_string());

    match try_archive(container, info, &branch).await {
        Ok(tempdir) => {
            let root = tempdir.path().to_path_buf();
            Ok(AcquiredRepo { root, branch, _tempdir: tempdir })
        }
        Err(e) if branch == "main" => match try_archive(container, info, "master").await {
            Ok(tempdir) => {
                let root = tempdir.path().to_path_buf();
                Ok(AcquiredRepo { root, branch: "master".to_string(), _tempdir: tempdir })
            }
            Err(_) => Err(e),
        },
        Err(e) => Err(e),
    }
}

async fn try_archive(container: &Container, info: &RepoUrlInfo, branch: &str) -> DocResult<tempfile::TempDir> {
    container.check_cancelled()?;
    let dest = tempfile::tempdir().map_err(|e| DocError::Setup(format!("failed to create temp dir: {e}")))?;
    let url = info.archive_url(branch);
    let bytes = fetch_archive_bytes(container, &url, info.platform).await?;
    extract_tar_gz(&bytes, dest.path())?;
    Ok(dest)
}

async fn fetch_archive_bytes(container: &Container, url: &str, platform: Platform) -> DocResult<Vec<u8>> {
    let client = container.fetcher().transport();
    let mut request = client.get(url);
    if let Some(var) = platform.env_token_var() {
        if let Ok(token) = std::env::var(var) {
            request = request.header("Authorization", format!("token {token}"));
        }
    }

    let response = request
        .send()
        .await
        .map_err(|e| DocError::Transport { url: url.to_string(), source: anyhow::anyhow!(e) })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DocError::Archive { repo: url.to_string(), message: format!("HTTP {status}") });
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| DocError::Transport { url: url.to_string(), source: anyhow::anyhow!(e) })
}

async fn detect_default_branch(container: &Container, info: &RepoUrlInfo) -> Option<String> {
    container.check_cancelled().ok()?;
    let output = tokio::process::Command::new("git")
        .args(["ls-remote", "--symref", &info.clone_url(), "HEAD"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines().find_map(|line| {
        line.strip_prefix("ref: refs/heads/")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
    })
}

async fn clone_shallow(container: &Container, info: &RepoUrlInfo) -> DocResult<AcquiredRepo> {
    container.check_cancelled()?;
    let tmp = tempfile::tempdir().map_err(|e| DocError::Setup(format!("failed to create temp dir: {e}")))?;

    let token = info.platform.env_token_var().and_then(|v| std::env::var(v).ok());
    let clone_url = authenticated_clone_url(info, token.as_deref());
    let branch = detect_default_branch(container, info).await.unwrap_or_else(|| "main".to_string());

    let status = tokio::process::Command::new("git")
        .args(["clone", "--depth", "1", "--branch", &branch, &clone_url, "."])
        .current_dir(tmp.path())
        .status()
        .await
        .map_err(|e| DocError::Setup(format!("git clone failed to start: {e}")))?;

    if !status.success() {
        return Err(DocError::Setup(format!("git clone of {} failed", info.repo_url)));
    }

    let root = tmp.path().to_path_buf();
    Ok(AcquiredRepo { root, branch, _tempdir: tmp })
}

fn authenticated_clone_url(info: &RepoUrlInfo, token: Option<&str>) -> String {
    let raw = info.clone_url();
    let Some(token) = token else { return raw };
    match Url::parse(&raw) {
        Ok(mut url) => {
            let _ = url.set_username(token);
            let _ = url.set_password(Some("x-oauth-basic"));
            url.to_string()
        }
        Err(_) => raw,
    }
}

/// Extracts a `tar.gz` byte stream into `dest`, stripping the single
/// top-level directory every platform archive wraps its contents in and
/// rejecting any entry whose cleaned path would escape `dest`.
fn extract_tar_gz(bytes: &[u8], dest: &Path) -> DocResult<()> {
    let decoder = flate2::read::GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| DocError::Archive { repo: dest.display().to_string(), message: e.to_string() })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| DocError::Archive { repo: dest.display().to_string(), message: e.to_string() })?;
        let raw_path = entry
            .path()
            .map_err(|e| DocError::Archive { repo: dest.display().to_string(), message: e.to_string() })?
            .into_owned();

        // Strip the top-level `repo-branch/` directory the archive wraps
        // everything in.
        let mut components = raw_path.components();
        components.next();
        let relative: PathBuf = components.collect();
        if relative.as_os_str().is_empty() {
            continue;
        }

        let Some(cleaned) = clean_relative_path(&relative) else {
            warn!(entry = %raw_path.display(), "tar entry escapes destination root, skipping");
            continue;
        };
        if cleaned.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&cleaned);

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&target)
                    .map_err(|e| DocError::Write { path: target.clone(), source: e })?;
                set_dir_mode(&target);
            }
            tar::EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| DocError::Write { path: parent.to_path_buf(), source: e })?;
                }
                entry
                    .unpack(&target)
                    .map_err(|e| DocError::Write { path: target.clone(), source: e })?;
            }
            _ => continue,
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_dir_mode(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755));
}

#[cfg(not(unix))]
fn set_dir_mode(_path: &Path) {}

/// Normalizes `..`/`.` components, rejecting any path that would climb
/// above the (empty) root it's being cleaned relative to.
fn clean_relative_path(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => out.push(segment),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Walks the working tree with `ignore::WalkBuilder` so `.gitignore`-excluded
/// files (vendored assets, build output a repo already tells Git to skip)
/// never reach the document set, on top of the fixed `IGNORED_DIRS` denylist
/// spec §4.5 requires regardless of what a repo's `.gitignore` happens to say.
fn collect_doc_files(walk_root: &Path, repo_root: &Path) -> DocResult<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let walker = ignore::WalkBuilder::new(walk_root)
        .hidden(false)
        .filter_entry(|entry| {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                let name = entry.file_name().to_string_lossy();
                !IGNORED_DIRS.contains(&name.as_ref())
            } else {
                true
            }
        })
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| DocError::Setup(format!("repository walk failed: {e}")))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !DOC_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        let relative = entry.path().strip_prefix(repo_root).unwrap_or(entry.path());
        let relative_slash = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), relative_slash));
    }
    Ok(files)
}

async fn process_files(
    container: &Container,
    info: &RepoUrlInfo,
    branch: &str,
    files: Vec<(PathBuf, String)>,
) -> DocResult<()> {
    let concurrency = container.opts.effective_concurrency();
    let results: Vec<DocResult<()>> = stream::iter(files)
        .map(|(abs_path, relative_slash)| async move {
            process_file(container, info, branch, &abs_path, &relative_slash)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for result in results {
        match result {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(error = %e, "dropping repository file after strategy-level error"),
        }
    }
    Ok(())
}

fn process_file(
    container: &Container,
    info: &RepoUrlInfo,
    branch: &str,
    abs_path: &Path,
    relative_slash: &str,
) -> DocResult<()> {
    container.check_cancelled()?;

    let metadata = std::fs::metadata(abs_path).map_err(|e| DocError::Write { path: abs_path.to_path_buf(), source: e })?;
    if metadata.len() > MAX_FILE_BYTES {
        debug!(path = %abs_path.display(), "skipping file over the 10 MiB cap");
        return Ok(());
    }

    let raw = match std::fs::read_to_string(abs_path) {
        Ok(s) => s,
        Err(_) => {
            debug!(path = %abs_path.display(), "skipping non-UTF-8 file");
            return Ok(());
        }
    };

    let ext = Path::new(relative_slash)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let content = if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
        container.converter().markdown_passthrough(&raw)
    } else {
        container.converter().plain_text_passthrough(&fence_as_code_block(&ext, &raw))
    };

    let doc_url = info.blob_url(branch, relative_slash);
    let relative_path = output_relative_path(info, relative_slash);
    if container.already_written(&relative_path) {
        return Ok(());
    }

    let title = title_from_relative_path(relative_slash);
    let hash = content_hash_hex(&content);
    let doc = Document::new(doc_url, title, content, SourceStrategy::Git)
        .with_relative_path(relative_path.to_string_lossy().to_string())
        .with_content_hash(hash);

    container.write_document(doc)
}

fn output_relative_path(info: &RepoUrlInfo, relative_slash: &str) -> PathBuf {
    let mut path = PathBuf::from(format!("{}-{}", info.owner, info.repo));
    let mut name = relative_slash.to_string();
    if !name.ends_with(".md") && !name.ends_with(".mdx") {
        if let Some(dot) = name.rfind('.') {
            name.truncate(dot);
        }
        name.push_str(".md");
    }
    for segment in name.split('/') {
        path.push(segment);
    }
    path
}

fn title_from_relative_path(relative_slash: &str) -> String {
    Path::new(relative_slash)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative_slash.to_string())
}

/// Parses a Git repository URL into its platform-specific parts: owner,
/// repo, clean `repo_url`, and an optional `/tree/{branch}[/subpath]`
/// (or platform equivalent).
pub fn parse_repo_url(url: &Url) -> Option<RepoUrlInfo> {
    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();

    match host.as_str() {
        "github.com" => parse_tree_style(Platform::Github, "github.com", &segments, "tree"),
        "bitbucket.org" => parse_tree_style(Platform::Bitbucket, "bitbucket.org", &segments, "src"),
        "gitlab.com" => parse_gitlab(&segments),
        _ => parse_generic(url),
    }
}

fn parse_tree_style(platform: Platform, host: &str, segments: &[&str], marker: &str) -> Option<RepoUrlInfo> {
    if segments.len() < 2 {
        return None;
    }
    let owner = segments[0].to_string();
    let repo = strip_git_suffix(segments[1]);
    let repo_url = format!("https://{host}/{owner}/{repo}");

    let (branch, subpath) = if segments.len() > 3 && segments[2] == marker {
        let branch = segments[3].to_string();
        let subpath = decode_subpath(&segments[4..]);
        (Some(branch), subpath)
    } else {
        (None, None)
    };

    Some(RepoUrlInfo { platform, owner, repo, repo_url, branch, subpath })
}

fn parse_gitlab(segments: &[&str]) -> Option<RepoUrlInfo> {
    if segments.len() < 2 {
        return None;
    }
    let owner = segments[0].to_string();
    let repo = strip_git_suffix(segments[1]);
    let repo_url = format!("https://gitlab.com/{owner}/{repo}");

    let (branch, subpath) = if segments.len() > 4 && segments[2] == "-" && segments[3] == "tree" {
        let branch = segments[4].to_string();
        let subpath = decode_subpath(&segments[5..]);
        (Some(branch), subpath)
    } else {
        (None, None)
    };

    Some(RepoUrlInfo { platform: Platform::Gitlab, owner, repo, repo_url, branch, subpath })
}

fn parse_generic(url: &Url) -> Option<RepoUrlInfo> {
    if !url.path().ends_with(".git") {
        return None;
    }
    let mut repo_url = url.as_str().to_string();
    repo_url.truncate(repo_url.len() - 4);
    let repo = repo_url.rsplit('/').next()?.to_string();
    Some(RepoUrlInfo { platform: Platform::Generic, owner: String::new(), repo, repo_url, branch: None, subpath: None })
}

fn strip_git_suffix(segment: &str) -> String {
    segment.strip_suffix(".git").unwrap_or(segment).to_string()
}

fn decode_subpath(segments: &[&str]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    let joined = segments.join("/");
    let decoded = percent_encoding::percent_decode_str(&joined).decode_utf8_lossy().into_owned();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_github_repo() {
        let url = Url::parse("https://github.com/octocat/hello-world").unwrap();
        let info = parse_repo_url(&url).unwrap();
        assert_eq!(info.platform, Platform::Github);
        assert_eq!(info.owner, "octocat");
        assert_eq!(info.repo, "hello-world");
        assert_eq!(info.repo_url, "https://github.com/octocat/hello-world");
        assert_eq!(info.branch, None);
        assert_eq!(info.subpath, None);
    }

    #[test]
    fn parses_github_tree_url_with_subpath() {
        let url = Url::parse("https://github.com/o/r/tree/main/docs/guide").unwrap();
        let info = parse_repo_url(&url).unwrap();
        assert_eq!(info.branch.as_deref(), Some("main"));
        assert_eq!(info.subpath.as_deref(), Some("docs/guide"));
    }

    #[test]
    fn parses_gitlab_nested_tree_marker() {
        let url = Url::parse("https://gitlab.com/group/project/-/tree/develop/src").unwrap();
        let info = parse_repo_url(&url).unwrap();
        assert_eq!(info.platform, Platform::Gitlab);
        assert_eq!(info.branch.as_deref(), Some("develop"));
        assert_eq!(info.subpath.as_deref(), Some("src"));
    }

    #[test]
    fn strips_dot_git_suffix_for_generic_host() {
        let url = Url::parse("https://git.example.com/team/repo.git").unwrap();
        let info = parse_repo_url(&url).unwrap();
        assert_eq!(info.platform, Platform::Generic);
        assert_eq!(info.repo, "repo");
        assert_eq!(info.repo_url, "https://git.example.com/team/repo");
    }

    #[test]
    fn can_handle_excludes_wiki_paths_and_docs_hosts() {
        let strategy = GitStrategy;
        assert!(strategy.can_handle(&Url::parse("https://github.com/o/r").unwrap()));
        assert!(!strategy.can_handle(&Url::parse("https://github.com/o/r/wiki").unwrap()));
        assert!(!strategy.can_handle(&Url::parse("https://docs.rs/serde/latest/serde/").unwrap()));
    }

    #[test]
    fn archive_url_templates_match_spec_exactly() {
        let info = RepoUrlInfo {
            platform: Platform::Github,
            owner: "o".into(),
            repo: "r".into(),
            repo_url: "https://github.com/o/r".into(),
            branch: None,
            subpath: None,
        };
        assert_eq!(info.archive_url("main"), "https://github.com/o/r/archive/refs/heads/main.tar.gz");
    }

    #[test]
    fn cleans_and_rejects_escaping_paths() {
        assert_eq!(clean_relative_path(Path::new("a/b.md")), Some(PathBuf::from("a/b.md")));
        assert_eq!(clean_relative_path(Path::new("../../etc/passwd")), None);
        assert_eq!(clean_relative_path(Path::new("a/../b.md")), Some(PathBuf::from("b.md")));
    }

    #[test]
    fn extract_tar_gz_strips_top_level_dir_and_rejects_escapes() {
        let dest = tempfile::tempdir().unwrap();

        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let mut header = tar::Header::new_gnu();
            let data = b"# Hello\n";
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "repo-main/README.md", &data[..]).unwrap();

            let mut evil_header = tar::Header::new_gnu();
            let evil_data = b"evil";
            evil_header.set_size(evil_data.len() as u64);
            evil_header.set_mode(0o644);
            evil_header.set_cksum();
            builder
                .append_data(&mut evil_header, "repo-main/../../evil.txt", &evil_data[..])
                .unwrap();

            builder.finish().unwrap();
        }

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        use std::io::Write;
        encoder.write_all(&tar_bytes).unwrap();
        let gz_bytes = encoder.finish().unwrap();

        extract_tar_gz(&gz_bytes, dest.path()).unwrap();

        assert!(dest.path().join("README.md").is_file());
        assert!(!dest.path().parent().unwrap().join("evil.txt").exists());
    }

    #[test]
    fn output_relative_path_forces_md_extension() {
        let info = RepoUrlInfo {
            platform: Platform::Github,
            owner: "o".into(),
            repo: "r".into(),
            repo_url: "https://github.com/o/r".into(),
            branch: None,
            subpath: None,
        };
        assert_eq!(output_relative_path(&info, "docs/guide.rst"), PathBuf::from("o-r/docs/guide.md"));
        assert_eq!(output_relative_path(&info, "README.md"), PathBuf::from("o-r/README.md"));
    }

    #[test]
    fn s5_subpath_walk_collects_only_files_under_the_subtree() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("README.md"), "root").unwrap();
        std::fs::create_dir_all(repo.path().join("docs")).unwrap();
        std::fs::write(repo.path().join("docs/a.md"), "a").unwrap();
        std::fs::write(repo.path().join("docs/b.md"), "b").unwrap();

        let walk_root = repo.path().join("docs");
        let files = collect_doc_files(&walk_root, repo.path()).unwrap();
        let mut relatives: Vec<_> = files.into_iter().map(|(_, rel)| rel).collect();
        relatives.sort();

        assert_eq!(relatives, vec!["docs/a.md".to_string(), "docs/b.md".to_string()]);
    }

    #[test]
    fn collect_doc_files_skips_ignored_directories_and_gitignored_paths() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join(".gitignore"), "ignored.md\n").unwrap();
        std::fs::write(repo.path().join("README.md"), "root").unwrap();
        std::fs::write(repo.path().join("ignored.md"), "skip me").unwrap();
        std::fs::create_dir_all(repo.path().join("node_modules")).unwrap();
        std::fs::write(repo.path().join("node_modules/pkg.md"), "vendored").unwrap();

        let files = collect_doc_files(repo.path(), repo.path()).unwrap();
        let relatives: Vec<_> = files.into_iter().map(|(_, rel)| rel).collect();

        assert!(relatives.contains(&"README.md".to_string()));
        assert!(!relatives.iter().any(|r| r.contains("node_modules")));
        assert!(!relatives.contains(&"ignored.md".to_string()));
    }

    fn make_tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            for (name, data) in entries {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, *name, data.as_bytes()).unwrap();
            }
            builder.finish().unwrap();
        }
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        use std::io::Write;
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn s4_archive_falls_back_from_main_to_master_on_404() {
        use crate::container::Container;
        use doctide_types::Options;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/archive/main.tar.gz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gz = make_tar_gz(&[("repo-master/README.md", "# hi\n")]);
        Mock::given(method("GET"))
            .and(path("/archive/master.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gz))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let o = Options { output: dir.path().to_path_buf(), ..Options::default() };
        let container = Container::construct(o, "doctide-test/1.0").unwrap();

        let info = RepoUrlInfo {
            platform: Platform::Generic,
            owner: String::new(),
            repo: "repo".to_string(),
            repo_url: server.uri(),
            branch: None,
            subpath: None,
        };

        let acquired = acquire_via_archive(&container, &info).await.unwrap();
        assert_eq!(acquired.branch, "master");
        assert!(acquired.root.join("README.md").is_file());
    }
}
