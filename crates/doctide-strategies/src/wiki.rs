//! Wiki strategy (spec §4.6): shallow-clones a GitHub-style wiki
//! repository, parses its sidebar structure, rewrites `[[wiki links]]`,
//! and lays the pages out under a section-derived path.

use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use doctide_convert::Converter;
use doctide_types::{DocError, DocResult, Document, SourceStrategy, WikiPage, WikiSection, WikiStructure};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

pub struct WikiStrategy;

#[async_trait]
impl Strategy for WikiStrategy {
    fn name(&self) -> &'static str {
        "wiki"
    }

    fn can_handle(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        url.path().ends_with(".wiki.git") || url.path().split('/').any(|s| s.eq_ignore_ascii_case("wiki"))
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        let clone_url = wiki_clone_url(url)?;
        let prefix = wiki_output_prefix(&clone_url);
        let tempdir = clone_wiki_repo(container, &clone_url).await?;
        let structure = parse_wiki_dir(tempdir.path())?;
        write_structure(container, &structure, &clone_url, &prefix)
    }
}

/// `owner-repo-wiki` directory prefix, matching the Git strategy's
/// `owner-repo` convention so multiple sources never collide under one
/// output root.
fn wiki_output_prefix(clone_url: &str) -> String {
    let trimmed = clone_url.trim_end_matches(".wiki.git");
    let mut segments = trimmed.rsplit('/');
    let repo = segments.next().unwrap_or("wiki");
    let owner = segments.next().unwrap_or("unknown");
    format!("{owner}-{repo}-wiki")
}

/// Converts a wiki page URL (`.../owner/repo/wiki[/Page]`) or an explicit
/// `.wiki.git` clone URL into the clone URL to shallow-clone.
fn wiki_clone_url(url: &Url) -> DocResult<String> {
    if url.path().ends_with(".wiki.git") {
        return Ok(url.as_str().trim_end_matches('/').to_string());
    }

    let host = url.host_str().unwrap_or("github.com");
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    let wiki_idx = segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case("wiki"))
        .ok_or_else(|| DocError::UrlParse(url.to_string()))?;
    if wiki_idx < 2 {
        return Err(DocError::UrlParse(url.to_string()));
    }
    let owner = segments[wiki_idx - 2];
    let repo = segments[wiki_idx - 1];
    Ok(format!("https://{host}/{owner}/{repo}.wiki.git"))
}

async fn clone_wiki_repo(container: &Container, clone_url: &str) -> DocResult<tempfile::TempDir> {
    container.check_cancelled()?;
    let tmp = tempfile::tempdir().map_err(|e| DocError::Setup(format!("failed to create temp dir: {e}")))?;

    let status = tokio::process::Command::new("git")
        .args(["clone", "--depth", "1", clone_url, "."])
        .current_dir(tmp.path())
        .status()
        .await
        .map_err(|e| DocError::Setup(format!("git clone failed to start: {e}")))?;

    if !status.success() {
        return Err(DocError::Setup(format!("failed to clone wiki repository {clone_url}")));
    }
    Ok(tmp)
}

/// Reads every `.md`/`.markdown` file directly under `dir` and builds the
/// sidebar-derived (or synthesized) section structure. Pure filesystem
/// logic, kept separate from the network clone step so it can be unit
/// tested against a plain directory.
fn parse_wiki_dir(dir: &Path) -> DocResult<WikiStructure> {
    let mut pages: HashMap<String, WikiPage> = HashMap::new();
    let mut sidebar_content: Option<String> = None;

    let entries = std::fs::read_dir(dir).map_err(|e| DocError::Setup(format!("failed to read wiki directory: {e}")))?;
    for entry in entries {
        let entry = entry.map_err(|e| DocError::Setup(format!("failed to read wiki directory entry: {e}")))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
        if ext != "md" && ext != "markdown" {
            continue;
        }

        let raw_content = std::fs::read_to_string(&path)
            .map_err(|e| DocError::Parse { context: filename.to_string(), message: e.to_string() })?;

        let is_special = filename.starts_with('_');
        let is_home = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().eq_ignore_ascii_case("home"))
            .unwrap_or(false);

        if is_special && Path::new(filename).file_stem().map(|s| s.to_string_lossy().eq_ignore_ascii_case("sidebar")).unwrap_or(false) {
            sidebar_content = Some(raw_content.clone());
        }

        let title = derive_title(filename);
        pages.insert(
            filename.to_string(),
            WikiPage { filename: filename.to_string(), title, raw_content, is_special, is_home },
        );
    }

    let (sections, has_sidebar) = match &sidebar_content {
        Some(sidebar) => (parse_sidebar(sidebar, &pages), true),
        None => (synthesize_default_section(&pages), false),
    };

    Ok(WikiStructure { sections, pages, has_sidebar })
}

fn derive_title(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    stem.chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap())
}

fn bracket_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]|#]+)(?:#[^\]|]+)?(?:\|[^\]]+)?\]\]").unwrap())
}

fn markdown_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap())
}

/// Parses the sidebar's headings-as-sections, `[[Name]]`/`[[Name|Label]]`,
/// and `[Label](path)` entries into an ordered section list. Links that
/// appear before the first heading are collected into an implicit leading
/// "Documentation" section rather than dropped — the resolution this
/// repository picked for the ambiguous pre-heading case (see DESIGN.md).
fn parse_sidebar(sidebar_md: &str, pages: &HashMap<String, WikiPage>) -> Vec<WikiSection> {
    let mut sections: Vec<WikiSection> = Vec::new();
    let mut leading: Vec<String> = Vec::new();

    for line in sidebar_md.lines() {
        let trimmed = line.trim();
        if let Some(caps) = heading_regex().captures(trimmed) {
            let name = caps[2].to_string();
            sections.push(WikiSection { name, order: sections.len(), page_filenames: Vec::new() });
            continue;
        }

        for name in extract_entry_names(trimmed) {
            if let Some(filename) = resolve_page_filename(&name, pages) {
                match sections.last_mut() {
                    Some(section) => section.page_filenames.push(filename),
                    None => leading.push(filename),
                }
            }
        }
    }

    if leading.is_empty() {
        return sections;
    }

    let mut with_leading = Vec::with_capacity(sections.len() + 1);
    with_leading.push(WikiSection { name: "Documentation".to_string(), order: 0, page_filenames: leading });
    for section in sections {
        with_leading.push(WikiSection { order: with_leading.len(), ..section });
    }
    with_leading
}

fn extract_entry_names(line: &str) -> Vec<String> {
    let mut names: Vec<String> = bracket_link_regex()
        .captures_iter(line)
        .map(|caps| caps[1].trim().to_string())
        .collect();

    for caps in markdown_link_regex().captures_iter(line) {
        let target = caps[2].trim();
        names.push(page_name_from_path(target));
    }
    names
}

fn page_name_from_path(path: &str) -> String {
    let trimmed = path.trim_start_matches("./");
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".md").unwrap_or(last).to_string()
}

/// Resolves a sidebar entry name to a key in `pages`, trying the exact
/// filename, hyphenated, and underscored variants, each case-insensitively.
fn resolve_page_filename(name: &str, pages: &HashMap<String, WikiPage>) -> Option<String> {
    let candidates = [format!("{name}.md"), format!("{}.md", name.replace(' ', "-")), format!("{}.md", name.replace(' ', "_"))];

    for candidate in &candidates {
        if pages.contains_key(candidate) {
            return Some(candidate.clone());
        }
        if let Some(key) = pages.keys().find(|k| k.eq_ignore_ascii_case(candidate)) {
            return Some(key.clone());
        }
    }
    None
}

fn synthesize_default_section(pages: &HashMap<String, WikiPage>) -> Vec<WikiSection> {
    let mut filenames: Vec<String> = pages.values().filter(|p| !p.is_special).map(|p| p.filename.clone()).collect();
    filenames.sort();

    if let Some(pos) = filenames.iter().position(|f| pages.get(f).map(|p| p.is_home).unwrap_or(false)) {
        let home = filenames.remove(pos);
        filenames.insert(0, home);
    }

    vec![WikiSection { name: "Documentation".to_string(), order: 0, page_filenames: filenames }]
}

/// Rewrites `[[Name|Label]]`, `[[Name#Section]]`, and bare `[[Name]]`
/// references into relative Markdown links, per spec §4.6.
fn rewrite_wiki_links(content: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\[\[([^\]|#]+?)(?:#([^\]|]+))?(?:\|([^\]]+))?\]\]").unwrap());

    re.replace_all(content, |caps: &regex::Captures| {
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let section = caps.get(2).map(|m| m.as_str().trim());
        let label = caps.get(3).map(|m| m.as_str().trim());
        let slug = name.to_lowercase().replace(' ', "-");

        match (label, section) {
            (Some(label), _) => format!("[{label}](./{slug}.md)"),
            (None, Some(section)) => {
                let anchor = section.to_lowercase().replace(' ', "-");
                format!("[{name}](./{slug}.md#{anchor})")
            }
            (None, None) => format!("[{name}](./{slug}.md)"),
        }
    })
    .into_owned()
}

fn wiki_output_path(page: &WikiPage, owning_section: Option<&WikiSection>, prefix: &str, flat: bool) -> PathBuf {
    if page.is_home {
        return PathBuf::from(prefix).join("index.md");
    }
    let filename_lower = page.filename.to_lowercase();
    match owning_section {
        Some(section) if !flat => {
            let slug = section.name.to_lowercase().replace(' ', "-");
            PathBuf::from(prefix).join(slug).join(filename_lower)
        }
        _ => PathBuf::from(prefix).join(filename_lower),
    }
}

fn write_structure(container: &Container, structure: &WikiStructure, wiki_repo_url: &str, prefix: &str) -> DocResult<()> {
    let flat = container.opts.no_folders;
    let repo_base = wiki_repo_url.trim_end_matches(".git").to_string();

    let mut owning: HashMap<&str, &WikiSection> = HashMap::new();
    for section in &structure.sections {
        for filename in &section.page_filenames {
            owning.entry(filename.as_str()).or_insert(section);
        }
    }

    for (filename, page) in &structure.pages {
        if page.is_special {
            continue;
        }
        container.check_cancelled()?;

        let relative_path = wiki_output_path(page, owning.get(filename.as_str()).copied(), prefix, flat);
        if container.already_written(&relative_path) {
            continue;
        }

        let rewritten = rewrite_wiki_links(&page.raw_content);
        let content = container.converter().markdown_passthrough(&rewritten);
        let doc_url = format!("{repo_base}/{filename}");

        let doc = Document::new(doc_url, page.title.clone(), content, SourceStrategy::Wiki)
            .with_relative_path(relative_path.to_string_lossy().to_string());
        let hash = crate::common::content_hash_hex(&doc.content);
        let doc = doc.with_content_hash(hash);

        container.write_document(doc)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctide_types::Options;

    fn opts(output: &std::path::Path) -> Options {
        Options { output: output.to_path_buf(), ..Options::default() }
    }

    #[test]
    fn can_handle_recognizes_wiki_urls() {
        let strategy = WikiStrategy;
        assert!(strategy.can_handle(&Url::parse("https://github.com/o/r/wiki").unwrap()));
        assert!(strategy.can_handle(&Url::parse("https://github.com/o/r/wiki/Guide").unwrap()));
        assert!(strategy.can_handle(&Url::parse("https://github.com/o/r.wiki.git").unwrap()));
        assert!(!strategy.can_handle(&Url::parse("https://github.com/o/r").unwrap()));
    }

    #[test]
    fn wiki_clone_url_from_page_and_git_forms() {
        let page = Url::parse("https://github.com/o/r/wiki/Some-Page").unwrap();
        assert_eq!(wiki_clone_url(&page).unwrap(), "https://github.com/o/r.wiki.git");

        let direct = Url::parse("https://github.com/o/r.wiki.git").unwrap();
        assert_eq!(wiki_clone_url(&direct).unwrap(), "https://github.com/o/r.wiki.git");
    }

    #[test]
    fn derive_title_title_cases_and_splits_separators() {
        assert_eq!(derive_title("getting-started.md"), "Getting Started");
        assert_eq!(derive_title("API_Reference.md"), "API Reference");
    }

    #[test]
    fn rewrite_covers_all_three_link_forms() {
        assert_eq!(rewrite_wiki_links("[[Home]]"), "[Home](./home.md)");
        assert_eq!(rewrite_wiki_links("[[Getting Started|Start Here]]"), "[Start Here](./getting-started.md)");
        assert_eq!(rewrite_wiki_links("[[API#Error Codes]]"), "[API](./api.md#error-codes)");
    }

    #[test]
    fn s6_sidebar_with_sections_lays_out_as_spec_describes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Home.md"), "home content").unwrap();
        std::fs::write(dir.path().join("Guide.md"), "guide content").unwrap();
        std::fs::write(dir.path().join("API.md"), "api content").unwrap();
        std::fs::write(
            dir.path().join("_Sidebar.md"),
            "# Intro\n[[Home]]\n[[Guide]]\n# Reference\n[[API]]\n",
        )
        .unwrap();

        let structure = parse_wiki_dir(dir.path()).unwrap();
        assert!(structure.has_sidebar);
        assert!(structure.is_consistent());
        assert_eq!(structure.sections.len(), 2);
        assert_eq!(structure.sections[0].name, "Intro");
        assert_eq!(structure.sections[1].name, "Reference");

        let mut owning: HashMap<&str, &WikiSection> = HashMap::new();
        for section in &structure.sections {
            for filename in &section.page_filenames {
                owning.entry(filename.as_str()).or_insert(section);
            }
        }

        let home = &structure.pages["Home.md"];
        let guide = &structure.pages["Guide.md"];
        let api = &structure.pages["API.md"];

        let prefix = "o-r-wiki";
        assert_eq!(wiki_output_path(home, owning.get("Home.md").copied(), prefix, false), PathBuf::from("o-r-wiki/index.md"));
        assert_eq!(wiki_output_path(guide, owning.get("Guide.md").copied(), prefix, false), PathBuf::from("o-r-wiki/intro/guide.md"));
        assert_eq!(wiki_output_path(api, owning.get("API.md").copied(), prefix, false), PathBuf::from("o-r-wiki/reference/api.md"));
    }

    #[test]
    fn no_sidebar_synthesizes_single_documentation_section_with_home_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Zeta.md"), "z").unwrap();
        std::fs::write(dir.path().join("Home.md"), "h").unwrap();
        std::fs::write(dir.path().join("Alpha.md"), "a").unwrap();

        let structure = parse_wiki_dir(dir.path()).unwrap();
        assert!(!structure.has_sidebar);
        assert_eq!(structure.sections.len(), 1);
        assert_eq!(structure.sections[0].page_filenames[0], "Home.md");
    }

    #[tokio::test]
    async fn already_written_pages_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();

        let mut pages = HashMap::new();
        pages.insert(
            "Home.md".to_string(),
            WikiPage { filename: "Home.md".to_string(), title: "Home".to_string(), raw_content: "hi".to_string(), is_special: false, is_home: true },
        );
        let structure = WikiStructure { sections: Vec::new(), pages, has_sidebar: false };

        write_structure(&container, &structure, "https://github.com/o/r.wiki.git", "o-r-wiki").unwrap();
        assert!(dir.path().join("o-r-wiki/index.md").is_file());
    }
}
