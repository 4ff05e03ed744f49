//! Generated-API-docs strategy (spec §4.7): BFS over a `rustdoc`-shaped
//! documentation site (docs.rs and friends), extracting per-page item
//! metadata alongside the converted Markdown.

use crate::common::{content_hash_hex, jitter_sleep_range};
use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use dashmap::DashSet;
use doctide_convert::Converter;
use doctide_discovery::mine_links;
use doctide_fetch::Fetcher;
use doctide_render::{needs_render, reject_after_render, Renderer, RenderOptions};
use doctide_types::{canonicalize, DocResult, Document, SourceStrategy};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::path::PathBuf;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Hosts recognized as `rustdoc`-shaped generated documentation sites.
/// Kept broader than strictly necessary so the Git strategy's exclusion
/// list (see `git.rs::DOCS_HOST_EXCLUSIONS`) never claims a URL this
/// strategy doesn't yet know how to walk — see DESIGN.md.
const GENERATED_DOCS_HOSTS: &[&str] = &["docs.rs", "pkg.go.dev", "hexdocs.pm"];

const ASSET_EXTENSIONS: &[&str] = &[".js", ".css", ".svg", ".png", ".ico", ".woff", ".woff2", ".ttf"];
const ASSET_DENYLIST: &[&str] = &["settings.html", "help.html", "search-index.js", "main.js"];

const MAX_CONCURRENCY: usize = 5;

/// A parsed generated-docs URL, per spec §4.7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsUrlModel {
    pub host: String,
    pub crate_name: String,
    pub version: String,
    pub module_path: Vec<String>,
    pub is_crate_page: bool,
    pub is_source_view: bool,
}

pub struct GeneratedDocsStrategy;

#[async_trait]
impl Strategy for GeneratedDocsStrategy {
    fn name(&self) -> &'static str {
        "generated-docs"
    }

    fn can_handle(&self, url: &Url) -> bool {
        match parse_docs_path(url) {
            Some(model) => !model.is_source_view,
            None => false,
        }
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        let model = parse_docs_path(url).ok_or_else(|| doctide_types::DocError::UrlParse(url.to_string()))?;
        let start = build_start_url(&model);
        crawl(container, &model, &start).await
    }
}

/// Normalizes crate-name separators (`-`/`_` are interchangeable in rustdoc
/// module roots) for comparison purposes only; the model itself keeps the
/// name as it appeared in the URL.
fn normalize_crate(name: &str) -> String {
    name.replace('-', "_")
}

/// Parses a host-scoped path into `{crate, version, module-path,
/// is_crate_page, is_source_view}`. Source views (`/src/`, `/source/`) are
/// recognized but not walked further.
pub fn parse_docs_path(url: &Url) -> Option<DocsUrlModel> {
    let host = url.host_str()?.to_ascii_lowercase();
    if !GENERATED_DOCS_HOSTS.contains(&host.as_str()) {
        return None;
    }
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }

    if segments.iter().any(|s| *s == "src" || *s == "source") {
        return Some(DocsUrlModel {
            host,
            crate_name: segments[0].to_string(),
            version: "latest".to_string(),
            module_path: Vec::new(),
            is_crate_page: false,
            is_source_view: true,
        });
    }

    let crate_name = segments[0].to_string();
    let (version, rest_start) = if segments.len() > 1 {
        (segments[1].to_string(), 2)
    } else {
        ("latest".to_string(), 1)
    };

    let mut rest: Vec<String> = segments
        .get(rest_start..)
        .unwrap_or(&[])
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(first) = rest.first() {
        if normalize_crate(first) == normalize_crate(&crate_name) {
            rest.remove(0);
        }
    }
    if let Some(last) = rest.last() {
        if last == "index.html" || last.ends_with(".html") {
            rest.pop();
        }
    }

    let is_crate_page = rest.is_empty();
    Some(DocsUrlModel { host, crate_name, version, module_path: rest, is_crate_page, is_source_view: false })
}

/// Builds the canonical start URL for a model: `https://<host>/<crate>/<version>/<crate>/<module-path>/`.
/// Round-trips through [`parse_docs_path`] back to the same tuple.
pub fn build_start_url(model: &DocsUrlModel) -> Url {
    let mut path = format!("/{}/{}/{}/", model.crate_name, model.version, normalize_crate(&model.crate_name));
    for segment in &model.module_path {
        path.push_str(segment);
        path.push('/');
    }
    Url::parse(&format!("https://{}{}", model.host, path)).expect("constructed URL is always valid")
}

fn is_excluded_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.contains("/src/")
        || lower.contains("/source/")
        || lower.contains("/all.html")
        || lower.contains("/-/rustdoc.static/")
        || lower.contains("/-/static/")
    {
        return true;
    }
    if ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    if let Some(filename) = lower.rsplit('/').next() {
        if ASSET_DENYLIST.contains(&filename) {
            return true;
        }
    }
    false
}

fn accept_link(container: &Container, model: &DocsUrlModel, candidate: &Url) -> bool {
    if is_excluded_path(candidate.path()) {
        return false;
    }
    if container.opts.is_excluded(candidate.as_str()) {
        return false;
    }
    let Some(candidate_model) = parse_docs_path(candidate) else {
        return false;
    };
    if candidate_model.is_source_view {
        return false;
    }
    if normalize_crate(&candidate_model.crate_name) != normalize_crate(&model.crate_name) {
        return false;
    }
    if candidate_model.version != model.version && candidate_model.version != "latest" {
        return false;
    }
    if container.opts.limit_reached(container.processed_count.load(SeqCst)) {
        return false;
    }
    true
}

fn canonical_key(url: &Url) -> String {
    canonicalize(url.as_str(), false).unwrap_or_else(|| url.to_string())
}

/// One converted page, buffered in memory when `opts.split` is false so the
/// crate's pages can be merged into a single document after the crawl ends.
struct PageRecord {
    module_path: Vec<String>,
    title: String,
    url: String,
    content: String,
}

fn merged_output_path(model: &DocsUrlModel) -> PathBuf {
    PathBuf::from(format!("{}-{}.md", model.crate_name, model.version))
}

async fn crawl(container: &Container, model: &DocsUrlModel, start_url: &Url) -> DocResult<()> {
    let visited: Arc<DashSet<String>> = Arc::new(DashSet::new());
    visited.insert(canonical_key(start_url));

    // `--split` (generated-docs only, spec §6): split=true keeps one file per
    // module (the default path layout below); split=false merges every page
    // crawled for this crate into a single `<crate>-<version>.md`. The merge
    // buffer only exists in the latter case.
    let merge_buffer: Option<Mutex<Vec<PageRecord>>> = if container.opts.split { None } else { Some(Mutex::new(Vec::new())) };

    if merge_buffer.is_some() {
        let merged_path = merged_output_path(model);
        if container.already_written(&merged_path) {
            return Ok(());
        }
    }

    let mut frontier = vec![start_url.clone()];
    let mut depth = 0usize;
    let concurrency = container.opts.effective_concurrency().min(MAX_CONCURRENCY);

    while !frontier.is_empty() {
        container.check_cancelled()?;
        if depth > container.opts.max_depth {
            break;
        }
        if container.opts.limit_reached(container.processed_count.load(SeqCst)) {
            break;
        }

        let results: Vec<DocResult<Vec<Url>>> = stream::iter(frontier.drain(..))
            .map(|page_url| {
                let model = model.clone();
                let merge_buffer = merge_buffer.as_ref();
                async move { process_page(container, &model, &page_url, merge_buffer).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut next_frontier = Vec::new();
        for result in results {
            match result {
                Ok(links) => {
                    for link in links {
                        if accept_link(container, model, &link) && visited.insert(canonical_key(&link)) {
                            next_frontier.push(link);
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "dropping generated-docs page after strategy-level error"),
            }
        }

        frontier = next_frontier;
        depth += 1;
    }

    if let Some(buffer) = merge_buffer {
        let records = buffer.into_inner().expect("merge buffer mutex is never poisoned");
        write_merged_document(container, model, records)?;
    }

    Ok(())
}

fn write_merged_document(container: &Container, model: &DocsUrlModel, mut records: Vec<PageRecord>) -> DocResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    records.sort_by(|a, b| a.module_path.cmp(&b.module_path).then_with(|| a.title.cmp(&b.title)));

    let mut content = format!("# {} {}\n", model.crate_name, model.version);
    for record in &records {
        let heading = if record.module_path.is_empty() {
            record.title.clone()
        } else {
            format!("{} ({})", record.title, record.module_path.join("::"))
        };
        content.push_str(&format!("\n## {heading}\n\nSource: <{}>\n\n{}\n", record.url, record.content.trim_end()));
    }

    let url = build_start_url(model);
    let hash = content_hash_hex(&content);
    let relative_path = merged_output_path(model);
    let doc = Document::new(url.as_str(), format!("{} {}", model.crate_name, model.version), content, SourceStrategy::GeneratedDocs)
        .with_description(format!("crate:{} version:{} type:merged-crate", model.crate_name, model.version))
        .with_tags(vec![format!("host:{}", model.host), model.crate_name.clone()])
        .with_relative_path(relative_path.to_string_lossy().to_string())
        .with_content_hash(hash);

    container.write_document(doc)
}

async fn process_page(
    container: &Container,
    model: &DocsUrlModel,
    page_url: &Url,
    merge_buffer: Option<&Mutex<Vec<PageRecord>>>,
) -> DocResult<Vec<Url>> {
    container.check_cancelled()?;
    jitter_sleep_range(Duration::from_millis(500), Duration::from_millis(1500)).await;

    let page_model = parse_docs_path(page_url).unwrap_or_else(|| model.clone());
    let relative_path = page_output_path(model, &page_model, page_url);
    if merge_buffer.is_none() && container.already_written(&relative_path) {
        let response = container.fetcher().get(page_url.as_str()).await?;
        if !response.looks_like_html() {
            return Ok(Vec::new());
        }
        return Ok(mine_links(&response.text(), page_url));
    }

    let response = container.fetcher().get(page_url.as_str()).await?;
    if !response.looks_like_html() {
        debug!(url = %page_url, content_type = ?response.content_type, "dropping unrecognized content type");
        return Ok(Vec::new());
    }

    let mut html = response.text();
    let mut rendered_with_js = false;

    if container.opts.render_js || needs_render(&html) {
        match container.get_renderer().await {
            Ok(renderer) => {
                let render_opts = RenderOptions {
                    timeout: Duration::from_secs(60),
                    stability_wait: Duration::from_secs(2),
                    scroll_to_end: true,
                };
                match renderer.render(page_url.as_str(), &render_opts).await {
                    Ok(page) => {
                        if reject_after_render(&page.html) {
                            debug!(url = %page_url, "post-render content rejected, dropping page");
                            return Ok(Vec::new());
                        }
                        html = page.html;
                        rendered_with_js = true;
                    }
                    Err(e) => warn!(url = %page_url, error = %e, "render failed, falling back to raw HTML"),
                }
            }
            Err(e) => debug!(url = %page_url, error = %e, "renderer unavailable, continuing without it"),
        }
    }

    let links = mine_links(&html, page_url);
    let metadata = extract_page_metadata(&html, model);

    let content = match container.converter().html_to_markdown(&html, page_url.as_str()) {
        Ok(md) => md,
        Err(e) => {
            warn!(url = %page_url, error = %e, "conversion failed, dropping page");
            return Ok(links);
        }
    };

    if let Some(buffer) = merge_buffer {
        buffer.lock().expect("merge buffer mutex is never poisoned").push(PageRecord {
            module_path: page_model.module_path.clone(),
            title: metadata.title,
            url: page_url.to_string(),
            content,
        });
        return Ok(links);
    }

    let hash = content_hash_hex(&content);
    let doc = Document::new(page_url.as_str(), metadata.title, content, SourceStrategy::GeneratedDocs)
        .with_cache_hit(response.from_cache)
        .with_rendered_with_js(rendered_with_js)
        .with_description(metadata.description)
        .with_tags(metadata.tags)
        .with_relative_path(relative_path.to_string_lossy().to_string())
        .with_content_hash(hash);

    container.write_document(doc)?;
    Ok(links)
}

struct PageMetadata {
    title: String,
    description: String,
    tags: Vec<String>,
}

/// Extracts title from `.main-heading h1`, item type from the `<body>`
/// class list, and stability from `.portability`/`.stab` elements.
fn extract_page_metadata(html: &str, model: &DocsUrlModel) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = Selector::parse(".main-heading h1")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| model.crate_name.clone());

    let item_type = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|body| item_type_from_classes(body.value().attr("class").unwrap_or("")))
        .unwrap_or_else(|| "page".to_string());

    let stability = ["div.portability", "span.portability", ".stab"]
        .iter()
        .find_map(|sel_str| {
            Selector::parse(sel_str)
                .ok()
                .and_then(|sel| document.select(&sel).next())
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| "stable".to_string());

    let path_suffix = if model.module_path.is_empty() {
        String::new()
    } else {
        format!(" path:{}", model.module_path.join("/"))
    };
    let description = format!(
        "crate:{} version:{} type:{} stability:{}{}",
        model.crate_name, model.version, item_type, stability, path_suffix
    );

    let tags = vec![format!("host:{}", model.host), model.crate_name.clone(), item_type, stability];

    PageMetadata { title, description, tags }
}

const KNOWN_ITEM_TYPES: &[(&str, &str)] = &[
    ("struct", "struct"),
    ("enum", "enum"),
    ("trait", "trait"),
    ("fn", "function"),
    ("function", "function"),
    ("mod", "module"),
    ("module", "module"),
    ("macro", "macro"),
    ("type", "type"),
    ("constant", "constant"),
    ("const", "constant"),
    ("union", "union"),
    ("primitive", "primitive"),
];

fn item_type_from_classes(class_attr: &str) -> String {
    for class in class_attr.split_whitespace() {
        if let Some((_, normalized)) = KNOWN_ITEM_TYPES.iter().find(|(raw, _)| *raw == class) {
            return normalized.to_string();
        }
    }
    "page".to_string()
}

fn page_output_path(model: &DocsUrlModel, page_model: &DocsUrlModel, page_url: &Url) -> PathBuf {
    let mut path = PathBuf::from(format!("{}-{}", model.crate_name, model.version));
    for segment in &page_model.module_path {
        path.push(segment);
    }

    let raw_last = page_url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("");
    let stem = if raw_last.is_empty() || raw_last == "index.html" {
        "index".to_string()
    } else {
        raw_last.trim_end_matches(".html").to_string()
    };
    path.push(format!("{stem}.md"));
    path
}
