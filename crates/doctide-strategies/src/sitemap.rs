//! Sitemap strategy (spec §4.3): discovers one or more sitemap entrypoints
//! (direct URL, robots.txt directive, or a fixed list of conventional
//! paths), recursively expands sitemap indexes, then fans the resulting
//! page list out for extraction.

use crate::common::{content_hash_hex, extract_title};
use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use doctide_convert::Converter;
use doctide_discovery::{
    extract_sitemap_directives, maybe_gunzip, parse_sitemap_index, parse_urlset, sniff_kind,
    ExpansionGuard, SitemapKind,
};
use doctide_fetch::Fetcher;
use doctide_output::derive_relative_path;
use doctide_types::{DocError, DocResult, Document, Response, SourceStrategy};
use futures::stream::{self, StreamExt};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};
use url::Url;

/// Fixed fallback paths, tried after robots.txt, in priority order.
const FALLBACK_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap-0.xml",
    "/sitemap_index.xml",
    "/sitemap/sitemap-index.xml",
    "/server-sitemap.xml",
];

pub struct SitemapStrategy;

#[async_trait]
impl Strategy for SitemapStrategy {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn can_handle(&self, url: &Url) -> bool {
        looks_like_sitemap_path(url.path())
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        let entrypoints = discover_entrypoints(container, url).await?;
        let pages = expand(container, entrypoints).await?;
        extract(container, pages).await
    }
}

fn looks_like_sitemap_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with("sitemap.xml")
        || lower.ends_with("sitemap.xml.gz")
        || lower.ends_with("sitemap_index.xml")
        || lower.ends_with("sitemap-index.xml")
        || lower.ends_with("/sitemap")
}

/// If `url` itself sniffs as a valid sitemap document, use it directly.
/// Otherwise probe the origin: robots.txt `Sitemap:` directives first, then
/// the fixed fallback list, picking the lowest-priority responder whose body
/// passes the XML sniff.
async fn discover_entrypoints(container: &Container, url: &Url) -> DocResult<Vec<Url>> {
    if let Ok(response) = container.fetcher().get(url.as_str()).await {
        let gunzipped = maybe_gunzip(&response.body, url.path().to_ascii_lowercase().ends_with(".gz"));
        if sniff_kind(&gunzipped).is_some() {
            return Ok(vec![url.clone()]);
        }
    }
    probe_origin(container, url).await
}

async fn probe_origin(container: &Container, url: &Url) -> DocResult<Vec<Url>> {
    let origin = url
        .join("/")
        .map_err(|_| DocError::UrlParse(url.to_string()))?;

    let mut candidates: Vec<Url> = Vec::with_capacity(FALLBACK_PATHS.len() + 1);
    let robots_url = origin.join("/robots.txt").map_err(|_| DocError::UrlParse(url.to_string()))?;
    candidates.push(robots_url.clone());
    for path in FALLBACK_PATHS {
        if let Ok(u) = origin.join(path) {
            candidates.push(u);
        }
    }

    let fetches: Vec<DocResult<Response>> = futures::future::join_all(
        candidates.iter().map(|u| container.fetcher().get(u.as_str())),
    )
    .await;

    for (candidate, result) in candidates.iter().zip(fetches) {
        container.check_cancelled()?;
        let Ok(response) = result else { continue };

        if candidate == &robots_url {
            let directives = extract_sitemap_directives(&response.text(), &origin);
            if !directives.is_empty() {
                return Ok(directives);
            }
            continue;
        }

        let gunzipped = maybe_gunzip(&response.body, candidate.path().to_ascii_lowercase().ends_with(".gz"));
        if sniff_kind(&gunzipped).is_some() {
            return Ok(vec![candidate.clone()]);
        }
    }

    Err(DocError::Setup(format!(
        "no sitemap discovered for {}",
        url.host_str().unwrap_or_default()
    )))
}

/// Recursively resolves sitemap index entries into a flat, deduplicated
/// page-URL list, respecting the expansion-depth cap and `opts.limit`.
async fn expand(container: &Container, roots: Vec<Url>) -> DocResult<Vec<Url>> {
    let mut guard = ExpansionGuard::new();
    let mut queue: VecDeque<(Url, u32)> = roots.into_iter().map(|u| (u, 0)).collect();
    let mut pages = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some((sitemap_url, depth)) = queue.pop_front() {
        container.check_cancelled()?;
        if !guard.admit(&sitemap_url, depth) {
            continue;
        }
        if container.opts.limit_reached(pages.len()) {
            break;
        }

        let response = match container.fetcher().get(sitemap_url.as_str()).await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %sitemap_url, error = %e, "sitemap fetch failed, skipping");
                continue;
            }
        };
        let gunzipped = maybe_gunzip(&response.body, sitemap_url.path().to_ascii_lowercase().ends_with(".gz"));
        let text = String::from_utf8_lossy(&gunzipped);

        match sniff_kind(&gunzipped) {
            Some(SitemapKind::UrlSet) => match parse_urlset(&text) {
                Ok(urls) => {
                    for u in urls {
                        if seen.insert(u.as_str().to_string()) {
                            pages.push(u);
                        }
                    }
                }
                Err(e) => warn!(url = %sitemap_url, error = %e, "failed to parse urlset"),
            },
            Some(SitemapKind::SitemapIndex) => match parse_sitemap_index(&text) {
                Ok(children) => {
                    for child in children {
                        queue.push_back((child, depth + 1));
                    }
                }
                Err(e) => warn!(url = %sitemap_url, error = %e, "failed to parse sitemapindex"),
            },
            None => debug!(url = %sitemap_url, "body did not sniff as a sitemap document, skipping"),
        }
    }

    if container.opts.limit != 0 {
        pages.truncate(container.opts.limit);
    }
    Ok(pages)
}

async fn extract(container: &Container, pages: Vec<Url>) -> DocResult<()> {
    let concurrency = container.opts.effective_concurrency();
    let results: Vec<DocResult<()>> = stream::iter(pages)
        .map(|page_url| async move { process_page(container, page_url).await })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for result in results {
        match result {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(error = %e, "dropping sitemap page after strategy-level error"),
        }
    }
    Ok(())
}

async fn process_page(container: &Container, page_url: Url) -> DocResult<()> {
    container.check_cancelled()?;

    if container
        .opts
        .limit_reached(container.processed_count.load(std::sync::atomic::Ordering::SeqCst))
    {
        return Ok(());
    }
    if !container.opts.matches_filter(page_url.path()) || container.opts.is_excluded(page_url.as_str()) {
        return Ok(());
    }

    let relative_path = derive_relative_path(&page_url, container.opts.no_folders);
    if container.already_written(&relative_path) {
        return Ok(());
    }

    let response = container.fetcher().get(page_url.as_str()).await?;

    let content = if response.looks_like_markdown(page_url.as_str()) {
        container.converter().markdown_passthrough(&response.text())
    } else if response.looks_like_html() {
        container
            .converter()
            .html_to_markdown(&response.text(), page_url.as_str())
            .map_err(|e| {
                warn!(url = %page_url, error = %e, "conversion failed, dropping page");
                e
            })?
    } else {
        debug!(url = %page_url, content_type = ?response.content_type, "dropping unrecognized content type");
        return Ok(());
    };

    let title = extract_title(&content, &page_url);
    let hash = content_hash_hex(&content);
    let doc = Document::new(page_url.as_str(), title, content, SourceStrategy::Sitemap)
        .with_cache_hit(response.from_cache)
        .with_probe_name("sitemap")
        .with_relative_path(relative_path.to_string_lossy().to_string())
        .with_content_hash(hash);

    container.write_document(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctide_types::Options;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn opts(output: &std::path::Path) -> Options {
        Options {
            output: output.to_path_buf(),
            ..Options::default()
        }
    }

    #[test]
    fn can_handle_recognizes_sitemap_signatures() {
        let strategy = SitemapStrategy;
        assert!(strategy.can_handle(&Url::parse("https://x/sitemap.xml").unwrap()));
        assert!(strategy.can_handle(&Url::parse("https://x/sitemap_index.xml").unwrap()));
        assert!(strategy.can_handle(&Url::parse("https://x/sitemap.xml.gz").unwrap()));
        assert!(!strategy.can_handle(&Url::parse("https://x/guide/intro").unwrap()));
    }

    #[tokio::test]
    async fn s2_sitemap_index_expands_both_children() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<sitemapindex>
                    <sitemap><loc>{}/sitemap-a.xml</loc></sitemap>
                    <sitemap><loc>{}/sitemap-b.xml</loc></sitemap>
                </sitemapindex>"#,
                server.uri(),
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-a.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/a</loc></url></urlset>",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-b.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/b</loc></url></urlset>",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><article>page a content</article></body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><article>page b content</article></body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();
        let start = Url::parse(&format!("{}/sitemap_index.xml", server.uri())).unwrap();

        let strategy = SitemapStrategy;
        strategy.execute(&container, &start).await.unwrap();

        let host_dir = dir.path().join(start.host_str().unwrap());
        assert!(host_dir.join("a.md").is_file());
        assert!(host_dir.join("b.md").is_file());
    }

    #[tokio::test]
    async fn discovery_falls_back_to_robots_directive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "Sitemap: {}/custom-sitemap.xml\n",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/custom-sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<urlset><url><loc>{}/only</loc></url></urlset>",
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/only"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><article>only page</article></body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();
        // Sniff of `/sitemap` fails (404), forcing the probe path.
        let start = Url::parse(&format!("{}/sitemap", server.uri())).unwrap();

        let strategy = SitemapStrategy;
        strategy.execute(&container, &start).await.unwrap();

        let host_dir = dir.path().join(start.host_str().unwrap());
        assert!(host_dir.join("only.md").is_file());
    }
}
