//! Generic web crawler (spec §4.2): bounded BFS over the same registered
//! host, with exclude/filter rules, content-type gating, and a render
//! fallback for pages that look like an unexecuted SPA shell.

use crate::common::{content_hash_hex, extract_title, jitter_sleep};
use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use dashmap::DashSet;
use doctide_convert::Converter;
use doctide_discovery::mine_links;
use doctide_fetch::Fetcher;
use doctide_output::derive_relative_path;
use doctide_render::{needs_render, reject_after_render, Renderer, RenderOptions};
use doctide_types::{canonicalize, resolve, same_registered_domain, DocError, DocResult, Document, Response, SourceStrategy};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub struct CrawlerStrategy;

#[async_trait]
impl Strategy for CrawlerStrategy {
    fn name(&self) -> &'static str {
        "crawler"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        crawl(container, url).await
    }
}

async fn crawl(container: &Container, start_url: &Url) -> DocResult<()> {
    let visited: Arc<DashSet<String>> = Arc::new(DashSet::new());
    visited.insert(canonical_key(start_url));

    let mut frontier = vec![start_url.clone()];
    let mut depth = 0usize;

    while !frontier.is_empty() {
        container.check_cancelled()?;
        if depth > container.opts.max_depth {
            break;
        }
        if container.opts.limit_reached(container.processed_count.load(std::sync::atomic::Ordering::SeqCst)) {
            break;
        }

        let concurrency = container.opts.effective_concurrency();
        let results: Vec<DocResult<Vec<Url>>> = stream::iter(frontier.drain(..))
            .map(|page_url| async move { process_page(container, &page_url).await })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut next_frontier = Vec::new();
        for result in results {
            match result {
                Ok(links) => {
                    for link in links {
                        if accept_link(container, start_url, &link) && visited.insert(canonical_key(&link)) {
                            next_frontier.push(link);
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "dropping page after strategy-level error"),
            }
        }

        frontier = next_frontier;
        depth += 1;
    }

    Ok(())
}

fn canonical_key(url: &Url) -> String {
    canonicalize(url.as_str(), false).unwrap_or_else(|| url.to_string())
}

/// Acceptance rules for a discovered link, applied in the order spec §4.2
/// lists them: same domain, filter prefix, exclude regexes, global limit.
/// The caller separately enforces the visited-set compare-and-set.
fn accept_link(container: &Container, start_url: &Url, candidate: &Url) -> bool {
    if !same_registered_domain(start_url, candidate) {
        return false;
    }
    if !container.opts.matches_filter(candidate.path()) {
        return false;
    }
    if container.opts.is_excluded(candidate.as_str()) {
        return false;
    }
    if container
        .opts
        .limit_reached(container.processed_count.load(std::sync::atomic::Ordering::SeqCst))
    {
        return false;
    }
    true
}

/// Fetches and processes one page: gates by content type, renders through
/// the SPA fallback when needed, converts, and writes. Returns the links
/// mined from the page (for BFS continuation) regardless of whether the
/// page itself was written, since a page already on disk may still lead to
/// pages that aren't.
async fn process_page(container: &Container, page_url: &Url) -> DocResult<Vec<Url>> {
    container.check_cancelled()?;
    jitter_sleep(Duration::from_secs(2)).await;

    let response = container.fetcher().get(page_url.as_str()).await?;

    if response.looks_like_markdown(page_url.as_str()) {
        return process_markdown_page(container, page_url, &response);
    }
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

    let relative_path = derive_relative_path(page_url, container.opts.no_folders);
    if container.already_written(&relative_path) {
        return Ok(links);
    }

    let content = match container.converter().html_to_markdown(&html, page_url.as_str()) {
        Ok(md) => md,
        Err(e) => {
            warn!(url = %page_url, error = %e, "conversion failed, dropping page");
            return Ok(links);
        }
    };

    let title = extract_title(&html, page_url);
    let doc = Document::new(page_url.as_str(), title, content, SourceStrategy::Crawler)
        .with_cache_hit(response.from_cache)
        .with_rendered_with_js(rendered_with_js)
        .with_relative_path(relative_path.to_string_lossy().to_string());
    let doc = with_hash(doc);

    container.write_document(doc)?;
    Ok(links)
}

fn process_markdown_page(container: &Container, page_url: &Url, response: &Response) -> DocResult<Vec<Url>> {
    let relative_path = derive_relative_path(page_url, container.opts.no_folders);
    if container.already_written(&relative_path) {
        return Ok(Vec::new());
    }

    let content = container.converter().markdown_passthrough(&response.text());
    let title = extract_title(&content, page_url);
    let doc = Document::new(page_url.as_str(), title, content, SourceStrategy::Crawler)
        .with_cache_hit(response.from_cache)
        .with_relative_path(relative_path.to_string_lossy().to_string());
    let doc = with_hash(doc);

    container.write_document(doc)?;
    Ok(Vec::new())
}

fn with_hash(doc: Document) -> Document {
    let hash = content_hash_hex(&doc.content);
    doc.with_content_hash(hash)
}
