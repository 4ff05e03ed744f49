//! `llms.txt` strategy (spec §4.4): treats the manifest as a Markdown
//! link list, optionally filtered by base URL or path, and fans the
//! resulting page set out for extraction the same way the sitemap
//! strategy does.

use crate::common::{content_hash_hex, extract_title};
use crate::container::Container;
use crate::dispatch::Strategy;
use async_trait::async_trait;
use doctide_convert::Converter;
use doctide_discovery::parse_markdown_links;
use doctide_fetch::Fetcher;
use doctide_output::derive_relative_path;
use doctide_types::{DocResult, Document, SourceStrategy};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use url::Url;

pub struct LlmsStrategy;

#[async_trait]
impl Strategy for LlmsStrategy {
    fn name(&self) -> &'static str {
        "llms"
    }

    fn can_handle(&self, url: &Url) -> bool {
        url.path().to_ascii_lowercase().ends_with("llms.txt")
    }

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()> {
        let manifest = container.fetcher().get(url.as_str()).await?;
        let mut links = parse_markdown_links(&manifest.text(), url);

        if let Some(filter) = &container.opts.filter_url {
            links.retain(|link| matches_llms_filter(filter, link));
        }
        if container.opts.limit != 0 {
            links.truncate(container.opts.limit);
        }

        extract(container, links).await
    }
}

/// `filter_url` matching rule specific to this strategy: a leading-`/`
/// filter is a path substring match; otherwise it's parsed as a base URL
/// and compared by scheme + host + path-prefix.
fn matches_llms_filter(filter: &str, link: &Url) -> bool {
    if filter.starts_with('/') {
        return link.path().contains(filter);
    }
    match Url::parse(filter) {
        Ok(base) => {
            link.scheme() == base.scheme()
                && link.host_str() == base.host_str()
                && link.path().starts_with(base.path())
        }
        Err(_) => false,
    }
}

async fn extract(container: &Container, links: Vec<Url>) -> DocResult<()> {
    let concurrency = container.opts.effective_concurrency();
    let results: Vec<DocResult<()>> = stream::iter(links)
        .map(|link| async move { process_page(container, link).await })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for result in results {
        match result {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(error = %e, "dropping llms.txt link after strategy-level error"),
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
    if container.opts.is_excluded(page_url.as_str()) {
        return Ok(());
    }

    let relative_path = derive_relative_path(&page_url, container.opts.no_folders);
    if container.already_written(&relative_path) {
        return Ok(());
    }

    let response = container.fetcher().get(page_url.as_str()).await?;

    let content = if response.looks_like_markdown(page_url.as_str()) {
        container.converter().markdown_passthrough(&response.text())
    } else if response.looks_like_plain_text() {
        container.converter().plain_text_passthrough(&response.text())
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
    let doc = Document::new(page_url.as_str(), title, content, SourceStrategy::Llms)
        .with_cache_hit(response.from_cache)
        .with_probe_name("llms.txt")
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
    fn can_handle_recognizes_llms_txt_suffix() {
        let strategy = LlmsStrategy;
        assert!(strategy.can_handle(&Url::parse("https://x/llms.txt").unwrap()));
        assert!(strategy.can_handle(&Url::parse("https://x/docs/LLMS.txt").unwrap()));
        assert!(!strategy.can_handle(&Url::parse("https://x/sitemap.xml").unwrap()));
    }

    #[test]
    fn path_filter_matches_by_substring() {
        let link = Url::parse("https://x/docs/b").unwrap();
        assert!(matches_llms_filter("/docs", &link));
        assert!(!matches_llms_filter("/blog", &link));
    }

    #[test]
    fn base_url_filter_matches_scheme_host_and_prefix() {
        let link = Url::parse("https://x/docs/b").unwrap();
        assert!(matches_llms_filter("https://x/docs", &link));
        assert!(!matches_llms_filter("https://other/docs", &link));
        assert!(!matches_llms_filter("https://x/blog", &link));
    }

    #[tokio::test]
    async fn s3_llms_filter_keeps_only_matching_links() {
        let server = MockServer::start().await;
        let manifest = format!(
            "# Docs\n\n- [A]({0}/a)\n- [B]({0}/docs/b)\n- [C]({0}/docs/c)\n",
            server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/llms.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(manifest))
            .mount(&server)
            .await;
        for p in ["/a", "/docs/b", "/docs/c"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!("<html><body><article>content {p}</article></body></html>"))
                        .insert_header("content-type", "text/html"),
                )
                .mount(&server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let mut o = opts(dir.path());
        o.filter_url = Some("/docs".to_string());
        let container = Container::construct(o, "doctide-test/1.0").unwrap();
        let start = Url::parse(&format!("{}/llms.txt", server.uri())).unwrap();

        LlmsStrategy.execute(&container, &start).await.unwrap();

        let host_dir = dir.path().join(start.host_str().unwrap());
        assert!(!host_dir.join("a.md").is_file());
        assert!(host_dir.join("docs/b.md").is_file());
        assert!(host_dir.join("docs/c.md").is_file());
    }
}
