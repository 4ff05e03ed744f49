//! `Sitemap:` directive extraction from `robots.txt`. We deliberately don't
//! enforce `Disallow` rules here — the sitemap strategy only needs the
//! sitemap pointer, not full crawl-permission matching.

use url::Url;

/// Pulls every `Sitemap:` directive out of a robots.txt body, resolving
/// relative values against `origin` and keeping only http(s) results.
pub fn extract_sitemap_directives(body: &str, origin: &Url) -> Vec<Url> {
    body.lines()
        .filter_map(|line| {
            let line = strip_comment(line).trim();
            let value = strip_directive_prefix(line)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            origin.join(value).ok().filter(|u| {
                matches!(u.scheme(), "http" | "https")
            })
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn strip_directive_prefix(line: &str) -> Option<&str> {
    let lower = line.to_ascii_lowercase();
    if !lower.starts_with("sitemap:") {
        return None;
    }
    line.get("sitemap:".len()..)
}
