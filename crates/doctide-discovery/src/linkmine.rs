//! HTML link mining (CSS-selector priority, navigation first) and Markdown
//! link-list parsing (used by the `llms.txt` strategy and probe).

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Selectors tried, in order, before falling back to every `a[href]` on the
/// page. Covers the sidebar/nav markup of the common doc-site generators.
const NAVIGATION_SELECTORS: &[&str] = &[
    "nav a[href]",
    ".sidebar a[href]",
    "#sidebar a[href]",
    ".toc a[href]",
    "aside a[href]",
    ".main-heading a[href]",
];

/// Below this many links, navigation selectors are considered to have
/// found "not enough" and the miner falls through to a full `a[href]` scan.
const NAVIGATION_MIN_LINKS: usize = 10;

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("tel:")
    {
        return None;
    }
    base.join(trimmed).ok()
}

/// Mines links from `html`, preferring navigation/sidebar markup and only
/// falling back to every anchor on the page when navigation comes up short.
pub fn mine_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut found = Vec::new();
    for selector_str in NAVIGATION_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in document.select(&selector) {
            if let Some(href) = el.value().attr("href") {
                if let Some(url) = resolve_href(base, href) {
                    found.push(url);
                }
            }
        }
    }

    if found.len() < NAVIGATION_MIN_LINKS {
        found.clear();
        if let Ok(selector) = Selector::parse("a[href]") {
            for el in document.select(&selector) {
                if let Some(href) = el.value().attr("href") {
                    if let Some(url) = resolve_href(base, href) {
                        found.push(url);
                    }
                }
            }
        }
    }

    found.dedup_by(|a, b| a.as_str() == b.as_str());
    found
}

fn markdown_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap())
}

/// Parses every Markdown inline link `[title](url)` out of `text`, dropping
/// bare-anchor and empty targets, and resolving relative ones against
/// `base`. Used by the `llms.txt` strategy and its discovery probe.
pub fn parse_markdown_links(text: &str, base: &Url) -> Vec<Url> {
    markdown_link_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let target = caps.get(2)?.as_str().trim();
            if target.is_empty() || target.starts_with('#') {
                return None;
            }
            base.join(target).ok()
        })
        .collect()
}
