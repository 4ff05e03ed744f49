//! Canonical URL identity key, shared by every strategy's visited set,
//! the writer's path derivation, and the sync-state manager.
//!
//! Per the glossary: scheme/host lowercased, fragment stripped, trailing
//! slash removed, and (where the caller opts in) the query string stripped.

use url::Url;

/// Normalize a URL into the identity key used throughout the pipeline.
///
/// Returns `None` if `raw` does not parse as an absolute URL.
pub fn canonicalize(raw: &str, strip_query: bool) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.set_fragment(None);
    if strip_query {
        url.set_query(None);
    }

    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str()?.to_ascii_lowercase();
    let port_suffix = match url.port() {
        Some(p) => format!(":{p}"),
        None => String::new(),
    };

    let mut path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let query = if strip_query {
        String::new()
    } else {
        match url.query() {
            Some(q) => format!("?{q}"),
            None => String::new(),
        }
    };

    Some(format!("{scheme}://{host}{port_suffix}{path}{query}"))
}

/// Resolve `href` against `base`, returning `None` for unparsable or
/// non-navigable (`javascript:`, `mailto:`) targets.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:")
    {
        return None;
    }
    base.join(trimmed).ok()
}

/// Registered (eTLD+1-ish) domain comparison: exact host match, case
/// insensitive. Strategies that need subdomain-aware matching can extend
/// this; the crawler and docs strategies use exact-host equality per spec.
pub fn same_registered_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_and_trailing_slash() {
        let a = canonicalize("https://Example.com/Docs/", false).unwrap();
        assert_eq!(a, "https://example.com/Docs");
    }

    #[test]
    fn strips_query_when_requested() {
        let a = canonicalize("https://example.com/a?x=1#frag", true).unwrap();
        assert_eq!(a, "https://example.com/a");
    }

    #[test]
    fn keeps_query_by_default() {
        let a = canonicalize("https://example.com/a?x=1", false).unwrap();
        assert_eq!(a, "https://example.com/a?x=1");
    }

    #[test]
    fn rejects_relative_urls() {
        assert!(canonicalize("/a/b", false).is_none());
    }

    #[test]
    fn resolve_drops_fragment_only_links() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert!(resolve(&base, "#top").is_none());
        assert!(resolve(&base, "javascript:void(0)").is_none());
        assert!(resolve(&base, "mailto:a@example.com").is_none());
        assert_eq!(
            resolve(&base, "/other").unwrap().as_str(),
            "https://example.com/other"
        );
    }
}
