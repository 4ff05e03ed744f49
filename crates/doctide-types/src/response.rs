use std::collections::HashMap;

/// A fetched HTTP response, normalized across the fetcher and renderer
/// contracts. Headers are case-insensitive by construction.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    /// Post-redirect URL.
    pub url: String,
    pub from_cache: bool,
}

impl Response {
    pub fn new(status_code: u16, url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body,
            content_type: None,
            url: url.into(),
            from_cache: false,
        }
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (k, v) in headers {
            self.insert_header(k, v);
        }
        self
    }

    pub fn insert_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Content-type sniff used by every strategy's Markdown gate: true when
    /// the body is either declared `text/markdown` or the URL ends in
    /// `.md`/`.mdx`.
    pub fn looks_like_markdown(&self, url: &str) -> bool {
        let by_mime = self
            .content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/markdown"))
            .unwrap_or(false);
        let lower = url.to_ascii_lowercase();
        by_mime || lower.ends_with(".md") || lower.ends_with(".mdx")
    }

    pub fn looks_like_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            })
            .unwrap_or(false)
    }

    pub fn looks_like_plain_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/plain"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = Response::new(200, "https://x", vec![]).with_headers(vec![(
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )]);
        assert_eq!(
            resp.header("content-type"),
            Some("text/html; charset=utf-8")
        );
    }

    #[test]
    fn markdown_sniff_by_mime_or_suffix() {
        let by_mime = Response::new(200, "https://x/a", vec![])
            .with_content_type("text/markdown; charset=utf-8");
        assert!(by_mime.looks_like_markdown("https://x/a"));

        let by_suffix = Response::new(200, "https://x/a.md", vec![]);
        assert!(by_suffix.looks_like_markdown("https://x/a.md"));

        let neither = Response::new(200, "https://x/a", vec![]).with_content_type("text/html");
        assert!(!neither.looks_like_markdown("https://x/a"));
    }

    #[test]
    fn success_range() {
        assert!(Response::new(200, "u", vec![]).is_success());
        assert!(Response::new(299, "u", vec![]).is_success());
        assert!(!Response::new(404, "u", vec![]).is_success());
    }
}
