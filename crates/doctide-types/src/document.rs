use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The strategy that produced a [`Document`], also used as the `tags`
/// provenance entry and the `metadata.json` manifest column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    Crawler,
    Sitemap,
    Llms,
    Git,
    Wiki,
    GeneratedDocs,
}

impl fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStrategy::Crawler => "crawler",
            SourceStrategy::Sitemap => "sitemap",
            SourceStrategy::Llms => "llms",
            SourceStrategy::Git => "git",
            SourceStrategy::Wiki => "wiki",
            SourceStrategy::GeneratedDocs => "generated-docs",
        };
        f.write_str(s)
    }
}

/// A single normalized Markdown document extracted from a source, plus
/// everything the writer and metadata collector need to persist it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Canonical URL identity (see [`crate::canonical::canonicalize`]).
    pub url: String,
    pub title: String,
    /// Always Markdown, never raw HTML.
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub source_strategy: SourceStrategy,
    pub fetched_at: DateTime<Utc>,
    pub cache_hit: bool,
    pub rendered_with_js: bool,
    /// Filled in by the writer once the output path has been derived.
    pub relative_path: Option<String>,
    /// SHA-256 hex digest over `content` at write time (see DESIGN.md for
    /// the pre/post-conversion decision).
    pub content_hash: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
    /// Name of the discovery probe that surfaced this URL, when known.
    pub probe_name: Option<String>,
}

impl Document {
    /// Build a document, computing word/char counts from `content`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        source_strategy: SourceStrategy,
    ) -> Self {
        let content = content.into();
        let (word_count, char_count) = count_words_and_chars(&content);
        Self {
            url: url.into(),
            title: title.into(),
            content,
            description: None,
            tags: Vec::new(),
            source_strategy,
            fetched_at: Utc::now(),
            cache_hit: false,
            rendered_with_js: false,
            relative_path: None,
            content_hash: None,
            word_count,
            char_count,
            probe_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn with_rendered_with_js(mut self, rendered: bool) -> Self {
        self.rendered_with_js = rendered;
        self
    }

    pub fn with_probe_name(mut self, probe_name: impl Into<String>) -> Self {
        self.probe_name = Some(probe_name.into());
        self
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = Some(content_hash.into());
        self
    }
}

fn count_words_and_chars(content: &str) -> (usize, usize) {
    let word_count = content.split_whitespace().count();
    let char_count = content.chars().count();
    (word_count, char_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_chars() {
        let doc = Document::new(
            "https://example.com/a",
            "A",
            "hello world",
            SourceStrategy::Crawler,
        );
        assert_eq!(doc.word_count, 2);
        assert_eq!(doc.char_count, 11);
    }

    #[test]
    fn builder_methods_chain() {
        let doc = Document::new("https://x/a", "A", "body", SourceStrategy::Sitemap)
            .with_description("desc")
            .with_tags(vec!["a".into(), "b".into()])
            .with_cache_hit(true)
            .with_rendered_with_js(true)
            .with_probe_name("sitemap.xml");

        assert_eq!(doc.description.as_deref(), Some("desc"));
        assert_eq!(doc.tags, vec!["a", "b"]);
        assert!(doc.cache_hit);
        assert!(doc.rendered_with_js);
        assert_eq!(doc.probe_name.as_deref(), Some("sitemap.xml"));
    }
}
