use doctide_types::{DocError, DocResult};

/// How a fetched body should be turned into the Markdown a `Document`
/// carries. The HTML->Markdown rules themselves are an external library
/// contract (`html2md`); this trait is the seam strategies call through.
pub trait Converter: Send + Sync {
    /// Runs the full HTML->Markdown pipeline.
    fn html_to_markdown(&self, html: &str, url: &str) -> DocResult<String>;

    /// Pass a body already in Markdown through unchanged, after a light
    /// normalization pass (trailing whitespace, line endings).
    fn markdown_passthrough(&self, markdown: &str) -> String {
        normalize_markdown(markdown)
    }

    /// Wrap a plain-text body as-is; used by the LLMS strategy for
    /// `text/plain` links that aren't Markdown but shouldn't be HTML-parsed.
    fn plain_text_passthrough(&self, text: &str) -> String {
        normalize_markdown(text)
    }
}

fn normalize_markdown(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n");
    let trimmed_lines: Vec<&str> = normalized.lines().map(|l| l.trim_end()).collect();
    let mut out = trimmed_lines.join("\n");
    out.push('\n');
    out
}

/// Default converter backed by the `html2md` crate.
#[derive(Debug, Default)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn html_to_markdown(&self, html: &str, url: &str) -> DocResult<String> {
        let markdown = html2md::parse_html(html);
        if markdown.trim().is_empty() && !html.trim().is_empty() {
            return Err(DocError::Conversion {
                url: url.to_string(),
                message: "HTML-to-Markdown conversion produced empty output".to_string(),
            });
        }
        Ok(normalize_markdown(&markdown))
    }
}

/// Wraps a non-Markdown file's content in a fenced code block, keyed by
/// file extension, for the Git strategy's recursive file walk.
pub fn fence_as_code_block(extension: &str, content: &str) -> String {
    let lang = extension.trim_start_matches('.');
    format!("```{lang}\n{content}\n```\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_simple_html() {
        let converter = Html2MdConverter;
        let md = converter
            .html_to_markdown("<h1>Title</h1><p>Hello <strong>world</strong>.</p>", "https://x")
            .unwrap();
        assert!(md.contains("Title"));
        assert!(md.contains("Hello"));
    }

    #[test]
    fn empty_html_body_is_conversion_error() {
        let converter = Html2MdConverter;
        let err = converter.html_to_markdown("<html><body></body></html>", "https://x");
        assert!(err.is_err());
    }

    #[test]
    fn markdown_passthrough_normalizes_line_endings() {
        let converter = Html2MdConverter;
        let out = converter.markdown_passthrough("# Title\r\n\r\nBody text   \r\n");
        assert!(!out.contains('\r'));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn fence_wraps_content_with_extension_as_lang() {
        let out = fence_as_code_block(".rs", "fn main() {}");
        assert_eq!(out, "```rs\nfn main() {}\n```\n");
    }
}
