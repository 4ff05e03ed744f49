//! SPA-shell detection, shared between the crawler strategy (deciding
//! whether to re-fetch through the renderer) and the generated-API-docs
//! strategy (same documentation-site-builder shells show up there too).

use scraper::{Html, Selector};

const SPA_ROOT_SENTINELS: &[&str] = &["app", "root", "__next", "__nuxt"];

const REJECT_STRINGS: &[&str] = &[
    "301 moved permanently",
    "302 found",
    "404 not found",
    "page not found",
    "access denied",
    "403 forbidden",
];

/// Strips tags and collapses whitespace to approximate the text a browser
/// would show the user — cheap enough to run on every candidate page.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    let text = match document.select(&body_selector).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_spa_sentinel(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(div_selector) = Selector::parse("div[id]") else {
        return false;
    };
    let has_root_div = document.select(&div_selector).any(|el| {
        el.value()
            .attr("id")
            .map(|id| SPA_ROOT_SENTINELS.contains(&id.to_lowercase().as_str()))
            .unwrap_or(false)
    });

    let body_selector = Selector::parse("body").unwrap();
    let empty_body = document
        .select(&body_selector)
        .next()
        .map(|b| b.text().collect::<String>().trim().is_empty())
        .unwrap_or(false);

    has_root_div || empty_body
}

/// True when the raw fetched HTML looks like it needs JS execution to show
/// any real content, before any render attempt.
pub fn needs_render(html: &str) -> bool {
    if html.len() < 500 {
        return true;
    }
    let text_len = visible_text(html).chars().count();
    has_spa_sentinel(html) && text_len < 100
}

/// True when a post-render page should be rejected as not meaningfully
/// improved over the shell (dead link, soft-404, block page).
pub fn reject_after_render(html: &str) -> bool {
    let text = visible_text(html);
    if text.chars().count() < 60 {
        return true;
    }
    let lower = text.to_lowercase();
    REJECT_STRINGS.iter().any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_needs_render() {
        assert!(needs_render("<html><body>hi</body></html>"));
    }

    #[test]
    fn next_js_shell_needs_render() {
        let html = format!(
            "<html><body><div id=\"__next\"></div><!--{}--></body></html>",
            "x".repeat(600)
        );
        assert!(needs_render(&html));
    }

    #[test]
    fn substantial_article_does_not_need_render() {
        let html = format!(
            "<html><body><article><p>{}</p></article></body></html>",
            "Meaningful article content goes here. ".repeat(40)
        );
        assert!(!needs_render(&html));
    }

    #[test]
    fn post_render_rejects_404_page() {
        let html = "<html><body><h1>404 Not Found</h1><p>Sorry, that page does not exist here.</p></body></html>";
        assert!(reject_after_render(html));
    }

    #[test]
    fn post_render_accepts_real_content() {
        let html = format!(
            "<html><body><article>{}</article></body></html>",
            "Real documentation content with enough words to pass. ".repeat(5)
        );
        assert!(!reject_after_render(&html));
    }
}
