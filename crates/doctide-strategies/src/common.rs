//! Small helpers shared by more than one strategy: content hashing, jitter
//! sleeps, and a title-from-HTML heuristic. Nothing here is strategy-specific.

use rand::Rng;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// SHA-256 hex digest, computed over the post-conversion Markdown bytes a
/// strategy is about to hand to the writer — see DESIGN.md for why this is
/// pre- vs. post-conversion.
pub fn content_hash_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Sleeps a uniformly random duration in `[0, max)`, used for polite
/// pacing between requests to the same host. A no-op when `max` is zero.
pub async fn jitter_sleep(max: Duration) {
    if max.is_zero() {
        return;
    }
    let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Sleeps a uniformly random duration in `[min, max]`, used by strategies
/// that need a minimum politeness delay rather than a `[0, max)` jitter.
pub async fn jitter_sleep_range(min: Duration, max: Duration) {
    if max <= min {
        tokio::time::sleep(min).await;
        return;
    }
    let extra = rand::thread_rng().gen_range(0..=(max - min).as_millis() as u64);
    tokio::time::sleep(min + Duration::from_millis(extra)).await;
}

/// Best-effort title: `<title>`, then the first `<h1>`, then `url`'s last
/// path segment, falling back to the whole URL.
pub fn extract_title(html: &str, url: &Url) -> String {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse("title") {
        if let Some(text) = document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
        {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    if let Ok(selector) = Selector::parse("h1") {
        if let Some(text) = document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
        {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    url.path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash_hex("hello"), content_hash_hex("hello"));
        assert_ne!(content_hash_hex("hello"), content_hash_hex("world"));
    }

    #[test]
    fn title_prefers_title_tag_over_h1() {
        let html = "<html><head><title>  The Title  </title></head><body><h1>Other</h1></body></html>";
        let url = Url::parse("https://x/page").unwrap();
        assert_eq!(extract_title(html, &url), "The Title");
    }

    #[test]
    fn title_falls_back_to_h1_then_path_segment() {
        let html = "<html><body><h1>Heading</h1></body></html>";
        let url = Url::parse("https://x/page").unwrap();
        assert_eq!(extract_title(html, &url), "Heading");

        let url2 = Url::parse("https://x/guide/intro").unwrap();
        assert_eq!(extract_title("<html><body></body></html>", &url2), "intro");
    }
}
