//! Sitemap XML parsing. Pure functions only — fetching and recursive
//! expansion belong to the sitemap strategy, which owns a fetcher; this
//! module just turns bytes into URLs and tracks cycle/depth state for it.

use doctide_types::{DocError, DocResult};
use std::collections::HashSet;
use url::Url;
use xml::reader::{EventReader, XmlEvent};

/// How deep `<sitemapindex>` nesting is allowed to recurse before the
/// expander gives up and treats further children as exhausted.
pub const MAX_EXPANSION_DEPTH: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    UrlSet,
    SitemapIndex,
}

/// Sniffs the first 1 KiB (after BOM strip) for `<urlset` / `<sitemapindex`,
/// case-insensitively, without doing a full parse.
pub fn sniff_kind(bytes: &[u8]) -> Option<SitemapKind> {
    let bytes = strip_bom(bytes);
    let window = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(window).to_lowercase();
    if text.contains("<sitemapindex") {
        Some(SitemapKind::SitemapIndex)
    } else if text.contains("<urlset") {
        Some(SitemapKind::UrlSet)
    } else {
        None
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

/// Transparently gunzips a body when it looks gzip-encoded (magic bytes) or
/// the source URL ends in `.gz`.
pub fn maybe_gunzip(bytes: &[u8], source_suggests_gzip: bool) -> Vec<u8> {
    let looks_gzip = bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b;
    if !looks_gzip && !source_suggests_gzip {
        return bytes.to_vec();
    }
    use flate2::read::GzDecoder;
    use std::io::Read;
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => out,
        Err(_) => bytes.to_vec(),
    }
}

/// Parses a `<urlset>` document, collecting every `<loc>` as an absolute URL.
pub fn parse_urlset(xml: &str) -> DocResult<Vec<Url>> {
    parse_loc_elements(xml, "url")
}

/// Parses a `<sitemapindex>` document, collecting every child `<loc>` as the
/// URL of a sitemap to expand next.
pub fn parse_sitemap_index(xml: &str) -> DocResult<Vec<Url>> {
    parse_loc_elements(xml, "sitemap")
}

/// Shared walker: both `<urlset><url><loc>` and `<sitemapindex><sitemap><loc>`
/// have the same shape, just different wrapper element names.
fn parse_loc_elements(xml: &str, wrapper: &str) -> DocResult<Vec<Url>> {
    let parser = EventReader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_wrapper = false;
    let mut in_loc = false;
    let mut buffer = String::new();

    for event in parser {
        match event.map_err(|e| DocError::Parse {
            context: "sitemap xml".to_string(),
            message: e.to_string(),
        })? {
            XmlEvent::StartElement { name, .. } => {
                if name.local_name == wrapper {
                    in_wrapper = true;
                } else if in_wrapper && name.local_name == "loc" {
                    in_loc = true;
                    buffer.clear();
                }
            }
            XmlEvent::Characters(data) if in_loc => {
                buffer.push_str(&data);
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "loc" && in_loc {
                    in_loc = false;
                    if let Ok(url) = Url::parse(buffer.trim()) {
                        urls.push(url);
                    }
                } else if name.local_name == wrapper {
                    in_wrapper = false;
                }
            }
            _ => {}
        }
    }

    if urls.is_empty() {
        return Err(DocError::Parse {
            context: "sitemap xml".to_string(),
            message: format!("no <{wrapper}><loc> entries found"),
        });
    }
    Ok(urls)
}

/// Tracks visited sitemap URLs and expansion depth so the strategy loop
/// can't spin on a sitemap that points back at itself.
#[derive(Debug, Default)]
pub struct ExpansionGuard {
    visited: HashSet<String>,
}

impl ExpansionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a URL is seen at or under the depth cap;
    /// false if already visited or the cap is exceeded.
    pub fn admit(&mut self, url: &Url, depth: u32) -> bool {
        if depth > MAX_EXPANSION_DEPTH {
            return false;
        }
        self.visited.insert(url.as_str().to_string())
    }
}
