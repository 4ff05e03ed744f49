//! Static catalog of discovery probes: fixed paths tried against a doc
//! site's origin, each with a parser that turns whatever comes back into a
//! list of page URLs. No process-wide mutable state — just a `&'static`
//! slice of plain `fn` pointers, per the strategy/probe contract.

use doctide_types::{DocError, DocResult, DiscoveryProbe};
use serde_json::Value;
use url::Url;

use crate::linkmine::parse_markdown_links;
use crate::sitemap::{parse_sitemap_index, parse_urlset, sniff_kind, SitemapKind};

fn llms_parser(body: &[u8], base: &Url) -> DocResult<Vec<Url>> {
    let text = String::from_utf8_lossy(body);
    let links = parse_markdown_links(&text, base);
    if links.is_empty() {
        return Err(DocError::Parse {
            context: "llms.txt probe".to_string(),
            message: "no markdown links found".to_string(),
        });
    }
    Ok(links)
}

fn sitemap_parser(body: &[u8], _base: &Url) -> DocResult<Vec<Url>> {
    let text = String::from_utf8_lossy(body);
    match sniff_kind(body) {
        Some(SitemapKind::UrlSet) => parse_urlset(&text),
        Some(SitemapKind::SitemapIndex) => parse_sitemap_index(&text),
        None => Err(DocError::Parse {
            context: "sitemap probe".to_string(),
            message: "body is not a recognizable sitemap document".to_string(),
        }),
    }
}

/// Best-effort parser for the various static-search-index JSON shapes that
/// doc-site generators (MkDocs, Docusaurus, Hugo, VitePress) emit. They
/// disagree on the exact key names, so this walks any array of objects in
/// the document looking for a `location`/`url`/`path`/`link` string field.
fn search_index_parser(body: &[u8], base: &Url) -> DocResult<Vec<Url>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| DocError::Parse {
        context: "search index probe".to_string(),
        message: e.to_string(),
    })?;

    let mut urls = Vec::new();
    collect_location_fields(&value, base, &mut urls);

    if urls.is_empty() {
        return Err(DocError::Parse {
            context: "search index probe".to_string(),
            message: "no location-like fields found in search index".to_string(),
        });
    }
    urls.dedup_by(|a, b| a.as_str() == b.as_str());
    Ok(urls)
}

const LOCATION_KEYS: &[&str] = &["location", "url", "path", "link", "id"];

fn collect_location_fields(value: &Value, base: &Url, out: &mut Vec<Url>) {
    match value {
        Value::Object(map) => {
            for key in LOCATION_KEYS {
                if let Some(Value::String(s)) = map.get(*key) {
                    if let Ok(resolved) = base.join(s) {
                        out.push(resolved);
                    }
                }
            }
            for v in map.values() {
                collect_location_fields(v, base, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_location_fields(item, base, out);
            }
        }
        _ => {}
    }
}

const LLMS_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/llms.txt",
    name: "llms",
    parser: llms_parser,
};

const SITEMAP_XML_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/sitemap.xml",
    name: "sitemap_xml",
    parser: sitemap_parser,
};

const SITEMAP_INDEX_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/sitemap_index.xml",
    name: "sitemap_index",
    parser: sitemap_parser,
};

const MKDOCS_SEARCH_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/search/search_index.json",
    name: "mkdocs_search_index",
    parser: search_index_parser,
};

const DOCUSAURUS_SEARCH_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/search-index.json",
    name: "docusaurus_search_index",
    parser: search_index_parser,
};

const HUGO_INDEX_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/index.json",
    name: "hugo_index",
    parser: search_index_parser,
};

const VITEPRESS_HASHMAP_PROBE: DiscoveryProbe = DiscoveryProbe {
    path: "/hashmap.json",
    name: "vitepress_hashmap",
    parser: search_index_parser,
};

/// The full probe catalog, in priority order: discovery manifests first
/// (llms.txt, sitemaps), then generator-specific search indexes.
pub static PROBE_CATALOG: &[DiscoveryProbe] = &[
    LLMS_PROBE,
    SITEMAP_XML_PROBE,
    SITEMAP_INDEX_PROBE,
    MKDOCS_SEARCH_PROBE,
    DOCUSAURUS_SEARCH_PROBE,
    HUGO_INDEX_PROBE,
    VITEPRESS_HASHMAP_PROBE,
];
