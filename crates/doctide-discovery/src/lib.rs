//! Multi-tier discovery: robots.txt sitemap directives, sitemap XML
//! expansion, framework search-index probes, and HTML link mining.

mod linkmine;
mod probes;
mod robots;
mod sitemap;

pub use linkmine::{mine_links, parse_markdown_links};
pub use probes::PROBE_CATALOG;
pub use robots::extract_sitemap_directives;
pub use sitemap::{maybe_gunzip, parse_sitemap_index, parse_urlset, sniff_kind, ExpansionGuard, SitemapKind, MAX_EXPANSION_DEPTH};
