//! Strategy dispatch, the shared dependency container, and every
//! extraction strategy doctide knows how to run.

pub mod common;
pub mod container;
pub mod crawler;
pub mod dispatch;
pub mod docs_rs;
pub mod git;
pub mod llms;
pub mod sitemap;
pub mod wiki;

pub use container::Container;
pub use dispatch::{Dispatcher, Strategy};

use crawler::CrawlerStrategy;
use docs_rs::GeneratedDocsStrategy;
use git::GitStrategy;
use llms::LlmsStrategy;
use sitemap::SitemapStrategy;
use wiki::WikiStrategy;

/// Wires every strategy into the dispatcher in the precedence order spec
/// §4.1 lists: generated-API-docs host match, wiki URL, Git tree/blob/
/// archive URL, sitemap file signature, `llms.txt` path suffix, web crawler
/// catch-all. The generated-API-docs strategy occupies both the first and
/// the (otherwise separately listed) "generated-docs-package host match"
/// precedence slots — see DESIGN.md for why a single strategy covers both.
pub fn build_dispatcher() -> Dispatcher {
    Dispatcher::new(vec![
        Box::new(GeneratedDocsStrategy),
        Box::new(WikiStrategy),
        Box::new(GitStrategy),
        Box::new(SitemapStrategy),
        Box::new(LlmsStrategy),
        Box::new(CrawlerStrategy),
    ])
}
