//! URL classifier & dispatcher (spec §4.1): picks exactly one extraction
//! strategy for a user-supplied URL, in a fixed precedence order so no two
//! strategies can ever tie.

use crate::container::Container;
use async_trait::async_trait;
use doctide_types::{DocError, DocResult};
use tracing::info;
use url::Url;

/// A capability that extracts [`doctide_types::Document`]s from a class of
/// inputs. Implementors must not depend on concrete fetcher/renderer/writer
/// types — only on the capabilities exposed through [`Container`].
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy claims `url`. Must be a pure predicate: no
    /// network access, no side effects.
    fn can_handle(&self, url: &Url) -> bool;

    async fn execute(&self, container: &Container, url: &Url) -> DocResult<()>;
}

/// Tries every registered strategy in precedence order and runs the first
/// match. Precedence (highest first), per spec §4.1: generated-API-docs
/// host match, wiki URL, Git tree/blob/archive URL, sitemap file signature,
/// `llms.txt` path suffix, web crawler (catch-all). Each strategy's
/// `can_handle` is narrower than the crawler's, so ties are impossible by
/// construction.
pub struct Dispatcher {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Dispatcher {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn select(&self, url: &Url) -> DocResult<&dyn Strategy> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(url))
            .map(|s| s.as_ref())
            .ok_or_else(|| DocError::UrlParse(url.to_string()))
    }

    pub async fn dispatch(&self, container: &Container, url: &Url) -> DocResult<()> {
        let strategy = self.select(url)?;
        info!(strategy = strategy.name(), url = %url, "dispatching");
        container.set_strategy(strategy.name());
        container.set_source_url(url.as_str());
        strategy.execute(container, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: &'static str,
        matches: fn(&Url) -> bool,
    }

    #[async_trait]
    impl Strategy for Stub {
        fn name(&self) -> &'static str {
            self.name
        }
        fn can_handle(&self, url: &Url) -> bool {
            (self.matches)(url)
        }
        async fn execute(&self, _container: &Container, _url: &Url) -> DocResult<()> {
            Ok(())
        }
    }

    #[test]
    fn selects_first_matching_strategy_in_precedence_order() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(Stub {
                name: "narrow",
                matches: |u| u.path().ends_with("llms.txt"),
            }),
            Box::new(Stub {
                name: "fallback",
                matches: |_| true,
            }),
        ]);

        let narrow = Url::parse("https://x/llms.txt").unwrap();
        assert_eq!(dispatcher.select(&narrow).unwrap().name(), "narrow");

        let other = Url::parse("https://x/page").unwrap();
        assert_eq!(dispatcher.select(&other).unwrap().name(), "fallback");
    }

    #[test]
    fn no_match_is_a_url_parse_error() {
        let dispatcher: Dispatcher = Dispatcher::new(vec![Box::new(Stub {
            name: "narrow",
            matches: |_| false,
        })]);
        let url = Url::parse("https://x/page").unwrap();
        assert!(matches!(dispatcher.select(&url), Err(DocError::UrlParse(_))));
    }
}
