use regex::Regex;
use std::path::PathBuf;

/// Per-invocation options, shared by every strategy. Constructed once by the
/// CLI and handed to the dispatcher by reference.
#[derive(Debug, Clone)]
pub struct Options {
    pub output: PathBuf,
    pub concurrency: usize,
    /// `0` means unbounded.
    pub limit: usize,
    pub max_depth: usize,
    pub exclude: Vec<Regex>,
    pub filter_url: Option<String>,
    pub force: bool,
    pub dry_run: bool,
    pub render_js: bool,
    /// Generated-API-docs only: when `false` (the default), every page
    /// crawled for a crate is merged into one `<crate>-<version>.md`; when
    /// `true`, each module/item page keeps its own file.
    pub split: bool,
    pub no_folders: bool,
    pub sync: bool,
    pub full_sync: bool,
    pub json_metadata: bool,
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output: PathBuf::from("./docs"),
            concurrency: 5,
            limit: 0,
            max_depth: 3,
            exclude: Vec::new(),
            filter_url: None,
            force: false,
            dry_run: false,
            render_js: false,
            split: false,
            no_folders: false,
            sync: false,
            full_sync: false,
            json_metadata: false,
            verbose: false,
        }
    }
}

impl Options {
    /// `concurrency` is clamped to at least 1, per invariant in spec §3.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(url))
    }

    /// `limit == 0` means unbounded; otherwise `count < limit` may still
    /// accept one more item.
    pub fn limit_reached(&self, count: usize) -> bool {
        self.limit != 0 && count >= self.limit
    }

    pub fn matches_filter(&self, path: &str) -> bool {
        match &self.filter_url {
            Some(filter) => path.starts_with(filter.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_concurrency_is_at_least_one() {
        let mut opts = Options::default();
        opts.concurrency = 0;
        assert_eq!(opts.effective_concurrency(), 1);
    }

    #[test]
    fn unbounded_limit_never_reached() {
        let opts = Options::default();
        assert!(!opts.limit_reached(1_000_000));
    }

    #[test]
    fn limit_reached_at_boundary() {
        let mut opts = Options::default();
        opts.limit = 3;
        assert!(!opts.limit_reached(2));
        assert!(opts.limit_reached(3));
    }

    #[test]
    fn filter_prefix_match() {
        let mut opts = Options::default();
        opts.filter_url = Some("/docs".to_string());
        assert!(opts.matches_filter("/docs/a"));
        assert!(!opts.matches_filter("/blog/a"));
    }
}
