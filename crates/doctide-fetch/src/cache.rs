//! In-memory response cache keyed by canonical URL, so repeated discovery
//! probes (e.g. the sitemap strategy re-reading robots.txt) and resumed
//! `--sync` runs don't refetch a body already seen this process.

use dashmap::DashMap;
use doctide_types::Response;
use std::sync::Arc;

/// Shared, clonable cache handle.
#[derive(Clone, Default)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, Response>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Response> {
        self.inner.get(url).map(|e| e.value().clone())
    }

    pub fn put(&self, url: String, response: Response) {
        self.inner.insert(url, response);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_by_url() {
        let cache = ResponseCache::new();
        assert!(cache.get("https://x").is_none());
        cache.put(
            "https://x".to_string(),
            Response::new(200, "https://x", b"hi".to_vec()),
        );
        let hit = cache.get("https://x").unwrap();
        assert_eq!(hit.text(), "hi");
        assert_eq!(cache.len(), 1);
    }
}
