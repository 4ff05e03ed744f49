use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-document record kept across runs for `--sync`/`--full-sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStateEntry {
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    pub file_path: String,
}

/// The whole on-disk sync snapshot, keyed by canonical URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub entries: HashMap<String, SyncStateEntry>,
}

impl SyncSnapshot {
    /// URLs present in `self` (the previous run) but absent from
    /// `current_urls` (this run) — candidates for [`crate::container`]'s
    /// `prune_deleted`.
    pub fn deleted_since(&self, current_urls: &std::collections::HashSet<String>) -> Vec<String> {
        self.entries
            .keys()
            .filter(|url| !current_urls.contains(*url))
            .cloned()
            .collect()
    }

    /// Like [`Self::deleted_since`] but carries each deleted URL's
    /// last-known `file_path`, so a caller can actually remove the artifact.
    pub fn deleted_entries_since(
        &self,
        current_urls: &std::collections::HashSet<String>,
    ) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(url, _)| !current_urls.contains(url.as_str()))
            .map(|(url, entry)| (url.clone(), entry.file_path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_urls_missing_from_current_run() {
        let mut snap = SyncSnapshot::default();
        snap.entries.insert(
            "https://x/a".into(),
            SyncStateEntry {
                content_hash: "h".into(),
                fetched_at: Utc::now(),
                file_path: "a.md".into(),
            },
        );
        snap.entries.insert(
            "https://x/b".into(),
            SyncStateEntry {
                content_hash: "h".into(),
                fetched_at: Utc::now(),
                file_path: "b.md".into(),
            },
        );

        let mut current = std::collections::HashSet::new();
        current.insert("https://x/a".to_string());

        let deleted = snap.deleted_since(&current);
        assert_eq!(deleted, vec!["https://x/b".to_string()]);
    }
}
