use doctide_types::{DocError, SyncSnapshot, SyncStateEntry};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Conventional state-file name under the output root; not documented as a
/// stable interface (spec §6 leaves the name implementation-defined).
pub const STATE_FILE_NAME: &str = ".doctide-sync.json";

/// Loads the previous run's snapshot (if any), accumulates this run's
/// entries, and persists the merged result back to disk.
#[derive(Debug)]
pub struct SyncStateManager {
    previous: SyncSnapshot,
    current: Mutex<SyncSnapshot>,
}

impl SyncStateManager {
    /// `full_sync` discards the previous snapshot entirely (every URL is
    /// treated as new, and nothing not re-seen this run survives pruning
    /// checks against an empty baseline).
    pub fn load(output_root: &Path, full_sync: bool) -> Self {
        let path = output_root.join(STATE_FILE_NAME);
        let previous = if full_sync {
            SyncSnapshot::default()
        } else {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable sync state file");
                    SyncSnapshot::default()
                }),
                Err(_) => SyncSnapshot::default(),
            }
        };

        Self {
            previous,
            current: Mutex::new(SyncSnapshot::default()),
        }
    }

    pub fn record(&self, url: impl Into<String>, entry: SyncStateEntry) {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .insert(url.into(), entry);
    }

    /// URLs present in the previous snapshot but not recorded this run.
    pub fn deleted_since_last_run(&self) -> Vec<String> {
        let current_urls: HashSet<String> = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .keys()
            .cloned()
            .collect();
        self.previous.deleted_since(&current_urls)
    }

    /// Like [`Self::deleted_since_last_run`] but pairs each URL with its
    /// last-known relative `file_path`, so the caller can remove the file.
    pub fn deleted_entries_since_last_run(&self) -> Vec<(String, String)> {
        let current_urls: HashSet<String> = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .keys()
            .cloned()
            .collect();
        self.previous.deleted_entries_since(&current_urls)
    }

    pub fn save(&self, output_root: &Path) -> Result<PathBuf, DocError> {
        let path = output_root.join(STATE_FILE_NAME);
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_vec_pretty(&*current).map_err(|e| DocError::Write {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DocError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(&path, json).map_err(|e| DocError::Write {
            path: path.clone(),
            source: e,
        })?;

        debug!(path = %path.display(), entries = current.entries.len(), "saved sync state");
        Ok(path)
    }
}
