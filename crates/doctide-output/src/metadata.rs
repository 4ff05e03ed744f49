use chrono::{DateTime, Utc};
use doctide_types::{DocError, Document};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One row of the manifest, projected from a written [`Document`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub url: String,
    pub title: String,
    pub relative_path: Option<String>,
    pub source_strategy: String,
    pub fetched_at: DateTime<Utc>,
    pub cache_hit: bool,
    pub rendered_with_js: bool,
    pub word_count: usize,
    pub char_count: usize,
    pub content_hash: Option<String>,
}

impl From<&Document> for DocumentRecord {
    fn from(doc: &Document) -> Self {
        Self {
            url: doc.url.clone(),
            title: doc.title.clone(),
            relative_path: doc.relative_path.clone(),
            source_strategy: doc.source_strategy.to_string(),
            fetched_at: doc.fetched_at,
            cache_hit: doc.cache_hit,
            rendered_with_js: doc.rendered_with_js,
            word_count: doc.word_count,
            char_count: doc.char_count,
            content_hash: doc.content_hash.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    strategy: &'a Option<String>,
    source_url: &'a Option<String>,
    generated_at: DateTime<Utc>,
    document_count: usize,
    documents: &'a [DocumentRecord],
}

/// Buffers document records in memory across a run and flushes them as a
/// single JSON manifest at the output root.
#[derive(Debug, Default)]
pub struct MetadataCollector {
    records: Mutex<Vec<DocumentRecord>>,
    strategy: Mutex<Option<String>>,
    source_url: Mutex<Option<String>>,
}

impl MetadataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, doc: &Document) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(doc.into());
    }

    pub fn set_strategy(&self, name: impl Into<String>) {
        *self.strategy.lock().unwrap_or_else(|e| e.into_inner()) = Some(name.into());
    }

    pub fn set_source_url(&self, url: impl Into<String>) {
        *self.source_url.lock().unwrap_or_else(|e| e.into_inner()) = Some(url.into());
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the manifest to `<output_root>/manifest.json`.
    pub fn flush(&self, output_root: &Path) -> Result<PathBuf, DocError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let strategy = self.strategy.lock().unwrap_or_else(|e| e.into_inner());
        let source_url = self.source_url.lock().unwrap_or_else(|e| e.into_inner());

        let manifest = Manifest {
            strategy: &strategy,
            source_url: &source_url,
            generated_at: Utc::now(),
            document_count: records.len(),
            documents: &records,
        };

        let path = output_root.join("manifest.json");
        let json = serde_json::to_vec_pretty(&manifest).map_err(|e| DocError::Write {
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

        Ok(path)
    }
}
