use doctide_types::{DocError, Document};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What got written: the absolute path and the content hash, so the caller
/// (the dependency container) can record both in sync state without
/// recomputing the hash itself.
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    pub absolute_path: PathBuf,
    pub content_hash: String,
}

/// Idempotent Markdown (+ optional sidecar JSON) writer. Writing is atomic
/// at file granularity: content lands in a `.tmp` sibling first, then is
/// renamed into place, so a crash mid-write never leaves a half-written
/// document behind.
#[derive(Debug, Clone)]
pub struct Writer {
    output_root: PathBuf,
    json_metadata: bool,
    dry_run: bool,
}

impl Writer {
    pub fn new(output_root: PathBuf, json_metadata: bool, dry_run: bool) -> Self {
        Self {
            output_root,
            json_metadata,
            dry_run,
        }
    }

    fn absolute(&self, relative_path: &Path) -> PathBuf {
        self.output_root.join(relative_path)
    }

    /// Idempotent-skip check: does this document already have a written
    /// artifact, regardless of whether its content has since changed.
    pub fn exists(&self, relative_path: &Path) -> bool {
        self.absolute(relative_path).is_file()
    }

    /// Writes `doc.content` to its derived path, plus a `.json` sidecar next
    /// to it when the writer was constructed with `json_metadata = true`.
    /// The content hash is computed over the post-conversion Markdown bytes
    /// actually written, not anything upstream of it.
    pub fn write(&self, doc: &Document) -> Result<WrittenArtifact, DocError> {
        let relative = doc.relative_path.as_deref().ok_or_else(|| DocError::Write {
            path: self.output_root.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "document has no relative_path assigned",
            ),
        })?;
        let absolute = self.absolute(Path::new(relative));
        let content_hash = hex_sha256(doc.content.as_bytes());

        if self.dry_run {
            debug!(path = %absolute.display(), "dry-run: skipping write");
            return Ok(WrittenArtifact {
                absolute_path: absolute,
                content_hash,
            });
        }

        atomic_write(&absolute, doc.content.as_bytes())?;

        if self.json_metadata {
            let sidecar = sidecar_path(&absolute);
            let json = serde_json::to_vec_pretty(&doc).map_err(|e| DocError::Write {
                path: sidecar.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
            atomic_write(&sidecar, &json)?;
        }

        Ok(WrittenArtifact {
            absolute_path: absolute,
            content_hash,
        })
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn sidecar_path(markdown_path: &Path) -> PathBuf {
    let stem = markdown_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    markdown_path.with_file_name(format!("{stem}.metadata.json"))
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), DocError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DocError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let tmp_path = path.with_extension(tmp_extension(path));
    fs::write(&tmp_path, bytes).map_err(|e| DocError::Write {
        path: tmp_path.clone(),
        source: e,
    })?;

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "atomic rename failed, cleaning up temp file");
            let _ = fs::remove_file(&tmp_path);
            Err(DocError::Write {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

fn tmp_extension(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctide_types::SourceStrategy;

    fn sample_doc(relative_path: &str) -> Document {
        Document::new("https://docs.example.com/a", "A", "# A", SourceStrategy::Crawler)
            .with_relative_path(relative_path)
    }

    #[test]
    fn write_then_exists_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(dir.path().to_path_buf(), false, false);
        let doc = sample_doc("guide/intro.md");

        assert!(!writer.exists(Path::new("guide/intro.md")));
        let written = writer.write(&doc).unwrap();
        assert!(written.absolute_path.is_file());
        assert!(!written.content_hash.is_empty());
        assert!(writer.exists(Path::new("guide/intro.md")));

        let contents = fs::read_to_string(&written.absolute_path).unwrap();
        assert_eq!(contents, "# A");
    }

    #[test]
    fn dry_run_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(dir.path().to_path_buf(), false, true);
        let doc = sample_doc("guide/intro.md");

        writer.write(&doc).unwrap();
        assert!(!writer.exists(Path::new("guide/intro.md")));
    }

    #[test]
    fn json_metadata_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(dir.path().to_path_buf(), true, false);
        let doc = sample_doc("guide/intro.md");

        writer.write(&doc).unwrap();
        assert!(dir.path().join("guide/intro.metadata.json").is_file());
    }
}
