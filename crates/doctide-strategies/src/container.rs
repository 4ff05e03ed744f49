use doctide_convert::{Converter, Html2MdConverter};
use doctide_fetch::{Fetcher, HttpFetcher};
use doctide_output::{MetadataCollector, SyncStateManager, Writer};
use doctide_render::{build_default_renderer, Renderer};
use doctide_types::{DocError, DocResult, Document, Options, SyncStateEntry};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared-dependency container: constructs and exclusively owns the
/// fetcher, renderer, converter, writer, collector, and sync-state manager.
/// Strategies hold only a `&Container` — they must never call `close()`.
pub struct Container {
    fetcher: Arc<dyn Fetcher>,
    renderer: OnceCell<Result<Arc<dyn Renderer>, String>>,
    converter: Arc<dyn Converter>,
    writer: Writer,
    collector: Arc<MetadataCollector>,
    state_manager: Arc<SyncStateManager>,
    pub opts: Options,
    pub cancel: CancellationToken,
    pub processed_count: Arc<AtomicUsize>,
    output_root: PathBuf,
    closed: AtomicBool,
}

impl Container {
    /// Wires every collaborator. The renderer is not constructed here — it
    /// is lazily built on the first `get_renderer` call.
    pub fn construct(opts: Options, user_agent: &str) -> anyhow::Result<Self> {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(HttpFetcher::new(user_agent, std::time::Duration::from_secs(30))?);
        let output_root = opts.output.clone();
        let writer = Writer::new(output_root.clone(), opts.json_metadata, opts.dry_run);
        let state_manager = Arc::new(SyncStateManager::load(&output_root, opts.full_sync));

        Ok(Self {
            fetcher,
            renderer: OnceCell::new(),
            converter: Arc::new(Html2MdConverter),
            writer,
            collector: Arc::new(MetadataCollector::new()),
            state_manager,
            opts,
            cancel: CancellationToken::new(),
            processed_count: Arc::new(AtomicUsize::new(0)),
            output_root,
            closed: AtomicBool::new(false),
        })
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// True once `self.cancel` has fired; every suspension point (fetch,
    /// render, clone, tar extract, file IO, and every worker-loop iteration)
    /// must check this before issuing the operation.
    pub fn check_cancelled(&self) -> DocResult<()> {
        if self.cancel.is_cancelled() {
            Err(DocError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Idempotent-skip check against the writer, honoring `--force`.
    pub fn already_written(&self, relative_path: &Path) -> bool {
        !self.opts.force && self.writer.exists(relative_path)
    }

    /// One-shot lazy initializer with sticky success/failure: the first
    /// caller pays the construction cost (and any failure), everyone after
    /// gets the cached `Ok`/`Err` without retrying.
    pub async fn get_renderer(&self) -> DocResult<Arc<dyn Renderer>> {
        let result = self
            .renderer
            .get_or_init(|| async {
                build_default_renderer()
                    .map(Arc::from)
                    .map_err(|e| e.to_string())
            })
            .await;

        result
            .clone()
            .map_err(DocError::RendererInit)
    }

    pub fn set_strategy(&self, name: impl Into<String>) {
        self.collector.set_strategy(name);
    }

    pub fn set_source_url(&self, url: impl Into<String>) {
        self.collector.set_source_url(url);
    }

    /// Routes a finished document through the optional enhancement hook
    /// (none wired in this build — an external collaborator per spec), the
    /// writer, the metadata collector, and the sync-state manager.
    pub fn write_document(&self, doc: Document) -> DocResult<()> {
        if self.opts.limit_reached(self.processed_count.load(SeqCst)) {
            return Ok(());
        }

        let artifact = match self.writer.write(&doc) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(url = %doc.url, error = %e, "write failed, dropping document");
                return Ok(());
            }
        };

        self.collector.record(&doc);
        self.processed_count.fetch_add(1, SeqCst);

        let relative_display = artifact
            .absolute_path
            .strip_prefix(&self.output_root)
            .unwrap_or(&artifact.absolute_path)
            .display()
            .to_string();

        self.state_manager.record(
            doc.url.clone(),
            SyncStateEntry {
                content_hash: artifact.content_hash,
                fetched_at: doc.fetched_at,
                file_path: relative_display,
            },
        );

        Ok(())
    }

    /// Removes files whose URL appeared in the previous sync snapshot but
    /// not in this run. Missing files are not an error — another strategy
    /// pass, or a manual deletion, may have already removed them. A
    /// `--dry-run` invocation reports what would be pruned without touching
    /// the filesystem.
    pub fn prune_deleted(&self) -> Vec<String> {
        if !self.opts.sync && !self.opts.full_sync {
            return Vec::new();
        }
        let deleted = self.state_manager.deleted_entries_since_last_run();
        let mut urls = Vec::with_capacity(deleted.len());
        for (url, relative_path) in deleted {
            if !self.opts.dry_run {
                let absolute = self.output_root.join(&relative_path);
                match std::fs::remove_file(&absolute) {
                    Ok(()) => debug!(url = %url, path = %absolute.display(), "pruned stale artifact"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(url = %url, path = %absolute.display(), error = %e, "failed to prune stale artifact"),
                }
            } else {
                debug!(url = %url, path = %relative_path, "dry run: would prune stale artifact");
            }
            urls.push(url);
        }
        urls
    }

    pub fn flush_metadata(&self) -> DocResult<()> {
        if !self.opts.json_metadata {
            return Ok(());
        }
        self.collector.flush(&self.output_root)?;
        Ok(())
    }

    pub fn save_state(&self) -> DocResult<()> {
        if !self.opts.sync && !self.opts.full_sync {
            return Ok(());
        }
        self.state_manager.save(&self.output_root)?;
        Ok(())
    }

    /// Releases owned resources in dependency order: state manager, writer,
    /// renderer, cache, fetcher. Every step is a no-op the second time.
    pub fn close(&self) {
        if self.closed.swap(true, SeqCst) {
            return;
        }
        info!(summary = %self.fetcher.metrics().summary_line(), "closing dependency container");
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctide_types::SourceStrategy;

    fn opts(output: &std::path::Path) -> Options {
        Options {
            output: output.to_path_buf(),
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn renderer_failure_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();

        let first = container.get_renderer().await;
        let second = container.get_renderer().await;
        assert!(first.is_err());
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn write_document_records_sync_state() {
        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();

        let doc = Document::new("https://docs.example.com/a", "A", "body", SourceStrategy::Crawler)
            .with_relative_path("docs.example.com/a.md");
        container.write_document(doc).unwrap();

        assert_eq!(container.processed_count.load(SeqCst), 1);
        assert!(dir.path().join("docs.example.com/a.md").is_file());
    }

    #[tokio::test]
    async fn already_written_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts(dir.path());
        o.force = false;
        let container = Container::construct(o, "doctide-test/1.0").unwrap();

        let doc = Document::new("https://docs.example.com/a", "A", "body", SourceStrategy::Crawler)
            .with_relative_path("a.md");
        container.write_document(doc).unwrap();

        assert!(container.already_written(std::path::Path::new("a.md")));

        let mut forced = opts(dir.path());
        forced.force = true;
        let forcing_container = Container::construct(forced, "doctide-test/1.0").unwrap();
        assert!(!forcing_container.already_written(std::path::Path::new("a.md")));
    }

    #[tokio::test]
    async fn prune_deleted_removes_files_absent_from_this_run() {
        let dir = tempfile::tempdir().unwrap();

        let mut first_opts = opts(dir.path());
        first_opts.sync = true;
        let first = Container::construct(first_opts, "doctide-test/1.0").unwrap();
        let gone = Document::new("https://docs.example.com/gone", "Gone", "body", SourceStrategy::Crawler)
            .with_relative_path("gone.md");
        first.write_document(gone).unwrap();
        first.save_state().unwrap();
        assert!(dir.path().join("gone.md").is_file());
        drop(first);

        let mut second_opts = opts(dir.path());
        second_opts.sync = true;
        let second = Container::construct(second_opts, "doctide-test/1.0").unwrap();
        let pruned = second.prune_deleted();

        assert_eq!(pruned, vec!["https://docs.example.com/gone".to_string()]);
        assert!(!dir.path().join("gone.md").exists());
    }

    #[tokio::test]
    async fn prune_deleted_dry_run_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();

        let mut first_opts = opts(dir.path());
        first_opts.sync = true;
        let first = Container::construct(first_opts, "doctide-test/1.0").unwrap();
        let gone = Document::new("https://docs.example.com/gone", "Gone", "body", SourceStrategy::Crawler)
            .with_relative_path("gone.md");
        first.write_document(gone).unwrap();
        first.save_state().unwrap();
        drop(first);

        let mut second_opts = opts(dir.path());
        second_opts.sync = true;
        second_opts.dry_run = true;
        let second = Container::construct(second_opts, "doctide-test/1.0").unwrap();
        let pruned = second.prune_deleted();

        assert_eq!(pruned, vec!["https://docs.example.com/gone".to_string()]);
        assert!(dir.path().join("gone.md").is_file());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let container = Container::construct(opts(dir.path()), "doctide-test/1.0").unwrap();
        container.close();
        container.close();
    }
}
