//! Error taxonomy shared by every doctide crate.
//!
//! The variants mirror the table in spec §7 one-to-one so that call sites can
//! match on `kind()` to decide whether a failure is fatal (propagate and stop
//! the strategy) or degrading (log and skip the one item that failed).

use thiserror::Error;

/// The full error taxonomy for a doctide run.
#[derive(Debug, Error)]
pub enum DocError {
    /// The root cancellation token fired; the caller must stop promptly.
    #[error("operation canceled")]
    Canceled,

    /// A URL could not be parsed, or did not match any supported platform.
    #[error("unsupported or unparsable URL: {0}")]
    UrlParse(String),

    /// A `--filter-url`/subpath restriction named a path that does not exist.
    #[error("filter subpath not found: {0}")]
    FilterSubpathMissing(String),

    /// Non-2xx HTTP response or connection failure for a single resource.
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// Archive download failed (missing branch, private repo, etc).
    #[error("archive error for {repo}: {message}")]
    Archive { repo: String, message: String },

    /// A response body failed to parse as the expected format.
    #[error("parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// The HTML→Markdown conversion pipeline failed for one page.
    #[error("conversion failed for {url}: {message}")]
    Conversion { url: String, message: String },

    /// Writing a single document to disk failed.
    #[error("write failed for {path:?}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer failed to initialize; sticky across the run.
    #[error("renderer initialization failed: {0}")]
    RendererInit(String),

    /// A tar entry attempted to escape the extraction root; silently skipped
    /// by the caller, but recorded as this variant for logging.
    #[error("security violation: tar entry {0} escapes destination root")]
    SecurityViolation(String),

    /// One-shot setup failure (temp dir creation, repo acquisition, a
    /// required dependency missing). Always fatal.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Catch-all for errors bubbled up from a dependency via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocError {
    /// True for errors that must abort the whole strategy run; false for
    /// errors that should be logged and the offending item dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocError::Canceled
                | DocError::UrlParse(_)
                | DocError::FilterSubpathMissing(_)
                | DocError::Setup(_)
        )
    }
}

pub type DocResult<T> = Result<T, DocError>;
