//! Output layer: deterministic URL-to-path derivation, an idempotent atomic
//! writer, the in-memory metadata collector, and JSON-file-backed
//! incremental-sync state.

mod metadata;
mod path;
mod sync_state;
mod writer;

pub use metadata::{DocumentRecord, MetadataCollector};
pub use path::derive_relative_path;
pub use sync_state::{SyncStateManager, STATE_FILE_NAME};
pub use writer::{Writer, WrittenArtifact};
