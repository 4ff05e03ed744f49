//! # doctide-types
//!
//! Shared data model, canonical-URL identity, and error taxonomy consumed by
//! every other `doctide` crate. Nothing in this crate performs I/O; it holds
//! plain data and the small amount of pure logic (canonicalization, count
//! helpers) that every strategy needs identically.

pub mod canonical;
pub mod document;
pub mod error;
pub mod options;
pub mod probe;
pub mod repo;
pub mod response;
pub mod sync;
pub mod wiki;

pub use canonical::{canonicalize, resolve, same_registered_domain};
pub use document::{Document, SourceStrategy};
pub use error::{DocError, DocResult};
pub use options::Options;
pub use probe::{DiscoveryProbe, ProbeParser};
pub use repo::{Platform, RepoUrlInfo};
pub use response::Response;
pub use sync::{SyncSnapshot, SyncStateEntry};
pub use wiki::{WikiPage, WikiSection, WikiStructure};
