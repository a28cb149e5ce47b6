//! Reference compaction for git-style repositories.
//!
//! This crate rewrites a repository's loose refs into a single
//! `packed-refs` snapshot and prunes the loose files the snapshot now holds.
//!
//! # Correctness
//!
//! - The snapshot is written to `packed-refs.lock` and renamed into place
//!   only after it is complete and fsync'ed; readers see the old snapshot or
//!   the new one, never a mix.
//! - No loose ref is removed before the snapshot holding its value is
//!   committed.
//! - A loose ref is removed only if, under its own lock, it still has the
//!   value that was packed.
//!
//! # Modules
//!
//! - [`select`] - enumeration and the packing policy
//! - [`peel`] - annotated tag peeling
//! - [`snapshot`] - the snapshot writer and its commit
//! - [`prune`] - loose ref removal
//! - [`pack`] - the driver tying them together

mod error;
mod options;
pub mod pack;
pub mod peel;
pub mod prune;
pub mod select;
pub mod snapshot;

pub use error::PackError;
pub use options::{PackOptions, MAX_LOCK_TIMEOUT};
pub use pack::{pack_refs, PackSummary, Phase, RefPacker};
pub use peel::Peeler;
pub use prune::{prune_refs, PruneReport};
pub use select::{PruneCandidate, Selection};
pub use snapshot::SnapshotWriter;

/// Result type for compaction operations.
pub type Result<T> = std::result::Result<T, PackError>;
