//! Compaction error types.

use refpack_storage::StorageError;
use thiserror::Error;

/// Fatal errors that abort a compaction run.
///
/// Each variant names the step that failed. None of them can occur once
/// pruning has started.
#[derive(Debug, Error)]
pub enum PackError {
    /// The options were rejected before any work began.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The snapshot lock could not be taken.
    #[error("unable to create ref-pack file structure: {0}")]
    Lock(#[source] StorageError),

    /// Listing the current refs failed.
    #[error("unable to enumerate refs: {0}")]
    Enumerate(#[source] StorageError),

    /// A tag ref's object could not be resolved.
    #[error("unable to peel {name}: {source}")]
    Peel {
        /// Ref being peeled.
        name: String,
        /// Object store failure.
        #[source]
        source: StorageError,
    },

    /// Writing to the new snapshot failed.
    #[error("failed to write ref-pack file: {0}")]
    Write(#[source] std::io::Error),

    /// A peeled line was requested without a reference line to attach to.
    #[error("peeled value {0} has no preceding reference line")]
    OrphanPeeled(String),

    /// Publishing the new snapshot failed.
    #[error("unable to overwrite old ref-pack file: {0}")]
    Commit(#[source] StorageError),
}
