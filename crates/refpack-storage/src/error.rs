//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested object does not exist in the object store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// An object could not be parsed.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// A reference name or value is malformed.
    #[error("invalid ref: {0}")]
    InvalidRef(String),

    /// A corruption was detected in an on-disk structure.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// zlib compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Another process holds the lock file for this path.
    #[error("unable to create '{}': file exists; another process seems to be running", .path.display())]
    LockHeld {
        /// Path of the existing `.lock` file.
        path: PathBuf,
    },
}
