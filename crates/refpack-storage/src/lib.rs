//! Git object and reference storage for refpack.
//!
//! This crate provides the collaborators the compaction engine works
//! against: content-addressed object stores (in-memory and loose-object
//! directories), the filesystem ref store with its `packed-refs` snapshot,
//! and git-style `.lock` files.

mod error;
mod files;
pub mod lockfile;
mod object;
pub mod packed;
mod refs;
mod store;
mod traits;

pub use error::StorageError;
pub use files::{FileRefStore, LooseRefLock, PACKED_REFS_FILE};
pub use lockfile::LockFile;
pub use object::{GitObject, ObjectId, ObjectType};
pub use packed::{PackedRef, PackedRefs};
pub use refs::{validate_ref_name, RefEntry, Reference, REFS_PREFIX, TAGS_PREFIX};
pub use store::{LooseObjectStore, ObjectStore};
pub use traits::{ObjectBackend, RefBackend, RefEntryLock};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
