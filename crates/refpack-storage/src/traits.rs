//! Storage backend traits.
//!
//! The compaction engine talks to object and ref storage only through these
//! traits, so the filesystem layout can be swapped for tests.

use crate::{GitObject, ObjectId, RefEntry, Result};
use std::time::Duration;

/// Read access to a content-addressed object store.
pub trait ObjectBackend: Send + Sync {
    /// Retrieves an object by ID.
    ///
    /// Returns `Ok(None)` if the object does not exist and an error if it
    /// exists but cannot be read or decoded.
    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>>;
}

/// A held lock on one loose reference.
///
/// Dropping the lock releases it without touching the reference.
pub trait RefEntryLock {
    /// Full name of the locked reference.
    fn name(&self) -> &str;

    /// Deletes the loose entry and releases the lock.
    fn remove_entry(self) -> Result<()>;
}

/// Per-reference storage with advisory exclusive locking.
pub trait RefBackend {
    /// Lock handle returned by [`RefBackend::lock_entry`].
    type Lock: RefEntryLock;

    /// Lists every reference under `refs/`, sorted by name.
    ///
    /// Each call re-reads live state.
    fn enumerate_refs(&self) -> Result<Vec<RefEntry>>;

    /// Locks the loose entry for `name` if it still points at `expected`.
    ///
    /// Returns `Ok(None)` when the lock is held elsewhere for the whole
    /// `timeout`, or when the loose entry is missing, symbolic, or points
    /// somewhere else.
    fn lock_entry(
        &self,
        name: &str,
        expected: &ObjectId,
        timeout: Duration,
    ) -> Result<Option<Self::Lock>>;
}
