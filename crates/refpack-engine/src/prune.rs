//! Removing loose refs that the committed snapshot now holds.
//!
//! Pruning only ever runs after the snapshot commit. Each candidate is
//! locked, re-validated against the value that was packed, and removed.
//! Anything that gets in the way (lock contention, a ref that moved, an I/O
//! error) skips that one candidate: its loose file stays, which is always
//! safe, and the next compaction tries again.

use crate::select::PruneCandidate;
use refpack_storage::{RefBackend, RefEntryLock};
use std::time::Duration;

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Loose refs removed.
    pub pruned: usize,
    /// Candidates left in place.
    pub skipped: usize,
}

/// Prunes every candidate independently. Never fails.
pub fn prune_refs<R: RefBackend + ?Sized>(
    refs: &R,
    candidates: Vec<PruneCandidate>,
    lock_timeout: Duration,
) -> PruneReport {
    let mut report = PruneReport::default();
    for candidate in candidates {
        if prune_ref(refs, &candidate, lock_timeout) {
            report.pruned += 1;
        } else {
            report.skipped += 1;
        }
    }
    report
}

/// Makes sure nobody touched the ref, then removes it.
fn prune_ref<R: RefBackend + ?Sized>(
    refs: &R,
    candidate: &PruneCandidate,
    lock_timeout: Duration,
) -> bool {
    let lock = match refs.lock_entry(&candidate.name, &candidate.expected_target, lock_timeout) {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            tracing::debug!(name = %candidate.name, "not pruning: ref is locked or changed");
            return false;
        }
        Err(e) => {
            tracing::debug!(name = %candidate.name, error = %e, "not pruning: unable to lock ref");
            return false;
        }
    };

    match lock.remove_entry() {
        Ok(()) => {
            tracing::debug!(name = %candidate.name, "pruned loose ref");
            true
        }
        Err(e) => {
            tracing::debug!(
                name = %candidate.name,
                error = %e,
                "not pruning: unable to remove ref"
            );
            false
        }
    }
}
