//! Enumerating refs and deciding which ones are packed and pruned.

use crate::{PackError, Result};
use refpack_storage::{ObjectId, RefBackend, RefEntry};

/// What happens to one enumerated ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Left out of the snapshot.
    Skip,
    /// Written to the snapshot; tags also get a peeled line.
    Pack {
        /// The ref lives under `refs/tags/`.
        peel: bool,
    },
}

/// A loose ref that may be removed once the snapshot is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneCandidate {
    /// Full ref name.
    pub name: String,
    /// Value the ref had when it was packed.
    pub expected_target: ObjectId,
}

/// Lists every ref through `refs`. Each call re-reads live state.
pub fn enumerate<R: RefBackend + ?Sized>(refs: &R) -> Result<impl Iterator<Item = RefEntry>> {
    refs.enumerate_refs()
        .map(Vec::into_iter)
        .map_err(PackError::Enumerate)
}

/// Applies the packing policy to one ref.
///
/// Symbolic refs are never packed. Tags and refs already in the snapshot
/// are always packed; anything else only when `all` is set.
pub fn select(entry: &RefEntry, all: bool) -> Selection {
    if entry.is_symbolic() {
        return Selection::Skip;
    }
    let is_tag = entry.is_tag();
    if !all && !is_tag && !entry.packed {
        return Selection::Skip;
    }
    Selection::Pack { peel: is_tag }
}

/// Returns the prune candidate for a packed ref, if it has a loose file.
pub fn prune_candidate(entry: &RefEntry) -> Option<PruneCandidate> {
    if entry.packed {
        return None;
    }
    entry.target().map(|expected_target| PruneCandidate {
        name: entry.name.clone(),
        expected_target,
    })
}
