//! The compaction driver.
//!
//! A run moves through [`Phase`]s strictly in order:
//!
//! ```text
//! Enumerating -> Writing -> Committing -> Pruning -> Done
//! ```
//!
//! Any failure before `Pruning` aborts the run with the lock file discarded,
//! so loose refs and the previous snapshot are untouched. `Pruning` starts
//! only after the snapshot commit succeeded and cannot fail.

use crate::prune::{prune_refs, PruneReport};
use crate::select::{enumerate, prune_candidate, select, PruneCandidate, Selection};
use crate::snapshot::SnapshotWriter;
use crate::{PackError, PackOptions, Peeler, Result};
use refpack_storage::{FileRefStore, ObjectBackend, RefBackend};
use std::fmt;
use std::path::PathBuf;

/// Steps of a compaction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Listing refs.
    Enumerating,
    /// Writing selected refs into the new snapshot.
    Writing,
    /// Publishing the new snapshot.
    Committing,
    /// Removing loose refs now held by the snapshot.
    Pruning,
    /// Finished.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enumerating => "enumerating",
            Self::Writing => "writing",
            Self::Committing => "committing",
            Self::Pruning => "pruning",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackSummary {
    /// Refs written to the snapshot.
    pub packed: usize,
    /// Peeled lines written to the snapshot.
    pub peeled: usize,
    /// Refs left out of the snapshot (symbolic, or loose non-tags without `all`).
    pub skipped: usize,
    /// Loose refs removed.
    pub pruned: usize,
    /// Prune candidates left in place.
    pub prune_skipped: usize,
}

/// Compacts the refs of one store into a snapshot file.
pub struct RefPacker<'a, R: ?Sized, O: ?Sized> {
    refs: &'a R,
    objects: &'a O,
    snapshot_path: PathBuf,
    options: PackOptions,
}

impl<'a, R, O> RefPacker<'a, R, O>
where
    R: RefBackend + ?Sized,
    O: ObjectBackend + ?Sized,
{
    /// Creates a packer writing the snapshot to `snapshot_path`.
    pub fn new(
        refs: &'a R,
        objects: &'a O,
        snapshot_path: impl Into<PathBuf>,
        options: PackOptions,
    ) -> Self {
        Self {
            refs,
            objects,
            snapshot_path: snapshot_path.into(),
            options,
        }
    }

    /// Runs one compaction pass.
    pub fn run(&self) -> Result<PackSummary> {
        self.options.validate()?;
        tracing::info!(
            path = %self.snapshot_path.display(),
            all = self.options.all,
            prune = self.options.prune,
            "packing refs"
        );

        // The lock is taken before enumerating so the snapshot reflects one
        // instant: no other compactor can commit in between.
        let mut writer =
            SnapshotWriter::begin(&self.snapshot_path, self.options.commit_lock_timeout)?;

        let mut phase = Phase::Enumerating;
        tracing::debug!(%phase);
        let entries = enumerate(self.refs)?;

        phase = Phase::Writing;
        tracing::debug!(%phase);
        let peeler = Peeler::new(self.objects);
        let mut summary = PackSummary::default();
        let mut candidates: Vec<PruneCandidate> = Vec::new();

        for entry in entries {
            let Selection::Pack { peel } = select(&entry, self.options.all) else {
                tracing::trace!(name = %entry.name, "leaving ref unpacked");
                summary.skipped += 1;
                continue;
            };
            let Some(target) = entry.target() else {
                continue;
            };

            writer.write_reference(&entry.name, &target)?;
            if peel {
                let peeled = peeler.peel(&target).map_err(|source| PackError::Peel {
                    name: entry.name.clone(),
                    source,
                })?;
                if let Some(peeled) = peeled {
                    writer.write_peeled(&peeled)?;
                }
            }
            tracing::trace!(name = %entry.name, %target, "packed ref");

            if self.options.prune {
                candidates.extend(prune_candidate(&entry));
            }
        }
        summary.packed = writer.refs_written();
        summary.peeled = writer.peeled_written();

        phase = Phase::Committing;
        tracing::debug!(%phase);
        writer.commit()?;

        if self.options.prune {
            phase = Phase::Pruning;
            tracing::debug!(%phase, candidates = candidates.len());
            let PruneReport { pruned, skipped } =
                prune_refs(self.refs, candidates, self.options.ref_lock_timeout);
            summary.pruned = pruned;
            summary.prune_skipped = skipped;
        }

        phase = Phase::Done;
        tracing::info!(
            %phase,
            packed = summary.packed,
            peeled = summary.peeled,
            pruned = summary.pruned,
            prune_skipped = summary.prune_skipped,
            "packed refs"
        );
        Ok(summary)
    }
}

/// Packs the refs of a git directory into its `packed-refs` file.
pub fn pack_refs<O: ObjectBackend + ?Sized>(
    refs: &FileRefStore,
    objects: &O,
    options: PackOptions,
) -> Result<PackSummary> {
    RefPacker::new(refs, objects, refs.packed_refs_path(), options).run()
}
