//! Writing a new packed-refs snapshot.
//!
//! The snapshot is written into `packed-refs.lock`, which doubles as the
//! commit lock: while a [`SnapshotWriter`] exists no other compactor can
//! start. [`SnapshotWriter::commit`] flushes, fsyncs and renames the lock
//! file over `packed-refs`. Dropping the writer instead discards everything
//! written and leaves the previous snapshot as it was.

use crate::{PackError, Result};
use refpack_storage::packed::{format_peeled_line, format_ref_line, PACKED_REFS_HEADER};
use refpack_storage::{LockFile, ObjectId};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// An in-progress snapshot holding the commit lock.
#[derive(Debug)]
pub struct SnapshotWriter {
    out: BufWriter<LockFile>,
    /// Whether the last line written was a reference line without a peeled line.
    can_peel: bool,
    refs: usize,
    peeled: usize,
}

impl SnapshotWriter {
    /// Takes the lock on `path` and writes the header.
    pub fn begin(path: &Path, timeout: Duration) -> Result<Self> {
        let lock = LockFile::acquire(path, timeout).map_err(PackError::Lock)?;
        let mut writer = Self {
            out: BufWriter::new(lock),
            can_peel: false,
            refs: 0,
            peeled: 0,
        };
        writer.write_line(PACKED_REFS_HEADER)?;
        Ok(writer)
    }

    /// Appends a reference line.
    pub fn write_reference(&mut self, name: &str, target: &ObjectId) -> Result<()> {
        self.write_line(&format_ref_line(name, target))?;
        self.refs += 1;
        self.can_peel = true;
        Ok(())
    }

    /// Appends the peeled value of the reference written just before.
    pub fn write_peeled(&mut self, peeled: &ObjectId) -> Result<()> {
        if !self.can_peel {
            return Err(PackError::OrphanPeeled(peeled.to_hex()));
        }
        self.write_line(&format_peeled_line(peeled))?;
        self.peeled += 1;
        self.can_peel = false;
        Ok(())
    }

    /// Number of reference lines written so far.
    pub fn refs_written(&self) -> usize {
        self.refs
    }

    /// Number of peeled lines written so far.
    pub fn peeled_written(&self) -> usize {
        self.peeled
    }

    /// Path of the lock file the snapshot is being written to.
    pub fn lock_path(&self) -> &Path {
        self.out.get_ref().lock_path()
    }

    /// Durably replaces the canonical snapshot with what was written.
    pub fn commit(self) -> Result<()> {
        let lock = self
            .out
            .into_inner()
            .map_err(|e| PackError::Write(e.into_error()))?;
        lock.commit().map_err(PackError::Commit)
    }

    /// Discards the snapshot and releases the lock.
    pub fn abort(self) {
        let (lock, _) = self.out.into_parts();
        lock.rollback();
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.out.write_all(line.as_bytes()).map_err(PackError::Write)
    }
}
