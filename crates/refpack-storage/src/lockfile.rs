//! Exclusive `.lock` files with commit-by-rename.
//!
//! A [`LockFile`] guards a target path by creating `<target>.lock` with
//! `O_EXCL`. Every process that mutates the target follows the same
//! protocol, so holding the lock file is holding the target. New content is
//! written into the lock file itself and published with [`LockFile::commit`],
//! which flushes, fsyncs and renames it over the target in one step.
//!
//! # Invariants
//!
//! - Acquisition never blocks indefinitely: it retries until the timeout
//!   elapses and then fails with [`StorageError::LockHeld`].
//! - A lock that is dropped without being committed is rolled back: the
//!   `.lock` file is removed and the target is left untouched.

use crate::{Result, StorageError};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Suffix appended to the target path to form the lock path.
pub const LOCK_SUFFIX: &str = ".lock";

/// Longest single pause between acquisition attempts.
const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// Returns the lock path guarding `target`.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// An exclusive lock on a single file path.
#[derive(Debug)]
pub struct LockFile {
    target: PathBuf,
    lock_path: PathBuf,
    /// Open handle on the lock file; `None` once committed or rolled back.
    file: Option<File>,
}

impl LockFile {
    /// Acquires the lock for `target`, retrying for at most `timeout`.
    ///
    /// A zero timeout makes a single attempt.
    ///
    /// # Errors
    ///
    /// - [`StorageError::LockHeld`] if another process keeps the lock for
    ///   the whole timeout
    /// - [`StorageError::Io`] if the lock file cannot be created for any
    ///   other reason (missing directory, permissions)
    pub fn acquire(target: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let target = target.into();
        let lock_path = lock_path_for(&target);
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_millis(1);

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(file) => {
                    tracing::trace!(path = %lock_path.display(), "acquired lock");
                    return Ok(Self {
                        target,
                        lock_path,
                        file: Some(file),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(StorageError::LockHeld { path: lock_path });
                    }
                    thread::sleep(backoff.min(deadline - now));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
    }

    /// Path being protected.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the `.lock` file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Publishes the written content over the target path.
    ///
    /// The data is flushed and forced to stable storage before the rename,
    /// so the target is either the old file or the complete new one.
    pub fn commit(mut self) -> Result<()> {
        let mut file = self.file.take().ok_or_else(closed)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&self.lock_path, &self.target) {
            let _ = fs::remove_file(&self.lock_path);
            return Err(StorageError::Io(e));
        }
        tracing::trace!(path = %self.target.display(), "committed lock");
        Ok(())
    }

    /// Releases the lock and discards anything written to it.
    pub fn rollback(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.lock_path) {
                tracing::warn!(
                    path = %self.lock_path.display(),
                    error = %e,
                    "failed to remove lock file"
                );
            }
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "lock file already closed")
}

impl Write for LockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.as_mut().ok_or_else(closed)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_mut().ok_or_else(closed)?.flush()
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.release();
    }
}
