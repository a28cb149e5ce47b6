//! Filesystem reference store.
//!
//! Refs live in a git directory in two places: one loose file per ref under
//! `refs/`, and the `packed-refs` snapshot. A loose file always shadows a
//! packed entry of the same name.

use crate::lockfile::{LockFile, LOCK_SUFFIX};
use crate::packed::PackedRefs;
use crate::refs::{validate_ref_name, REFS_PREFIX};
use crate::{ObjectId, RefBackend, RefEntry, RefEntryLock, Reference, Result, StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// File name of the snapshot inside the git directory.
pub const PACKED_REFS_FILE: &str = "packed-refs";

/// Reads and writes the refs of one git directory.
#[derive(Debug, Clone)]
pub struct FileRefStore {
    git_dir: PathBuf,
}

impl FileRefStore {
    /// Opens the ref store of the git directory at `git_dir`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    /// Canonical path of the packed-refs snapshot.
    pub fn packed_refs_path(&self) -> PathBuf {
        self.git_dir.join(PACKED_REFS_FILE)
    }

    /// Path of the loose file for `name`.
    pub fn loose_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.git_dir.clone(), |path, component| path.join(component))
    }

    /// Reads the loose file for `name`, `None` if there is none.
    pub fn read_loose(&self, name: &str) -> Result<Option<Reference>> {
        match fs::read_to_string(self.loose_path(name)) {
            Ok(content) => Reference::parse_loose(&content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the packed-refs snapshot; a missing file is an empty snapshot.
    pub fn read_packed(&self) -> Result<PackedRefs> {
        match fs::read_to_string(self.packed_refs_path()) {
            Ok(content) => PackedRefs::parse(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PackedRefs::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves `name` one level: the loose value, else the packed value.
    pub fn read_ref(&self, name: &str) -> Result<Option<RefEntry>> {
        if let Some(value) = self.read_loose(name)? {
            return Ok(Some(RefEntry::loose(name, value)));
        }
        Ok(self
            .read_packed()?
            .get(name)
            .map(|packed| RefEntry::packed(name, packed.target)))
    }

    /// Writes a loose ref under its lock, creating parent directories.
    pub fn write_loose(&self, name: &str, value: &Reference, timeout: Duration) -> Result<()> {
        validate_ref_name(name)?;
        let path = self.loose_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut lock = LockFile::acquire(path, timeout)?;
        lock.write_all(value.to_loose().as_bytes())?;
        lock.commit()
    }

    fn loose_refs(&self) -> Result<Vec<RefEntry>> {
        let root = self.git_dir.join(REFS_PREFIX.trim_end_matches('/'));
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(LOCK_SUFFIX))
            {
                continue;
            }

            let Some(name) = ref_name_for(&self.git_dir, path) else {
                tracing::warn!(path = %path.display(), "ignoring ref with non-utf8 name");
                continue;
            };
            if let Err(e) = validate_ref_name(&name) {
                tracing::warn!(error = %e, "ignoring ref with invalid name");
                continue;
            }

            match self.read_loose(&name) {
                Ok(Some(value)) => entries.push(RefEntry::loose(name, value)),
                // Deleted between the walk and the read.
                Ok(None) => {}
                Err(StorageError::InvalidRef(reason)) => {
                    tracing::warn!(name = %name, reason = %reason, "ignoring broken ref");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }
}

/// Maps a file below `git_dir` to its slash-separated ref name.
fn ref_name_for(git_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(git_dir).ok()?;
    let components = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(components.join("/"))
}

impl RefBackend for FileRefStore {
    type Lock = LooseRefLock;

    fn enumerate_refs(&self) -> Result<Vec<RefEntry>> {
        let mut merged: BTreeMap<String, RefEntry> = self
            .read_packed()?
            .refs
            .into_iter()
            .map(|packed| {
                let entry = RefEntry::packed(packed.name.clone(), packed.target);
                (packed.name, entry)
            })
            .collect();

        for entry in self.loose_refs()? {
            merged.insert(entry.name.clone(), entry);
        }
        Ok(merged.into_values().collect())
    }

    fn lock_entry(
        &self,
        name: &str,
        expected: &ObjectId,
        timeout: Duration,
    ) -> Result<Option<LooseRefLock>> {
        let path = self.loose_path(name);
        let lock = match LockFile::acquire(&path, timeout) {
            Ok(lock) => lock,
            Err(StorageError::LockHeld { path }) => {
                tracing::debug!(name = %name, lock = %path.display(), "ref is locked elsewhere");
                return Ok(None);
            }
            // The ref's directory is gone, so is the ref.
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match self.read_loose(name)? {
            Some(Reference::Direct(current)) if current == *expected => Ok(Some(LooseRefLock {
                name: name.to_string(),
                path,
                git_dir: self.git_dir.clone(),
                lock,
            })),
            current => {
                tracing::debug!(
                    name = %name,
                    expected = %expected,
                    current = ?current,
                    "ref changed since enumeration"
                );
                Ok(None)
            }
        }
    }
}

/// Lock on a loose ref file, held while it is validated and removed.
#[derive(Debug)]
pub struct LooseRefLock {
    name: String,
    path: PathBuf,
    git_dir: PathBuf,
    lock: LockFile,
}

/// Removes directories left empty below `refs/<category>/` by deleting `name`.
fn remove_empty_parents(git_dir: &Path, name: &str) {
    let mut components: Vec<&str> = name.split('/').collect();
    components.pop();
    while components.len() > 2 {
        let dir = components
            .iter()
            .fold(git_dir.to_path_buf(), |path, component| path.join(component));
        if fs::remove_dir(&dir).is_err() {
            break;
        }
        components.pop();
    }
}

impl RefEntryLock for LooseRefLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn remove_entry(self) -> Result<()> {
        let Self {
            name,
            path,
            git_dir,
            lock,
        } = self;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        // The lock file shares the ref's directory, so release it first.
        lock.rollback();
        remove_empty_parents(&git_dir, &name);
        tracing::trace!(name = %name, path = %path.display(), "removed loose ref");
        Ok(())
    }
}
