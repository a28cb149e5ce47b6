//! Object stores.
//!
//! [`ObjectStore`] keeps objects in memory; [`LooseObjectStore`] reads and
//! writes git's loose object layout (`objects/xx/yyyy…`, zlib-compressed).

use crate::{GitObject, ObjectBackend, ObjectId, ObjectType, Result, StorageError};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Content-addressed object store.
#[derive(Debug, Default)]
pub struct ObjectStore {
    /// Objects indexed by their SHA-1 hash.
    objects: RwLock<HashMap<ObjectId, GitObject>>,
}

impl ObjectStore {
    /// Creates a new empty object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object and returns its ID.
    pub fn put(&self, object: GitObject) -> ObjectId {
        let id = object.id;
        self.objects.write().insert(id, object);
        id
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Compresses object data using zlib.
    pub fn compress(object: &GitObject) -> Result<Vec<u8>> {
        let header = format!("{} {}\0", object.object_type.as_str(), object.data.len());
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(header.as_bytes())
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        encoder
            .write_all(&object.data)
            .map_err(|e| StorageError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| StorageError::Compression(e.to_string()))
    }

    /// Decompresses object data from zlib.
    pub fn decompress(compressed: &[u8]) -> Result<GitObject> {
        let mut decoder = ZlibDecoder::new(compressed);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| StorageError::Compression(e.to_string()))?;

        // Parse header: "type size\0data"
        let null_pos = decompressed.iter().position(|&b| b == 0).ok_or_else(|| {
            StorageError::InvalidObject("missing null byte in header".to_string())
        })?;

        let header = String::from_utf8_lossy(&decompressed[..null_pos]);
        let (kind, size) = header
            .split_once(' ')
            .ok_or_else(|| StorageError::InvalidObject(format!("invalid header: {}", header)))?;

        let object_type = ObjectType::parse(kind)?;
        let size: usize = size
            .parse()
            .map_err(|_| StorageError::InvalidObject("invalid size".to_string()))?;

        let data = Bytes::from(decompressed[null_pos + 1..].to_vec());
        if data.len() != size {
            return Err(StorageError::InvalidObject(format!(
                "size mismatch: header says {}, found {}",
                size,
                data.len()
            )));
        }
        Ok(GitObject::new(object_type, data))
    }
}

impl ObjectBackend for ObjectStore {
    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>> {
        Ok(self.objects.read().get(id).cloned())
    }
}

/// Loose object directory of a git repository.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
}

impl LooseObjectStore {
    /// Opens the object directory at `root` (usually `<git-dir>/objects`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the loose file for `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Writes an object, returning its ID.
    ///
    /// The file is written to a temporary name and renamed into place, so
    /// readers never see a partial object.
    pub fn put(&self, object: &GitObject) -> Result<ObjectId> {
        let path = self.object_path(&object.id);
        if path.exists() {
            return Ok(object.id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| {
                StorageError::InvalidObject(format!("bad object path for {}", object.id))
            })?;
        fs::create_dir_all(dir)?;

        let compressed = ObjectStore::compress(object)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&compressed)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(object.id)
    }
}

impl ObjectBackend for LooseObjectStore {
    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>> {
        let compressed = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = ObjectStore::decompress(&compressed)?;
        if object.id != *id {
            return Err(StorageError::Corruption(format!(
                "object file for {} hashes to {}",
                id, object.id
            )));
        }
        Ok(Some(object))
    }
}
