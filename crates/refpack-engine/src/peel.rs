//! Peeling annotated tags down to the object they finally name.

use refpack_storage::{ObjectBackend, ObjectId, ObjectType, Result, StorageError};

/// Deepest tag-of-tag chain that is followed before giving up.
pub const MAX_PEEL_DEPTH: usize = 64;

/// Resolves tag chains against an object store. Never writes to it.
pub struct Peeler<'a, O: ?Sized> {
    objects: &'a O,
}

impl<'a, O: ObjectBackend + ?Sized> Peeler<'a, O> {
    /// Creates a peeler reading from `objects`.
    pub fn new(objects: &'a O) -> Self {
        Self { objects }
    }

    /// Returns the first non-tag object behind the tag at `id`.
    ///
    /// `Ok(None)` means `id` is not a tag. A missing or corrupt object
    /// anywhere in the chain is an error.
    pub fn peel(&self, id: &ObjectId) -> Result<Option<ObjectId>> {
        let mut object = self.load(id)?;
        if object.object_type != ObjectType::Tag {
            return Ok(None);
        }

        for _ in 0..MAX_PEEL_DEPTH {
            let target = object.tag_target()?;
            object = self.load(&target)?;
            if object.object_type != ObjectType::Tag {
                return Ok(Some(target));
            }
        }
        Err(StorageError::Corruption(format!(
            "tag chain starting at {id} is deeper than {MAX_PEEL_DEPTH}"
        )))
    }

    fn load(&self, id: &ObjectId) -> Result<refpack_storage::GitObject> {
        self.objects
            .read_object(id)?
            .ok_or_else(|| StorageError::ObjectNotFound(id.to_hex()))
    }
}
