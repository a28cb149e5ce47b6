//! Git reference model.

use crate::{ObjectId, Result, StorageError};
use std::fmt;

/// Namespace every enumerated reference lives under.
pub const REFS_PREFIX: &str = "refs/";

/// Namespace of tag references.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Prefix of a symbolic ref's loose file content.
const SYMREF_PREFIX: &str = "ref: ";

/// The value of a git reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference (e.g., refs/remotes/origin/HEAD -> refs/remotes/origin/main).
    Symbolic(String),
}

impl Reference {
    /// Returns the object ID if this is a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }

    /// Returns `true` for symbolic references.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }

    /// Parses the content of a loose ref file.
    ///
    /// Accepts `<40-hex>` or `ref: <name>`, with optional trailing whitespace.
    pub fn parse_loose(content: &str) -> Result<Self> {
        let content = content.trim_end();
        if let Some(target) = content.strip_prefix(SYMREF_PREFIX) {
            let target = target.trim();
            if target.is_empty() {
                return Err(StorageError::InvalidRef("empty symbolic ref".to_string()));
            }
            return Ok(Self::Symbolic(target.to_string()));
        }
        ObjectId::from_hex(content)
            .map(Self::Direct)
            .map_err(|_| StorageError::InvalidRef(format!("invalid ref content: {content:?}")))
    }

    /// Formats the value as loose ref file content.
    pub fn to_loose(&self) -> String {
        match self {
            Self::Direct(id) => format!("{id}\n"),
            Self::Symbolic(target) => format!("{SYMREF_PREFIX}{target}\n"),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(id) => write!(f, "{id}"),
            Self::Symbolic(target) => write!(f, "{SYMREF_PREFIX}{target}"),
        }
    }
}

/// One reference as seen by an enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Full name, e.g. `refs/heads/main`.
    pub name: String,
    /// Current value.
    pub value: Reference,
    /// The ref exists only in the packed-refs snapshot, with no loose file.
    pub packed: bool,
}

impl RefEntry {
    /// Creates an entry backed by a loose file.
    pub fn loose(name: impl Into<String>, value: Reference) -> Self {
        Self {
            name: name.into(),
            value,
            packed: false,
        }
    }

    /// Creates an entry that lives only in the packed-refs snapshot.
    pub fn packed(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            name: name.into(),
            value: Reference::Direct(target),
            packed: true,
        }
    }

    /// Target hash, `None` for symbolic refs.
    pub fn target(&self) -> Option<ObjectId> {
        self.value.as_direct()
    }

    /// Returns `true` for symbolic refs.
    pub fn is_symbolic(&self) -> bool {
        self.value.is_symbolic()
    }

    /// Returns `true` for refs under `refs/tags/`.
    pub fn is_tag(&self) -> bool {
        self.name.starts_with(TAGS_PREFIX)
    }
}

/// Checks that `name` is a well-formed full ref name.
///
/// Names must start with `refs/`, have no empty, `.` or `..` components, no
/// component ending in `.lock`, and no whitespace, control characters or any
/// of `~^:?*[\`.
pub fn validate_ref_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(StorageError::InvalidRef(format!("{name}: {reason}")));

    if !name.starts_with(REFS_PREFIX) {
        return invalid("must start with refs/");
    }
    if name.contains("@{") {
        return invalid("contains @{");
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
    {
        return invalid("contains a forbidden character");
    }
    for component in name.split('/') {
        if component.is_empty() {
            return invalid("empty path component");
        }
        if component.starts_with('.') {
            return invalid("path component starts with '.'");
        }
        if component.ends_with(crate::lockfile::LOCK_SUFFIX) {
            return invalid("path component ends with .lock");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 20])
    }

    #[test]
    fn test_parse_loose_direct() {
        let content = format!("{}\n", id(1));
        assert_eq!(Reference::parse_loose(&content).unwrap(), Reference::Direct(id(1)));
    }

    #[test]
    fn test_parse_loose_symbolic() {
        let parsed = Reference::parse_loose("ref: refs/heads/main\n").unwrap();
        assert_eq!(parsed, Reference::Symbolic("refs/heads/main".to_string()));
        assert!(parsed.is_symbolic());
        assert!(parsed.as_direct().is_none());
    }

    #[test]
    fn test_parse_loose_invalid() {
        assert!(Reference::parse_loose("").is_err());
        assert!(Reference::parse_loose("ref: \n").is_err());
        assert!(Reference::parse_loose("not a hash\n").is_err());
        assert!(matches!(
            Reference::parse_loose(&"a".repeat(39)),
            Err(StorageError::InvalidRef(_))
        ));
    }

    #[test]
    fn test_loose_roundtrip() {
        for value in [
            Reference::Direct(id(7)),
            Reference::Symbolic("refs/heads/feature".to_string()),
        ] {
            assert_eq!(Reference::parse_loose(&value.to_loose()).unwrap(), value);
        }
    }

    #[test]
    fn test_ref_entry_flags() {
        let tag = RefEntry::packed("refs/tags/v1", id(1));
        assert!(tag.is_tag());
        assert!(tag.packed);
        assert_eq!(tag.target(), Some(id(1)));

        let head = RefEntry::loose(
            "refs/remotes/origin/HEAD",
            Reference::Symbolic("refs/remotes/origin/main".to_string()),
        );
        assert!(head.is_symbolic());
        assert!(!head.is_tag());
        assert!(head.target().is_none());
    }

    #[test]
    fn test_tag_prefix_is_exact() {
        let entry = RefEntry::loose("refs/tagsx/v1", Reference::Direct(id(1)));
        assert!(!entry.is_tag());
    }

    #[test]
    fn test_validate_ref_name() {
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("refs/tags/v1.0").is_ok());
        assert!(validate_ref_name("refs/heads/feature/auth").is_ok());

        assert!(validate_ref_name("HEAD").is_err());
        assert!(validate_ref_name("refs/heads/").is_err());
        assert!(validate_ref_name("refs//main").is_err());
        assert!(validate_ref_name("refs/heads/../main").is_err());
        assert!(validate_ref_name("refs/heads/.hidden").is_err());
        assert!(validate_ref_name("refs/heads/main.lock").is_err());
        assert!(validate_ref_name("refs/heads/has space").is_err());
        assert!(validate_ref_name("refs/heads/a~1").is_err());
        assert!(validate_ref_name("refs/heads/a@{1}").is_err());
    }
}
