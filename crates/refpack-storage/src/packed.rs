//! The `packed-refs` snapshot format.
//!
//! ```text
//! # pack-refs with: peeled 
//! <40-hex> refs/heads/main
//! <40-hex> refs/tags/v1
//! ^<40-hex>
//! ```
//!
//! A `^` line carries the peeled value of the annotated tag on the line
//! directly above it.

use crate::refs::validate_ref_name;
use crate::{ObjectId, Result, StorageError};
use std::collections::HashSet;

/// Header line announcing the traits of the file, including its newline.
pub const PACKED_REFS_HEADER: &str = "# pack-refs with: peeled \n";

/// Prefix of the traits header line.
const TRAITS_PREFIX: &str = "# pack-refs with:";

/// Trait announcing that tag refs carry their peeled values.
pub const TRAIT_PEELED: &str = "peeled";

/// One reference line from a packed-refs file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRef {
    /// Full ref name.
    pub name: String,
    /// Object the ref points at.
    pub target: ObjectId,
    /// Peeled value when the target is an annotated tag.
    pub peeled: Option<ObjectId>,
}

/// Parsed content of a packed-refs file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedRefs {
    /// Traits declared in the header, empty when there is no header.
    pub traits: Vec<String>,
    /// References in file order.
    pub refs: Vec<PackedRef>,
}

impl PackedRefs {
    /// Parses packed-refs content.
    ///
    /// # Errors
    ///
    /// [`StorageError::Corruption`] for malformed lines, invalid ref names,
    /// duplicate names, and `^` lines not directly below a reference line.
    pub fn parse(content: &str) -> Result<Self> {
        let mut parsed = Self::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut can_peel = false;

        for (index, line) in content.lines().enumerate() {
            let lineno = index + 1;
            let corrupt = |what: &str| {
                StorageError::Corruption(format!("packed-refs line {lineno}: {what}: {line:?}"))
            };

            if let Some(traits) = line.strip_prefix(TRAITS_PREFIX) {
                if index == 0 {
                    parsed.traits = traits.split_whitespace().map(str::to_string).collect();
                }
                can_peel = false;
                continue;
            }
            if line.starts_with('#') || line.trim().is_empty() {
                can_peel = false;
                continue;
            }

            if let Some(hex) = line.strip_prefix('^') {
                let peeled = ObjectId::from_hex(hex).map_err(|_| corrupt("bad peeled id"))?;
                let last = parsed
                    .refs
                    .last_mut()
                    .filter(|_| can_peel)
                    .ok_or_else(|| corrupt("peeled line without a reference"))?;
                last.peeled = Some(peeled);
                can_peel = false;
                continue;
            }

            let (hex, name) = line
                .split_once(' ')
                .ok_or_else(|| corrupt("missing ref name"))?;
            let target = ObjectId::from_hex(hex).map_err(|_| corrupt("bad object id"))?;
            validate_ref_name(name).map_err(|_| corrupt("bad ref name"))?;
            if !seen.insert(name) {
                return Err(corrupt("duplicate ref"));
            }
            parsed.refs.push(PackedRef {
                name: name.to_string(),
                target,
                peeled: None,
            });
            can_peel = true;
        }

        Ok(parsed)
    }

    /// Looks up a reference by full name.
    pub fn get(&self, name: &str) -> Option<&PackedRef> {
        self.refs.iter().find(|r| r.name == name)
    }

    /// Returns `true` if the header declares the `peeled` trait.
    pub fn is_peeled(&self) -> bool {
        self.traits.iter().any(|t| t == TRAIT_PEELED)
    }
}

/// Formats a reference line, including its newline.
pub fn format_ref_line(name: &str, target: &ObjectId) -> String {
    format!("{target} {name}\n")
}

/// Formats a peeled line, including its newline.
pub fn format_peeled_line(peeled: &ObjectId) -> String {
    format!("^{peeled}\n")
}
