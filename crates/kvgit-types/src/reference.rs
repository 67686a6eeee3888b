//! Reference types.
//!
//! A reference is a named pointer either at an object id or at another
//! reference. Direct references may additionally carry their peeled state:
//! a peeled non-tag is known not to be an annotated tag, a peeled tag caches
//! the object the tag ultimately resolves to.

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;

/// Where the engine believes a reference currently lives.
///
/// Only [`RefStorage::New`] matters to kvgit: an expected reference marked
/// `New` means "the caller believes this name does not exist yet", so no
/// precondition is placed on the stored target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefStorage {
    /// Not stored anywhere yet.
    New,
    /// Read back from (or published to) the reference table.
    Stored,
}

/// What a reference points at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefTarget {
    /// Points at an object; peeled state unknown.
    Direct(ObjectId),
    /// Points at another reference by name.
    Symbolic(String),
    /// Points at an object that is known not to be an annotated tag.
    PeeledNonTag(ObjectId),
    /// Points at an annotated tag, together with the object the tag peels to.
    PeeledTag {
        /// The tag object itself.
        object: ObjectId,
        /// The object the tag ultimately resolves to.
        peeled: ObjectId,
    },
}

/// A named reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Full name, e.g. `refs/heads/main` or `HEAD`.
    pub name: String,
    /// Target of the reference.
    pub target: RefTarget,
    /// Storage state as seen by the engine.
    pub storage: RefStorage,
}

impl Reference {
    /// A stored, unpeeled reference to an object.
    pub fn direct(name: impl Into<String>, id: ObjectId) -> Self {
        Self::stored(name, RefTarget::Direct(id))
    }

    /// A stored symbolic reference to another reference name.
    pub fn symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::stored(name, RefTarget::Symbolic(target.into()))
    }

    /// A stored reference known not to point at an annotated tag.
    pub fn peeled_non_tag(name: impl Into<String>, id: ObjectId) -> Self {
        Self::stored(name, RefTarget::PeeledNonTag(id))
    }

    /// A stored reference to an annotated tag and its peeled object.
    pub fn peeled_tag(name: impl Into<String>, object: ObjectId, peeled: ObjectId) -> Self {
        Self::stored(name, RefTarget::PeeledTag { object, peeled })
    }

    /// Marker for a reference the caller expects not to exist yet.
    pub fn new_marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: RefTarget::Direct(ObjectId::zero()),
            storage: RefStorage::New,
        }
    }

    fn stored(name: impl Into<String>, target: RefTarget) -> Self {
        Self {
            name: name.into(),
            target,
            storage: RefStorage::Stored,
        }
    }

    /// Returns `true` if this is a symbolic reference.
    pub fn is_symbolic(&self) -> bool {
        matches!(self.target, RefTarget::Symbolic(_))
    }

    /// Returns `true` if the peeled state of this reference is known.
    pub fn is_peeled(&self) -> bool {
        matches!(
            self.target,
            RefTarget::PeeledNonTag(_) | RefTarget::PeeledTag { .. }
        )
    }

    /// Returns `true` if the caller marked this reference as not yet existing.
    pub fn is_new(&self) -> bool {
        self.storage == RefStorage::New
    }

    /// The object id this reference points at, if it is not symbolic.
    pub fn object_id(&self) -> Option<ObjectId> {
        match &self.target {
            RefTarget::Direct(id) | RefTarget::PeeledNonTag(id) => Some(*id),
            RefTarget::PeeledTag { object, .. } => Some(*object),
            RefTarget::Symbolic(_) => None,
        }
    }

    /// The peeled object id, present only for peeled tags.
    pub fn peeled_object_id(&self) -> Option<ObjectId> {
        match &self.target {
            RefTarget::PeeledTag { peeled, .. } => Some(*peeled),
            _ => None,
        }
    }

    /// The target as stored in the reference table: the target reference
    /// name for symbolic references, the hex object id otherwise.
    pub fn target_name(&self) -> String {
        match &self.target {
            RefTarget::Symbolic(name) => name.clone(),
            RefTarget::Direct(id) | RefTarget::PeeledNonTag(id) => id.to_hex(),
            RefTarget::PeeledTag { object, .. } => object.to_hex(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_raw([byte; 20])
    }

    #[test]
    fn symbolic_target_name_is_ref_name() {
        let head = Reference::symbolic("HEAD", "refs/heads/main");
        assert!(head.is_symbolic());
        assert!(!head.is_peeled());
        assert_eq!(head.target_name(), "refs/heads/main");
        assert_eq!(head.object_id(), None);
    }

    #[test]
    fn peeled_tag_exposes_both_ids() {
        let tag = Reference::peeled_tag("refs/tags/v1", id(1), id(2));
        assert!(tag.is_peeled());
        assert_eq!(tag.object_id(), Some(id(1)));
        assert_eq!(tag.peeled_object_id(), Some(id(2)));
        assert_eq!(tag.target_name(), id(1).to_hex());
    }

    #[test]
    fn peeled_non_tag_has_no_peeled_id() {
        let r = Reference::peeled_non_tag("refs/heads/main", id(3));
        assert!(r.is_peeled());
        assert_eq!(r.peeled_object_id(), None);
    }

    #[test]
    fn new_marker_is_new() {
        let r = Reference::new_marker("refs/heads/topic");
        assert!(r.is_new());
        assert!(!Reference::direct("refs/heads/topic", id(4)).is_new());
    }
}
