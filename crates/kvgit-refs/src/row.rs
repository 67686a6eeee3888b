//! Mapping between [`Reference`] values and reference table rows.
//!
//! | attribute        | value                                            |
//! |------------------|--------------------------------------------------|
//! | `RepositoryName` | partition key                                    |
//! | `Name`           | sort key, full reference name                    |
//! | `Target`         | target reference name, or hex object id          |
//! | `IsSymbolic`     | boolean                                          |
//! | `IsPeeled`       | boolean                                          |
//! | `PeeledTarget`   | hex id the tag peels to; only for peeled tags    |

use kvgit_kv::{Item, Update};
use kvgit_types::{ObjectId, Reference};

use crate::error::{RefError, Result};

pub const REPOSITORY_NAME: &str = "RepositoryName";
pub const NAME: &str = "Name";
pub const TARGET: &str = "Target";
pub const IS_SYMBOLIC: &str = "IsSymbolic";
pub const IS_PEELED: &str = "IsPeeled";
pub const PEELED_TARGET: &str = "PeeledTarget";

/// The upsert that publishes `reference`.
///
/// A reference without a peeled object clears any `PeeledTarget` left behind
/// by an earlier peeled tag at the same name.
pub fn publish_update(reference: &Reference) -> Update {
    let update = Update::new()
        .set(TARGET, reference.target_name())
        .set(IS_SYMBOLIC, reference.is_symbolic())
        .set(IS_PEELED, reference.is_peeled());
    match reference.peeled_object_id() {
        Some(peeled) => update.set(PEELED_TARGET, peeled.to_hex()),
        None => update.remove(PEELED_TARGET),
    }
}

/// Rebuild a stored reference from its row.
pub fn decode(item: &Item) -> Result<Reference> {
    let name = item.get_str(NAME).ok_or_else(|| RefError::CorruptRow {
        name: "<unnamed>".into(),
        reason: format!("missing {NAME}"),
    })?;
    let corrupt = |reason: String| RefError::CorruptRow {
        name: name.to_string(),
        reason,
    };
    let target = item
        .get_str(TARGET)
        .ok_or_else(|| corrupt(format!("missing {TARGET}")))?;
    let object_id = |hex: &str| ObjectId::from_hex(hex).map_err(|e| corrupt(e.to_string()));

    if item.get_bool(IS_SYMBOLIC).unwrap_or(false) {
        return Ok(Reference::symbolic(name, target));
    }
    let id = object_id(target)?;
    if !item.get_bool(IS_PEELED).unwrap_or(false) {
        return Ok(Reference::direct(name, id));
    }
    match item.get_str(PEELED_TARGET) {
        Some(peeled) => Ok(Reference::peeled_tag(name, id, object_id(peeled)?)),
        None => Ok(Reference::peeled_non_tag(name, id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_types::RefStorage;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_raw([byte; 20])
    }

    fn row_for(reference: &Reference) -> Item {
        let mut item = Item::new()
            .with(REPOSITORY_NAME, "demo")
            .with(NAME, reference.name.clone());
        publish_update(reference).apply_to(&mut item);
        item
    }

    #[test]
    fn every_variant_survives_a_row() {
        let refs = [
            Reference::direct("refs/heads/main", id(1)),
            Reference::symbolic("HEAD", "refs/heads/main"),
            Reference::peeled_non_tag("refs/heads/dev", id(2)),
            Reference::peeled_tag("refs/tags/v1", id(3), id(4)),
        ];
        for reference in refs {
            let decoded = decode(&row_for(&reference)).unwrap();
            assert_eq!(decoded, reference);
            assert_eq!(decoded.storage, RefStorage::Stored);
        }
    }

    #[test]
    fn republishing_clears_stale_peeled_target() {
        let mut item = row_for(&Reference::peeled_tag("refs/tags/v1", id(3), id(4)));
        publish_update(&Reference::peeled_non_tag("refs/tags/v1", id(5))).apply_to(&mut item);
        assert!(item.get(PEELED_TARGET).is_none());
        assert_eq!(
            decode(&item).unwrap(),
            Reference::peeled_non_tag("refs/tags/v1", id(5))
        );
    }

    #[test]
    fn bad_object_id_is_corrupt() {
        let item = Item::new()
            .with(NAME, "refs/heads/main")
            .with(TARGET, "not-hex")
            .with(IS_SYMBOLIC, false)
            .with(IS_PEELED, false);
        assert!(matches!(decode(&item), Err(RefError::CorruptRow { .. })));
    }

    #[test]
    fn missing_flags_read_as_unpeeled_direct() {
        let item = Item::new()
            .with(NAME, "refs/heads/main")
            .with(TARGET, id(9).to_hex());
        assert_eq!(
            decode(&item).unwrap(),
            Reference::direct("refs/heads/main", id(9))
        );
    }
}
