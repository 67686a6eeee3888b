//! JSON form of a [`PackDescription`] and pack naming.
//!
//! A catalog row stores its description as a flat JSON object:
//!
//! ```json
//! {"source":"INSERT","modified":1700000000000,"objects":12,"deltas":3,
//!  "ixVersion":2,"packSize":4096,"idxSize":1160}
//! ```
//!
//! There is one `{ext}Size` field per file the pack has. Decoding is
//! permissive: missing or mistyped fields read as zero or unset.

use std::time::{SystemTime, UNIX_EPOCH};

use kvgit_types::{PackDescription, PackExt, PackSource, RepositoryName};
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::{PackError, PackResult};

fn size_field(ext: PackExt) -> String {
    format!("{}Size", ext.extension())
}

/// Encode a description as catalog JSON.
pub fn to_json(desc: &PackDescription) -> String {
    let mut object = Map::new();
    if let Some(source) = desc.source {
        object.insert("source".into(), Value::from(source.name()));
    }
    object.insert("modified".into(), Value::from(desc.last_modified));
    object.insert("objects".into(), Value::from(desc.object_count));
    object.insert("deltas".into(), Value::from(desc.delta_count));
    object.insert("ixVersion".into(), Value::from(desc.index_version));
    for ext in desc.extensions() {
        let size = desc.file_size(ext).unwrap_or(0);
        object.insert(size_field(ext), Value::from(size));
    }
    Value::Object(object).to_string()
}

/// Decode catalog JSON into the description of pack `pack_name`.
///
/// Only text that is not a JSON object at all is rejected.
pub fn from_json(
    repository: RepositoryName,
    pack_name: &str,
    json: &str,
) -> PackResult<PackDescription> {
    let invalid = |reason: String| PackError::InvalidDescription {
        name: pack_name.to_string(),
        reason,
    };
    let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid("not a JSON object".into()))?;
    let number = |field: &str| object.get(field).and_then(Value::as_u64).unwrap_or(0);

    let mut desc = PackDescription::new(repository, pack_name);
    desc.source = object
        .get("source")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<PackSource>().ok());
    desc.last_modified = number("modified");
    desc.object_count = number("objects");
    desc.delta_count = number("deltas");
    desc.index_version = u32::try_from(number("ixVersion")).unwrap_or(0);
    for ext in PackExt::ALL {
        if let Some(size) = object.get(&size_field(ext)).and_then(Value::as_u64) {
            desc.file_sizes.insert(ext, size);
        }
    }
    Ok(desc)
}

/// A fresh pack name: `{prefix}{epoch millis}-{0..100}`.
///
/// Two packs of the same source created in the same millisecond collide
/// with probability 1/100.
pub fn new_pack_name(source: PackSource) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: u32 = rand::thread_rng().gen_range(0..100);
    format!("{}{millis}-{suffix}", source.name_prefix())
}
