//! Pack description types.
//!
//! A pack is an immutable bundle of objects plus auxiliary index files. It is
//! identified by a base name (e.g. `ins-1700000000000-42`); each of its files
//! is `{base_name}.{ext}` and lives in the blob store, while the catalog row
//! describing it lives in the key-value store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::repository::RepositoryName;

/// Why a pack was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackSource {
    Compact,
    Gc,
    Insert,
    Receive,
    UnreachableGarbage,
}

/// Pack-name prefix for each source kind.
const PACK_NAME_PREFIXES: [(PackSource, &str); 5] = [
    (PackSource::Compact, "cmp-"),
    (PackSource::Gc, "gc-"),
    (PackSource::Insert, "ins-"),
    (PackSource::Receive, "rec-"),
    (PackSource::UnreachableGarbage, "ug-"),
];

impl PackSource {
    /// All source kinds.
    pub const ALL: [PackSource; 5] = [
        PackSource::Compact,
        PackSource::Gc,
        PackSource::Insert,
        PackSource::Receive,
        PackSource::UnreachableGarbage,
    ];

    /// Enum name as written into catalog rows.
    pub fn name(&self) -> &'static str {
        match self {
            PackSource::Compact => "COMPACT",
            PackSource::Gc => "GC",
            PackSource::Insert => "INSERT",
            PackSource::Receive => "RECEIVE",
            PackSource::UnreachableGarbage => "UNREACHABLE_GARBAGE",
        }
    }

    /// Prefix used when naming new packs of this kind.
    pub fn name_prefix(&self) -> &'static str {
        PACK_NAME_PREFIXES
            .iter()
            .find(|(source, _)| source == self)
            .map(|(_, prefix)| *prefix)
            .unwrap_or("pack-")
    }
}

impl fmt::Display for PackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackSource {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.name() == s)
            .ok_or_else(|| TypeError::UnknownPackSource(s.to_string()))
    }
}

/// A file belonging to a pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackExt {
    /// The pack data itself.
    Pack,
    /// The object index.
    Index,
    /// The reachability bitmap index.
    BitmapIndex,
}

impl PackExt {
    /// All known extensions.
    pub const ALL: [PackExt; 3] = [PackExt::Pack, PackExt::Index, PackExt::BitmapIndex];

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PackExt::Pack => "pack",
            PackExt::Index => "idx",
            PackExt::BitmapIndex => "bitmap",
        }
    }
}

impl fmt::Display for PackExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for PackExt {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ext| ext.extension() == s)
            .ok_or_else(|| TypeError::UnknownPackExt(s.to_string()))
    }
}

/// Strip the first `.`-delimited suffix from a pack file name.
///
/// `"pack-abc.pack"` becomes `"pack-abc"`. A name without a separator, or
/// whose only separator is the leading character, is returned unchanged.
pub fn base_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(ix) if ix > 0 => &file_name[..ix],
        _ => file_name,
    }
}

/// Catalog entry describing one pack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDescription {
    /// Repository the pack belongs to.
    pub repository: RepositoryName,
    /// Base name shared by all files of the pack.
    pub pack_name: String,
    /// Why the pack was written. Unset when a catalog row omits it.
    pub source: Option<PackSource>,
    /// Size in bytes of each file the pack has.
    pub file_sizes: BTreeMap<PackExt, u64>,
    /// Number of objects in the pack.
    pub object_count: u64,
    /// Number of delta-compressed objects in the pack.
    pub delta_count: u64,
    /// Last modification time, milliseconds since the Unix epoch.
    pub last_modified: u64,
    /// Version of the pack's index file.
    pub index_version: u32,
}

impl PackDescription {
    /// Create an empty description. `pack_name` may carry an extension; only
    /// its base name is kept.
    pub fn new(repository: RepositoryName, pack_name: &str) -> Self {
        Self {
            repository,
            pack_name: base_name(pack_name).to_string(),
            source: None,
            file_sizes: BTreeMap::new(),
            object_count: 0,
            delta_count: 0,
            last_modified: 0,
            index_version: 0,
        }
    }

    /// Set the source kind.
    pub fn with_source(mut self, source: PackSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Record a file of the pack and its size.
    pub fn with_file(mut self, ext: PackExt, size: u64) -> Self {
        self.file_sizes.insert(ext, size);
        self
    }

    /// File name of one of the pack's files, e.g. `ins-1-2.idx`.
    pub fn file_name(&self, ext: PackExt) -> String {
        format!("{}.{}", self.pack_name, ext.extension())
    }

    /// Returns `true` if the pack has a file with this extension.
    pub fn has_file(&self, ext: PackExt) -> bool {
        self.file_sizes.contains_key(&ext)
    }

    /// Size of one of the pack's files, if present.
    pub fn file_size(&self, ext: PackExt) -> Option<u64> {
        self.file_sizes.get(&ext).copied()
    }

    /// Extensions present on this pack, in declaration order.
    pub fn extensions(&self) -> impl Iterator<Item = PackExt> + '_ {
        self.file_sizes.keys().copied()
    }
}
