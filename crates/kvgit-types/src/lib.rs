//! Foundation types for kvgit.
//!
//! kvgit persists a version-control repository's references, pack files and
//! configuration on a key-value store plus a blob store. This crate holds the
//! plain data types every other kvgit crate shares.
//!
//! # Key Types
//!
//! - [`RepositoryName`] -- Partition key for every per-repository row
//! - [`ObjectId`] -- 20-byte object identifier, rendered as 40 hex characters
//! - [`Reference`] -- Named pointer: direct, symbolic, peeled-non-tag or peeled-tag
//! - [`PackDescription`] -- Catalog entry describing one pack and its files
//! - [`PackSource`] / [`PackExt`] -- Why a pack was written and which files it has

pub mod error;
pub mod object;
pub mod pack;
pub mod reference;
pub mod repository;

pub use error::TypeError;
pub use object::ObjectId;
pub use pack::{base_name, PackDescription, PackExt, PackSource};
pub use reference::{RefStorage, RefTarget, Reference};
pub use repository::RepositoryName;
