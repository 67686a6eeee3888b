//! Pack storage for kvgit.
//!
//! A pack has two halves. Its files (`.pack`, `.idx`, `.bitmap`) are blob
//! store objects under `{repository}/{file name}`; its description is one
//! JSON row in a key-value table, keyed by repository and base name.
//!
//! - [`PackCatalog`] -- adds and removes description rows in bounded batches
//!   and lists them back lazily
//! - [`PackStore`] -- opens, writes and deletes the files
//! - [`codec`] -- the JSON row format and [`new_pack_name`]
//!
//! Catalog batches are not atomic with each other. A failure part way
//! through a commit surfaces as [`PackError::PartialBatchFailure`].

pub mod catalog;
pub mod codec;
pub mod error;
pub mod store;

pub use catalog::PackCatalog;
pub use codec::{from_json, new_pack_name, to_json};
pub use error::{PackError, PackResult};
pub use store::PackStore;
