//! Repository configuration storage for kvgit.
//!
//! The configuration of a repository is opaque text owned by the consuming
//! engine. It is kept whole in one row of a table keyed by repository name.
//! Writes are last-writer-wins.

pub mod error;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use store::{ConfigStore, MAX_ITEM_SIZE};
