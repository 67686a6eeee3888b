//! Key-value store access for kvgit.
//!
//! kvgit keeps references, pack descriptions and configuration as rows in a
//! key-value store whose items are addressed by a partition key and an
//! optional sort key. The store itself is an opaque service reached through
//! the [`KeyValueStore`] trait; [`KeyValueStoreClient`] layers the behavior
//! every kvgit table needs on top of it.
//!
//! # Design Rules
//!
//! 1. Tables are created lazily: a mutating call that hits a missing table
//!    creates it from the caller's [`TableSchema`] and retries exactly once.
//! 2. A failed precondition is reported as `Ok(false)`, never as an error.
//!    Transport failures stay errors, so callers can tell "lost the race"
//!    from "store unreachable".
//! 3. Reads of a missing table behave like reads of an empty table.
//! 4. Batches carry at most [`MAX_BATCH_OPERATIONS`] puts and deletes combined.
//!
//! # Backends
//!
//! - [`InMemoryKeyValueStore`] -- ordered in-memory tables with an operation
//!   log and failure injection, for tests and embedding

pub mod client;
pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use client::KeyValueStoreClient;
pub use error::{KvError, KvResult};
pub use memory::{InMemoryKeyValueStore, KvOperation};
pub use model::{
    AttributeValue, Condition, Item, ItemKey, QueryPage, TableSchema, Throughput, Update,
    UpdateAction, WriteRequest,
};
pub use traits::KeyValueStore;

/// Maximum number of puts and deletes accepted by one batch write.
pub const MAX_BATCH_OPERATIONS: usize = 25;
