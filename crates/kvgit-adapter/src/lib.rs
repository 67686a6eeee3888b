//! Storage adapter for kvgit.
//!
//! A version-control engine that keeps its repositories elsewhere calls the
//! synchronous traits in [`engine`]; [`StorageAdapter`] implements them for
//! one repository on top of a key-value store and a blob store:
//!
//! - references -> [`kvgit_refs::ReferenceStore`] rows, compare-and-swap
//! - pack catalog -> [`kvgit_pack::PackCatalog`] rows, batched
//! - pack files -> [`kvgit_pack::PackStore`] blobs, streamed
//! - configuration -> [`kvgit_config::ConfigStore`], one text row
//!
//! Every call blocks its thread on a [`BlockingBridge`] while the store work
//! runs on the bridge's I/O runtime.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;

pub use adapter::StorageAdapter;
pub use bridge::BlockingBridge;
pub use config::AdapterConfig;
pub use engine::{ConfigStorage, ObjectDatabase, ReadableChannel, RefDatabase};
pub use error::{AdapterError, AdapterResult};
