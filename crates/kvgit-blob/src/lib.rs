//! Blob store access for kvgit.
//!
//! Pack files live in a blob store as `{repository}/{file name}` objects.
//! The store is an opaque service reached through the [`BlobStore`] trait;
//! this crate adds the pieces the storage engine needs on top of it:
//!
//! - [`BlobStoreClient`] -- ranged GETs, streamed PUTs that create a missing
//!   bucket and retry once, chunked batch deletes
//! - [`RemoteRangeReader`] -- a seek/read channel over one remote object,
//!   one ranged GET per read
//! - [`StreamingPackWriter`] -- sequential writes that can be read back
//!   while a background task uploads the same bytes as one PUT
//!
//! # Backends
//!
//! - [`InMemoryBlobStore`] -- bucket map with an operation log and failure
//!   injection, for tests and embedding

pub mod client;
pub mod error;
pub mod memory;
pub mod range_reader;
pub mod streaming;
pub mod traits;

pub use client::BlobStoreClient;
pub use error::{BlobError, BlobResult};
pub use memory::{BlobOperation, InMemoryBlobStore};
pub use range_reader::RemoteRangeReader;
pub use streaming::{StreamingPackWriter, UploadCompletion, WriterOptions};
pub use traits::{BlobBody, BlobStore, RangedObject, Versioning};

/// Maximum number of keys accepted by one batch delete.
pub const MAX_DELETE_KEYS: usize = 1000;
