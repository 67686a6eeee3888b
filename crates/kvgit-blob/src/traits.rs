use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::BlobResult;

/// Streamed request body of an upload.
pub type BlobBody = BoxStream<'static, BlobResult<Bytes>>;

/// Versioning mode of a bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Versioning {
    Disabled,
}

/// Result of a ranged GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangedObject {
    /// The bytes of the requested range that exist.
    pub data: Bytes,
    /// Declared total length of the whole object.
    pub total_length: u64,
}

/// A blob store service.
///
/// Implementations must satisfy these rules:
/// - Operations on a missing bucket fail with an error for which
///   [`BlobError::is_bucket_missing`](crate::BlobError::is_bucket_missing)
///   holds.
/// - A ranged GET returns the part of the range that lies inside the object;
///   a range starting at or past the end returns no bytes.
/// - `create_bucket` is idempotent.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create a bucket with the given versioning mode.
    async fn create_bucket(&self, bucket: &str, versioning: Versioning) -> BlobResult<()>;

    /// Read the bytes `range` of an object.
    async fn get_range(&self, bucket: &str, key: &str, range: Range<u64>)
        -> BlobResult<RangedObject>;

    /// Store an object from a streamed body. When `content_length` is given
    /// the body must be exactly that long.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_length: Option<u64>,
        body: BlobBody,
    ) -> BlobResult<()>;

    /// Delete objects by key. Missing keys are ignored.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BlobResult<()>;
}
