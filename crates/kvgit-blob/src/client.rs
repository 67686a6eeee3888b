//! [`BlobStoreClient`]: bucket discipline on top of a [`BlobStore`].

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::error::BlobResult;
use crate::traits::{BlobBody, BlobStore, RangedObject, Versioning};
use crate::MAX_DELETE_KEYS;

/// Client wrapper around a [`BlobStore`].
#[derive(Clone)]
pub struct BlobStoreClient {
    store: Arc<dyn BlobStore>,
}

impl BlobStoreClient {
    /// Wrap a store.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Ranged GET of `[range.start, range.end)`.
    pub async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        range: Range<u64>,
    ) -> BlobResult<RangedObject> {
        self.store.get_range(bucket, key, range).await
    }

    /// Streamed PUT.
    ///
    /// `body` is called once per attempt. If the first attempt reports a
    /// missing bucket, the bucket is created with versioning disabled and
    /// the upload is retried once from a fresh body; a second failure is
    /// returned as is.
    pub async fn put_streamed<F>(
        &self,
        bucket: &str,
        key: &str,
        content_length: Option<u64>,
        body: F,
    ) -> BlobResult<()>
    where
        F: Fn() -> BlobBody + Send + Sync,
    {
        debug!(bucket, key, "uploading object");
        match self.store.put_object(bucket, key, content_length, body()).await {
            Err(e) if e.is_bucket_missing() => {
                debug!(bucket, "bucket does not exist yet, creating it");
                self.store
                    .create_bucket(bucket, Versioning::Disabled)
                    .await?;
                debug!(bucket, key, "created bucket, retrying upload");
                self.store
                    .put_object(bucket, key, content_length, body())
                    .await
            }
            other => other,
        }
    }

    /// Delete objects, in requests of at most [`MAX_DELETE_KEYS`] keys.
    pub async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BlobResult<()> {
        for chunk in keys.chunks(MAX_DELETE_KEYS) {
            debug!(bucket, count = chunk.len(), "deleting objects");
            self.store.delete_objects(bucket, chunk).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BlobStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlobError;
    use crate::memory::{BlobOperation, InMemoryBlobStore};
    use bytes::Bytes;
    use futures::{stream, StreamExt};

    fn body() -> BlobBody {
        stream::iter(vec![Ok(Bytes::from_static(b"pack-bytes"))]).boxed()
    }

    #[tokio::test]
    async fn put_creates_missing_bucket_without_versioning() {
        let store = Arc::new(InMemoryBlobStore::new());
        let client = BlobStoreClient::new(store.clone());

        client
            .put_streamed("packs", "demo/a.pack", Some(10), body)
            .await
            .unwrap();

        assert_eq!(store.bucket_versioning("packs"), Some(Versioning::Disabled));
        assert_eq!(
            store.object("packs", "demo/a.pack"),
            Some(Bytes::from_static(b"pack-bytes"))
        );
        assert_eq!(
            store.operations(),
            vec![
                BlobOperation::PutObject { key: "demo/a.pack".into() },
                BlobOperation::CreateBucket {
                    bucket: "packs".into(),
                    versioning: Versioning::Disabled
                },
                BlobOperation::PutObject { key: "demo/a.pack".into() },
            ]
        );
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.set_unavailable(true);
        let client = BlobStoreClient::new(store.clone());

        let err = client
            .put_streamed("packs", "demo/a.pack", None, body)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Transport(_)));
        assert_eq!(store.operations().len(), 1);
    }

    #[tokio::test]
    async fn delete_is_chunked() {
        let store = Arc::new(InMemoryBlobStore::new());
        let client = BlobStoreClient::new(store.clone());
        let keys: Vec<String> = (0..2500).map(|i| format!("demo/{i}.pack")).collect();
        for key in &keys[..3] {
            store.insert_object("packs", key, &b"x"[..]);
        }

        client.delete_objects("packs", &keys).await.unwrap();

        assert!(store.keys("packs").is_empty());
        assert_eq!(
            store.operations(),
            vec![
                BlobOperation::DeleteObjects { keys: 1000 },
                BlobOperation::DeleteObjects { keys: 1000 },
                BlobOperation::DeleteObjects { keys: 500 },
            ]
        );
    }
}
