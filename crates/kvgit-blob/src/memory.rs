//! In-memory blob store for testing and embedding.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobBody, BlobStore, RangedObject, Versioning};
use crate::MAX_DELETE_KEYS;

/// A call recorded by [`InMemoryBlobStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobOperation {
    CreateBucket { bucket: String, versioning: Versioning },
    GetRange { key: String, range: Range<u64> },
    PutObject { key: String },
    DeleteObjects { keys: usize },
}

struct Bucket {
    versioning: Versioning,
    objects: HashMap<String, Bytes>,
}

/// An in-memory implementation of [`BlobStore`].
///
/// Every call is recorded; [`InMemoryBlobStore::set_unavailable`] makes all
/// calls fail with a transport error.
pub struct InMemoryBlobStore {
    buckets: RwLock<HashMap<String, Bucket>>,
    log: Mutex<Vec<BlobOperation>>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    /// Create a store with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every call fails with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every call received so far, in order.
    pub fn operations(&self) -> Vec<BlobOperation> {
        self.log.lock().expect("lock poisoned").clone()
    }

    /// Versioning mode of a bucket, if it exists.
    pub fn bucket_versioning(&self, bucket: &str) -> Option<Versioning> {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(bucket)
            .map(|b| b.versioning)
    }

    /// Full contents of an object, if it exists.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(bucket)
            .and_then(|b| b.objects.get(key).cloned())
    }

    /// Store an object directly, creating the bucket if needed.
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let mut buckets = self.buckets.write().expect("lock poisoned");
        buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Bucket {
                versioning: Versioning::Disabled,
                objects: HashMap::new(),
            })
            .objects
            .insert(key.to_string(), data.into());
    }

    /// Keys of all objects in a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().expect("lock poisoned");
        let mut keys: Vec<String> = buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn record(&self, op: BlobOperation) -> BlobResult<()> {
        self.log.lock().expect("lock poisoned").push(op);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Transport("store unavailable".into()));
        }
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets
            .read()
            .expect("lock poisoned")
            .contains_key(bucket)
    }

    fn missing(bucket: &str) -> BlobError {
        BlobError::BucketNotFound {
            bucket: bucket.to_string(),
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.buckets.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryBlobStore")
            .field("bucket_count", &count)
            .finish()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_bucket(&self, bucket: &str, versioning: Versioning) -> BlobResult<()> {
        self.record(BlobOperation::CreateBucket {
            bucket: bucket.to_string(),
            versioning,
        })?;
        let mut buckets = self.buckets.write().expect("lock poisoned");
        buckets.entry(bucket.to_string()).or_insert_with(|| Bucket {
            versioning,
            objects: HashMap::new(),
        });
        Ok(())
    }

    async fn get_range(
        &self,
        bucket: &str,
        key: &str,
        range: Range<u64>,
    ) -> BlobResult<RangedObject> {
        self.record(BlobOperation::GetRange {
            key: key.to_string(),
            range: range.clone(),
        })?;
        let buckets = self.buckets.read().expect("lock poisoned");
        let b = buckets.get(bucket).ok_or_else(|| Self::missing(bucket))?;
        let object = b.objects.get(key).ok_or_else(|| BlobError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;

        let total_length = object.len() as u64;
        let start = range.start.min(total_length);
        let end = range.end.min(total_length).max(start);
        Ok(RangedObject {
            data: object.slice(start as usize..end as usize),
            total_length,
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_length: Option<u64>,
        mut body: BlobBody,
    ) -> BlobResult<()> {
        self.record(BlobOperation::PutObject {
            key: key.to_string(),
        })?;
        if !self.bucket_exists(bucket) {
            return Err(Self::missing(bucket));
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        if let Some(declared) = content_length {
            if declared != data.len() as u64 {
                return Err(BlobError::ContentLengthMismatch {
                    declared,
                    actual: data.len() as u64,
                });
            }
        }

        let mut buckets = self.buckets.write().expect("lock poisoned");
        let b = buckets.get_mut(bucket).ok_or_else(|| Self::missing(bucket))?;
        b.objects.insert(key.to_string(), data.freeze());
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BlobResult<()> {
        self.record(BlobOperation::DeleteObjects { keys: keys.len() })?;
        if keys.len() > MAX_DELETE_KEYS {
            return Err(BlobError::Service {
                code: "MalformedXML".into(),
                message: format!("{} keys exceed the limit of {MAX_DELETE_KEYS}", keys.len()),
            });
        }
        let mut buckets = self.buckets.write().expect("lock poisoned");
        let b = buckets.get_mut(bucket).ok_or_else(|| Self::missing(bucket))?;
        for key in keys {
            b.objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(parts: &[&'static [u8]]) -> BlobBody {
        let chunks: Vec<BlobResult<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn put_into_missing_bucket_fails() {
        let store = InMemoryBlobStore::new();
        let err = store
            .put_object("packs", "demo/a.pack", None, body(&[b"abc"]))
            .await
            .unwrap_err();
        assert!(err.is_bucket_missing());
    }

    #[tokio::test]
    async fn put_then_ranged_get() {
        let store = InMemoryBlobStore::new();
        store
            .create_bucket("packs", Versioning::Disabled)
            .await
            .unwrap();
        store
            .put_object("packs", "k", Some(6), body(&[b"abc", b"def"]))
            .await
            .unwrap();

        let got = store.get_range("packs", "k", 1..4).await.unwrap();
        assert_eq!(&got.data[..], b"bcd");
        assert_eq!(got.total_length, 6);

        let tail = store.get_range("packs", "k", 4..100).await.unwrap();
        assert_eq!(&tail.data[..], b"ef");

        let past = store.get_range("packs", "k", 10..20).await.unwrap();
        assert!(past.data.is_empty());
        assert_eq!(past.total_length, 6);
    }

    #[tokio::test]
    async fn content_length_is_enforced() {
        let store = InMemoryBlobStore::new();
        store
            .create_bucket("packs", Versioning::Disabled)
            .await
            .unwrap();
        let err = store
            .put_object("packs", "k", Some(10), body(&[b"abc"]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BlobError::ContentLengthMismatch {
                declared: 10,
                actual: 3
            }
        );
        assert!(store.object("packs", "k").is_none());
    }

    #[tokio::test]
    async fn delete_ignores_missing_keys() {
        let store = InMemoryBlobStore::new();
        store.insert_object("packs", "a", &b"1"[..]);
        store.insert_object("packs", "b", &b"2"[..]);
        store
            .delete_objects("packs", &["a".to_string(), "zzz".to_string()])
            .await
            .unwrap();
        assert_eq!(store.keys("packs"), vec!["b".to_string()]);
    }
}
