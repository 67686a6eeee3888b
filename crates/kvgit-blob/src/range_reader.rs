//! Seek/read access to one remote object.

use tracing::trace;

use crate::client::BlobStoreClient;
use crate::error::{BlobError, BlobResult};

/// A seekable read channel over a remote object.
///
/// Every [`read`](Self::read) is one ranged GET for
/// `[position, position + buf.len() + read_ahead)`. Only the bytes that fit
/// in the caller's buffer are kept; nothing is cached between reads.
#[derive(Clone, Debug)]
pub struct RemoteRangeReader {
    client: BlobStoreClient,
    bucket: String,
    key: String,
    position: u64,
    read_ahead: u64,
    size: Option<u64>,
    block_size: usize,
    open: bool,
}

impl RemoteRangeReader {
    /// Open a reader positioned at the start of the object. No request is
    /// made until the first read.
    pub fn new(
        client: BlobStoreClient,
        bucket: impl Into<String>,
        key: impl Into<String>,
        block_size: usize,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
            position: 0,
            read_ahead: 0,
            size: None,
            block_size,
            open: true,
        }
    }

    /// Key of the object being read.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the read position.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Extra bytes to request beyond the caller's buffer on every read.
    pub fn set_read_ahead(&mut self, bytes: u64) {
        self.read_ahead = bytes;
    }

    /// Total object length as declared by the last successful read; `None`
    /// before the first one.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Preferred read granularity.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns `true` until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Close the channel. Later reads fail.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Read into `buf` from the current position, advancing it by the number
    /// of bytes copied. Returns 0 at or past the end of the object.
    pub async fn read(&mut self, buf: &mut [u8]) -> BlobResult<usize> {
        if !self.open {
            return Err(BlobError::ChannelClosed);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let end = self
            .position
            .saturating_add(buf.len() as u64)
            .saturating_add(self.read_ahead);
        let object = self
            .client
            .get_range(&self.bucket, &self.key, self.position..end)
            .await?;
        self.size = Some(object.total_length);

        let n = object.data.len().min(buf.len());
        buf[..n].copy_from_slice(&object.data[..n]);
        self.position += n as u64;
        trace!(key = %self.key, position = self.position, bytes = n, "ranged read");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BlobOperation, InMemoryBlobStore};
    use std::sync::Arc;

    fn setup(data: &'static [u8]) -> (Arc<InMemoryBlobStore>, RemoteRangeReader) {
        let store = Arc::new(InMemoryBlobStore::new());
        store.insert_object("packs", "demo/p.pack", data);
        let client = BlobStoreClient::new(store.clone());
        let reader = RemoteRangeReader::new(client, "packs", "demo/p.pack", 4096);
        (store, reader)
    }

    #[tokio::test]
    async fn size_is_unknown_until_first_read() {
        let (_store, mut reader) = setup(b"0123456789");
        assert_eq!(reader.size(), None);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(reader.size(), Some(10));
        assert_eq!(reader.position(), 4);
    }

    #[tokio::test]
    async fn seek_then_read() {
        let (_store, mut reader) = setup(b"0123456789");
        reader.set_position(7);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"789");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_ahead_widens_the_request_but_not_the_copy() {
        let (store, mut reader) = setup(b"0123456789");
        reader.set_read_ahead(3);
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf, b"01");
        assert_eq!(
            store.operations(),
            vec![BlobOperation::GetRange {
                key: "demo/p.pack".into(),
                range: 0..5
            }]
        );
    }

    #[tokio::test]
    async fn every_read_is_a_round_trip() {
        let (store, mut reader) = setup(b"0123456789");
        let mut buf = [0u8; 2];
        reader.read(&mut buf).await.unwrap();
        reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf, b"23");
        assert_eq!(store.operations().len(), 2);
    }

    #[tokio::test]
    async fn closed_reader_rejects_reads() {
        let (_store, mut reader) = setup(b"0123");
        reader.close();
        assert!(!reader.is_open());
        let mut buf = [0u8; 2];
        assert_eq!(
            reader.read(&mut buf).await.unwrap_err(),
            BlobError::ChannelClosed
        );
    }

    #[tokio::test]
    async fn missing_object_is_an_error() {
        let (_store, reader) = setup(b"0123");
        let mut reader = RemoteRangeReader::new(reader.client.clone(), "packs", "nope", 16);
        let mut buf = [0u8; 2];
        assert!(matches!(
            reader.read(&mut buf).await.unwrap_err(),
            BlobError::NoSuchKey { .. }
        ));
    }
}
