//! Streaming pack upload with readback.
//!
//! A [`StreamingPackWriter`] owns one append-only buffer of immutable chunks.
//! The caller appends to it from a synchronous thread while a background task
//! uploads the same chunks as a single streamed PUT. Chunks are reference
//! counted, so the upload shares the buffer instead of copying it.
//!
//! The writer blocks once more than the high-water mark of bytes is waiting
//! for the uploader. The buffer itself is retained until the writer is
//! dropped, so any written range can be read back and a retried upload can
//! start again from byte 0.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::BlobStoreClient;
use crate::error::{BlobError, BlobResult};
use crate::traits::BlobBody;

/// Tuning for a [`StreamingPackWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterOptions {
    /// Preferred write granularity reported to callers.
    pub block_size: usize,
    /// Bytes the writer may run ahead of the uploader before blocking.
    pub high_water_mark: u64,
    /// Declared length of the upload, when known up front.
    pub content_length: Option<u64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            block_size: 128 * 1024,
            high_water_mark: 1024 * 1024,
            content_length: None,
        }
    }
}

#[derive(Default)]
struct BufferState {
    chunks: Vec<Bytes>,
    /// Offset of the first byte of each chunk.
    starts: Vec<u64>,
    len: u64,
    /// Highest offset handed to the uploader by any attempt.
    uploaded: u64,
    closed: bool,
    aborted: bool,
    upload_finished: bool,
}

enum Next {
    Chunk(Bytes),
    Wait,
    End,
    Aborted,
}

struct Shared {
    state: Mutex<BufferState>,
    drained: Condvar,
    appended: Notify,
    high_water_mark: u64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_chunk(&self, index: usize) -> Next {
        let mut state = self.lock();
        if state.aborted {
            return Next::Aborted;
        }
        if let Some(chunk) = state.chunks.get(index).cloned() {
            let end = state.starts[index] + chunk.len() as u64;
            if end > state.uploaded {
                state.uploaded = end;
                self.drained.notify_all();
            }
            return Next::Chunk(chunk);
        }
        if state.closed {
            Next::End
        } else {
            Next::Wait
        }
    }

    fn finish_upload(&self) {
        self.lock().upload_finished = true;
        self.drained.notify_all();
    }
}

/// A body stream that walks the buffer from its first chunk.
fn body_stream(shared: Arc<Shared>) -> BlobBody {
    stream::unfold(Some((shared, 0usize)), |state| async move {
        let (shared, index) = match state {
            Some(state) => state,
            None => return None,
        };
        loop {
            match shared.next_chunk(index) {
                Next::Chunk(bytes) => return Some((Ok(bytes), Some((shared, index + 1)))),
                Next::End => return None,
                Next::Aborted => return Some((Err(BlobError::UploadAborted), None)),
                Next::Wait => shared.appended.notified().await,
            }
        }
    })
    .boxed()
}

/// Completion signal of a background upload.
#[derive(Debug)]
pub struct UploadCompletion {
    handle: JoinHandle<BlobResult<()>>,
}

impl UploadCompletion {
    /// Wait for the upload to finish and return its outcome.
    pub async fn wait(self) -> BlobResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(BlobError::UploadTaskFailed(e.to_string())),
        }
    }
}

/// Sequential writer whose bytes are uploaded in the background and can be
/// read back while writing.
pub struct StreamingPackWriter {
    shared: Arc<Shared>,
    key: String,
    block_size: usize,
    completion: Option<UploadCompletion>,
    closed: bool,
}

impl StreamingPackWriter {
    /// Spawn the uploader for `bucket/key` on `runtime` and return the writer.
    ///
    /// The PUT starts right away and consumes bytes as they are written.
    pub fn start(
        client: BlobStoreClient,
        runtime: &Handle,
        bucket: impl Into<String>,
        key: impl Into<String>,
        options: WriterOptions,
    ) -> Self {
        let bucket = bucket.into();
        let key = key.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(BufferState::default()),
            drained: Condvar::new(),
            appended: Notify::new(),
            high_water_mark: options.high_water_mark.max(1),
        });

        let task_shared = Arc::clone(&shared);
        let task_key = key.clone();
        let content_length = options.content_length;
        let handle = runtime.spawn(async move {
            let body_shared = Arc::clone(&task_shared);
            let result = client
                .put_streamed(&bucket, &task_key, content_length, move || {
                    body_stream(Arc::clone(&body_shared))
                })
                .await;
            task_shared.finish_upload();
            match &result {
                Ok(()) => debug!(key = %task_key, "pack upload finished"),
                Err(e) => warn!(key = %task_key, error = %e, "pack upload failed"),
            }
            result
        });

        Self {
            shared,
            key,
            block_size: options.block_size,
            completion: Some(UploadCompletion { handle }),
            closed: false,
        }
    }

    /// Key the bytes are uploaded to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Preferred write granularity.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> u64 {
        self.shared.lock().len
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append bytes, blocking while the uploader is more than the high-water
    /// mark behind. Once the upload has ended, appends no longer block.
    pub fn append(&mut self, data: &[u8]) -> BlobResult<()> {
        if self.closed {
            return Err(BlobError::ChannelClosed);
        }
        if data.is_empty() {
            return Ok(());
        }

        let mut state = self.shared.lock();
        while state.len - state.uploaded >= self.shared.high_water_mark
            && !state.upload_finished
            && !state.aborted
        {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let start = state.len;
        state.starts.push(start);
        state.chunks.push(Bytes::copy_from_slice(data));
        state.len += data.len() as u64;
        drop(state);

        self.shared.appended.notify_one();
        Ok(())
    }

    /// Copy bytes starting at `position` into `buf`.
    ///
    /// Returns the number of bytes copied, which is
    /// `min(buf.len(), len - position)`; positions at or past the written
    /// length return 0. Never blocks on the uploader.
    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> usize {
        let state = self.shared.lock();
        if position >= state.len || buf.is_empty() {
            return 0;
        }

        // starts[0] == 0 and chunks are never empty, so this is at least 1.
        let mut index = state.starts.partition_point(|&s| s <= position) - 1;
        let mut offset = (position - state.starts[index]) as usize;
        let mut copied = 0;
        while copied < buf.len() && index < state.chunks.len() {
            let chunk = &state.chunks[index];
            let n = (chunk.len() - offset).min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&chunk[offset..offset + n]);
            copied += n;
            offset = 0;
            index += 1;
        }
        copied
    }

    /// End the upload body. Does not wait for the upload; see
    /// [`completion`](Self::completion). Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.lock().closed = true;
        self.shared.appended.notify_one();
        debug!(key = %self.key, "pack writer closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take the upload's completion signal. Returns `None` after the first call.
    pub fn completion(&mut self) -> Option<UploadCompletion> {
        self.completion.take()
    }
}

impl io::Write for StreamingPackWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for StreamingPackWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.shared.lock().aborted = true;
        self.shared.appended.notify_one();
        self.shared.drained.notify_all();
    }
}

impl std::fmt::Debug for StreamingPackWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingPackWriter")
            .field("key", &self.key)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
