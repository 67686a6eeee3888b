use thiserror::Error;

/// Service error codes that mean the bucket is missing or unusable.
const BUCKET_MISSING_CODES: [&str; 3] = ["NoSuchBucket", "InvalidBucketName", "InvalidBucketState"];

/// Errors from blob store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    /// The bucket does not exist.
    #[error("bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    /// The object does not exist.
    #[error("no such key {key} in bucket {bucket}")]
    NoSuchKey { bucket: String, key: String },

    /// Error reported by the service, identified by its error code.
    #[error("blob service error {code}: {message}")]
    Service { code: String, message: String },

    /// An upload's body did not match its declared content length.
    #[error("content length mismatch: declared {declared}, received {actual}")]
    ContentLengthMismatch { declared: u64, actual: u64 },

    /// The writer feeding an upload went away without closing it.
    #[error("upload aborted before the writer was closed")]
    UploadAborted,

    /// The background upload task died.
    #[error("upload task failed: {0}")]
    UploadTaskFailed(String),

    /// The channel was closed.
    #[error("channel is closed")]
    ChannelClosed,

    /// Network failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BlobError {
    /// Returns `true` if the error means the bucket has to be created first.
    pub fn is_bucket_missing(&self) -> bool {
        match self {
            BlobError::BucketNotFound { .. } => true,
            BlobError::Service { code, .. } => BUCKET_MISSING_CODES.contains(&code.as_str()),
            _ => false,
        }
    }
}

impl From<BlobError> for std::io::Error {
    fn from(e: BlobError) -> Self {
        let kind = match e {
            BlobError::NoSuchKey { .. } | BlobError::BucketNotFound { .. } => {
                std::io::ErrorKind::NotFound
            }
            BlobError::ChannelClosed => std::io::ErrorKind::BrokenPipe,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
