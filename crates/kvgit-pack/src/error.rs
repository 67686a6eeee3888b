use kvgit_blob::BlobError;
use kvgit_kv::KvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("key-value store error: {0}")]
    Store(#[from] KvError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("invalid pack description for {name}: {reason}")]
    InvalidDescription { name: String, reason: String },

    /// A catalog batch failed after earlier batches were applied. Applied
    /// batches are not undone.
    #[error("pack catalog update failed after {applied} of {total} operations: {source}")]
    PartialBatchFailure {
        applied: usize,
        total: usize,
        source: KvError,
    },
}

pub type PackResult<T> = Result<T, PackError>;
