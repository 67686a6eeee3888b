//! Error types for reference operations.

use kvgit_kv::KvError;
use thiserror::Error;

/// Errors that can occur during reference operations.
///
/// A lost compare-and-swap race is not an error; it is reported as
/// `Ok(false)` by the store.
#[derive(Debug, Error)]
pub enum RefError {
    /// The key-value store failed.
    #[error("key-value store error: {0}")]
    Store(#[from] KvError),

    /// A stored row could not be turned back into a reference.
    #[error("corrupt reference row {name}: {reason}")]
    CorruptRow { name: String, reason: String },
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
