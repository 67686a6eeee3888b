use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown pack source: {0}")]
    UnknownPackSource(String),

    #[error("unknown pack extension: {0}")]
    UnknownPackExt(String),

    #[error("repository name must not be empty")]
    EmptyRepositoryName,
}
