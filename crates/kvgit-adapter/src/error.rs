use kvgit_blob::BlobError;
use kvgit_config::ConfigError;
use kvgit_pack::PackError;
use kvgit_refs::RefError;
use kvgit_types::RepositoryName;
use thiserror::Error;

/// Errors surfaced to the consuming engine.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("reference error: {0}")]
    Refs(#[from] RefError),

    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    #[error("configuration store error: {0}")]
    Config(#[from] ConfigError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("repository already exists: {0}")]
    RepositoryExists(RepositoryName),

    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
