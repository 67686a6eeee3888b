use kvgit_kv::KvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The text does not fit in one row.
    #[error("configuration is too large: {size} bytes exceeds {max}")]
    SizeExceeded { size: usize, max: usize },

    #[error("key-value store error: {0}")]
    Store(#[from] KvError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
