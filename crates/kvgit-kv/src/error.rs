/// Errors from key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KvError {
    /// The addressed table does not exist.
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// A conditional write's precondition did not hold.
    ///
    /// Backends return this; [`KeyValueStoreClient`](crate::KeyValueStoreClient)
    /// turns it into `Ok(false)`.
    #[error("conditional check failed")]
    ConditionFailed,

    /// A batch write carried more operations than the store accepts.
    #[error("batch of {size} operations exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A key or item does not match the table's key schema.
    #[error("invalid key for table {table}: {reason}")]
    InvalidKey { table: String, reason: String },

    /// Network or service failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl KvError {
    /// Returns `true` if the error reports a missing table.
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, KvError::TableNotFound { .. })
    }
}

/// Result alias for key-value store operations.
pub type KvResult<T> = Result<T, KvError>;
