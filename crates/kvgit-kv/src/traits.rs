use async_trait::async_trait;

use crate::error::KvResult;
use crate::model::{Condition, Item, ItemKey, QueryPage, TableSchema, Update, WriteRequest};

/// A key-value store service.
///
/// This is the raw contract of the underlying store; kvgit code talks to it
/// through [`KeyValueStoreClient`](crate::KeyValueStoreClient). Implementations
/// must satisfy these rules:
/// - Operations on a missing table fail with
///   [`KvError::TableNotFound`](crate::KvError::TableNotFound).
/// - A conditional write whose precondition does not hold fails with
///   [`KvError::ConditionFailed`](crate::KvError::ConditionFailed) and leaves
///   the item untouched.
/// - Query pages are sorted ascending by sort key.
/// - `create_table` is idempotent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Create a table. Creating an existing table is a no-op.
    async fn create_table(&self, schema: &TableSchema) -> KvResult<()>;

    /// Read one item. Returns `Ok(None)` if the item does not exist.
    async fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<Item>>;

    /// Read one page of the items sharing a partition key, starting after
    /// `exclusive_start` when given.
    async fn query_page(
        &self,
        table: &str,
        partition: &str,
        exclusive_start: Option<&ItemKey>,
    ) -> KvResult<QueryPage>;

    /// Apply an update to the item at `key`, creating it if absent, provided
    /// `condition` holds.
    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: &Update,
        condition: Option<&Condition>,
    ) -> KvResult<()>;

    /// Delete the item at `key`, provided `condition` holds. Deleting an
    /// absent item without a condition succeeds.
    async fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> KvResult<()>;

    /// Apply a batch of unconditional puts and deletes.
    async fn batch_write(&self, table: &str, requests: &[WriteRequest]) -> KvResult<()>;
}
