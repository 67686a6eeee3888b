//! [`KeyValueStoreClient`]: the table discipline every kvgit store relies on.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::{KvError, KvResult};
use crate::model::{Condition, Item, ItemKey, TableSchema, Update, WriteRequest};
use crate::traits::KeyValueStore;
use crate::MAX_BATCH_OPERATIONS;

/// Where a partition query resumes.
enum QueryCursor {
    Start,
    After(ItemKey),
    Done,
}

/// Client wrapper around a [`KeyValueStore`].
///
/// Mutating calls take the [`TableSchema`] of their table so that a missing
/// table can be created on the spot; the call is then retried exactly once
/// and a second failure is returned as is.
#[derive(Clone)]
pub struct KeyValueStoreClient {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueStoreClient {
    /// Wrap a store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read one item. A missing table reads as a missing item.
    pub async fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<Item>> {
        match self.store.get_item(table, key).await {
            Err(e) if e.is_table_not_found() => Ok(None),
            other => other,
        }
    }

    /// Lazily stream every item of a partition, ascending by sort key.
    ///
    /// Pages are fetched on demand as the stream is polled. A missing table
    /// yields an empty stream.
    pub fn query_all(&self, table: &str, partition: &str) -> BoxStream<'static, KvResult<Item>> {
        let store = Arc::clone(&self.store);
        let table = table.to_string();
        let partition = partition.to_string();

        let pages = stream::try_unfold(QueryCursor::Start, move |cursor| {
            let store = Arc::clone(&store);
            let table = table.clone();
            let partition = partition.clone();
            async move {
                let start = match cursor {
                    QueryCursor::Done => return Ok(None),
                    QueryCursor::Start => None,
                    QueryCursor::After(key) => Some(key),
                };
                match store.query_page(&table, &partition, start.as_ref()).await {
                    Ok(page) => {
                        let next = match page.last_evaluated {
                            Some(key) => QueryCursor::After(key),
                            None => QueryCursor::Done,
                        };
                        Ok(Some((page.items, next)))
                    }
                    Err(e) if e.is_table_not_found() => Ok(None),
                    Err(e) => Err(e),
                }
            }
        });

        pages
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Item, KvError>)))
            .try_flatten()
            .boxed()
    }

    /// Apply an update if `condition` holds.
    ///
    /// Returns `Ok(true)` when applied and `Ok(false)` when the precondition
    /// failed. Transport failures are errors.
    pub async fn conditional_update(
        &self,
        schema: &TableSchema,
        key: &ItemKey,
        update: &Update,
        condition: Option<&Condition>,
    ) -> KvResult<bool> {
        let result = self
            .with_table(schema, || {
                self.store.update_item(&schema.name, key, update, condition)
            })
            .await;
        applied(result)
    }

    /// Delete an item if `condition` holds.
    ///
    /// Returns `Ok(true)` when applied and `Ok(false)` when the precondition
    /// failed. Transport failures are errors.
    pub async fn delete_item(
        &self,
        schema: &TableSchema,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> KvResult<bool> {
        let result = self
            .with_table(schema, || self.store.delete_item(&schema.name, key, condition))
            .await;
        applied(result)
    }

    /// Write up to [`MAX_BATCH_OPERATIONS`] puts and deletes in one call.
    pub async fn batch_write(
        &self,
        schema: &TableSchema,
        puts: Vec<Item>,
        deletes: Vec<ItemKey>,
    ) -> KvResult<()> {
        let size = puts.len() + deletes.len();
        if size > MAX_BATCH_OPERATIONS {
            return Err(KvError::BatchTooLarge {
                size,
                max: MAX_BATCH_OPERATIONS,
            });
        }
        if size == 0 {
            return Ok(());
        }

        let requests: Vec<WriteRequest> = puts
            .into_iter()
            .map(WriteRequest::Put)
            .chain(deletes.into_iter().map(WriteRequest::Delete))
            .collect();

        debug!(table = %schema.name, operations = size, "issuing batch write");
        self.with_table(schema, || self.store.batch_write(&schema.name, &requests))
            .await
    }

    /// Run `op`; on a missing table create it from `schema` and run `op` once more.
    async fn with_table<T, F, Fut>(&self, schema: &TableSchema, op: F) -> KvResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = KvResult<T>>,
    {
        match op().await {
            Err(KvError::TableNotFound { table }) => {
                debug!(table = %table, "table does not exist yet, creating it");
                self.store.create_table(schema).await?;
                op().await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for KeyValueStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueStoreClient").finish_non_exhaustive()
    }
}

fn applied(result: KvResult<()>) -> KvResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(KvError::ConditionFailed) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryKeyValueStore, KvOperation};

    fn schema() -> TableSchema {
        TableSchema::sorted("refs", "RepositoryName", "Name").with_throughput(5, 5)
    }

    fn setup() -> (Arc<InMemoryKeyValueStore>, KeyValueStoreClient) {
        let store = Arc::new(InMemoryKeyValueStore::with_page_size(3));
        let client = KeyValueStoreClient::new(store.clone());
        (store, client)
    }

    #[tokio::test]
    async fn update_creates_missing_table_and_retries_once() {
        let (store, client) = setup();
        let key = ItemKey::composite("demo", "HEAD");
        let applied = client
            .conditional_update(&schema(), &key, &Update::new().set("Target", "a"), None)
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(store.table_schema("refs"), Some(schema()));
        assert_eq!(
            store.operations(),
            vec![
                KvOperation::UpdateItem { table: "refs".into() },
                KvOperation::CreateTable { table: "refs".into() },
                KvOperation::UpdateItem { table: "refs".into() },
            ]
        );
    }

    #[tokio::test]
    async fn failed_condition_is_not_applied_rather_than_error() {
        let (_store, client) = setup();
        let key = ItemKey::composite("demo", "HEAD");
        client
            .conditional_update(&schema(), &key, &Update::new().set("Target", "a"), None)
            .await
            .unwrap();
        let applied = client
            .conditional_update(
                &schema(),
                &key,
                &Update::new().set("Target", "b"),
                Some(&Condition::equals("Target", "zzz")),
            )
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let (store, client) = setup();
        store.set_unavailable(true);
        let key = ItemKey::composite("demo", "HEAD");
        let err = client
            .conditional_update(&schema(), &key, &Update::new().set("Target", "a"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, KvError::Transport(_)));
    }

    #[tokio::test]
    async fn get_and_query_on_missing_table_are_empty() {
        let (_store, client) = setup();
        let item = client
            .get_item("refs", &ItemKey::composite("demo", "HEAD"))
            .await
            .unwrap();
        assert!(item.is_none());
        let items: Vec<Item> = client.query_all("refs", "demo").try_collect().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn query_all_walks_every_page_in_order() {
        let (store, client) = setup();
        let puts: Vec<Item> = (0..8)
            .rev()
            .map(|i| {
                Item::new()
                    .with("RepositoryName", "demo")
                    .with("Name", format!("refs/heads/b{i}"))
            })
            .collect();
        client.batch_write(&schema(), puts, vec![]).await.unwrap();
        store.clear_operations();

        let items: Vec<Item> = client.query_all("refs", "demo").try_collect().await.unwrap();
        let names: Vec<&str> = items.iter().filter_map(|i| i.get_str("Name")).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("refs/heads/b{i}")).collect();
        assert_eq!(names, expected);
        // 8 items at 3 per page.
        assert_eq!(store.operations().len(), 3);
    }

    #[tokio::test]
    async fn query_all_is_lazy() {
        let (store, client) = setup();
        let puts: Vec<Item> = (0..6)
            .map(|i| {
                Item::new()
                    .with("RepositoryName", "demo")
                    .with("Name", format!("r{i}"))
            })
            .collect();
        client.batch_write(&schema(), puts, vec![]).await.unwrap();
        store.clear_operations();

        let mut stream = client.query_all("refs", "demo");
        assert!(store.operations().is_empty());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.get_str("Name"), Some("r0"));
        assert_eq!(store.operations().len(), 1);
    }

    #[tokio::test]
    async fn batch_write_rejects_more_than_limit_without_calling_store() {
        let (store, client) = setup();
        let puts: Vec<Item> = (0..20)
            .map(|i| {
                Item::new()
                    .with("RepositoryName", "demo")
                    .with("Name", format!("r{i}"))
            })
            .collect();
        let deletes: Vec<ItemKey> = (0..6)
            .map(|i| ItemKey::composite("demo", format!("d{i}")))
            .collect();
        let err = client
            .batch_write(&schema(), puts, deletes)
            .await
            .unwrap_err();
        assert_eq!(err, KvError::BatchTooLarge { size: 26, max: 25 });
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn delete_with_condition() {
        let (store, client) = setup();
        let key = ItemKey::composite("demo", "refs/heads/main");
        client
            .conditional_update(&schema(), &key, &Update::new().set("Target", "a"), None)
            .await
            .unwrap();

        let removed = client
            .delete_item(&schema(), &key, Some(&Condition::equals("Target", "b")))
            .await
            .unwrap();
        assert!(!removed);
        assert_eq!(store.item_count("refs"), 1);

        let removed = client
            .delete_item(&schema(), &key, Some(&Condition::equals("Target", "a")))
            .await
            .unwrap();
        assert!(removed);
        assert_eq!(store.item_count("refs"), 0);
    }
}
