//! In-memory key-value store for testing and embedding.
//!
//! [`InMemoryKeyValueStore`] keeps each table in an ordered map so partition
//! queries come back sorted by sort key, like the real service. Every call is
//! appended to an operation log, which makes the store usable as a recording
//! test double, and a few switches inject the failures kvgit must survive.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::error::{KvError, KvResult};
use crate::model::{Condition, Item, ItemKey, QueryPage, TableSchema, Update, WriteRequest};
use crate::traits::KeyValueStore;
use crate::MAX_BATCH_OPERATIONS;

/// Default number of items per query page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// A call recorded by [`InMemoryKeyValueStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOperation {
    CreateTable { table: String },
    GetItem { table: String },
    Query { table: String },
    UpdateItem { table: String },
    DeleteItem { table: String },
    BatchWrite { table: String, puts: usize, deletes: usize },
}

struct Table {
    schema: TableSchema,
    rows: BTreeMap<ItemKey, Item>,
}

/// An in-memory implementation of [`KeyValueStore`].
pub struct InMemoryKeyValueStore {
    tables: RwLock<HashMap<String, Table>>,
    log: Mutex<Vec<KvOperation>>,
    page_size: usize,
    unavailable: AtomicBool,
    batches_before_failure: Mutex<Option<usize>>,
}

impl InMemoryKeyValueStore {
    /// Create a store with no tables.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store that returns at most `page_size` items per query page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            page_size: page_size.max(1),
            unavailable: AtomicBool::new(false),
            batches_before_failure: Mutex::new(None),
        }
    }

    /// While set, every call fails with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Let `count` more batch writes succeed, then fail every later one with
    /// a transport error.
    pub fn fail_batch_writes_after(&self, count: usize) {
        *self.batches_before_failure.lock().expect("lock poisoned") = Some(count);
    }

    /// Every call received so far, in order.
    pub fn operations(&self) -> Vec<KvOperation> {
        self.log.lock().expect("lock poisoned").clone()
    }

    /// Forget the recorded calls.
    pub fn clear_operations(&self) {
        self.log.lock().expect("lock poisoned").clear();
    }

    /// Returns `true` if the table has been created.
    pub fn table_exists(&self, table: &str) -> bool {
        self.tables
            .read()
            .expect("lock poisoned")
            .contains_key(table)
    }

    /// Schema the table was created with.
    pub fn table_schema(&self, table: &str) -> Option<TableSchema> {
        self.tables
            .read()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.schema.clone())
    }

    /// Number of items in a table; zero for a missing table.
    pub fn item_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .expect("lock poisoned")
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    fn record(&self, op: KvOperation) -> KvResult<()> {
        self.log.lock().expect("lock poisoned").push(op);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvError::Transport("store unavailable".into()));
        }
        Ok(())
    }

    fn not_found(table: &str) -> KvError {
        KvError::TableNotFound {
            table: table.to_string(),
        }
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read().expect("lock poisoned");
        f.debug_struct("InMemoryKeyValueStore")
            .field("table_count", &tables.len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn create_table(&self, schema: &TableSchema) -> KvResult<()> {
        self.record(KvOperation::CreateTable {
            table: schema.name.clone(),
        })?;
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.entry(schema.name.clone()).or_insert_with(|| Table {
            schema: schema.clone(),
            rows: BTreeMap::new(),
        });
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &ItemKey) -> KvResult<Option<Item>> {
        self.record(KvOperation::GetItem {
            table: table.to_string(),
        })?;
        let tables = self.tables.read().expect("lock poisoned");
        let t = tables.get(table).ok_or_else(|| Self::not_found(table))?;
        t.schema.check_key(key)?;
        Ok(t.rows.get(key).cloned())
    }

    async fn query_page(
        &self,
        table: &str,
        partition: &str,
        exclusive_start: Option<&ItemKey>,
    ) -> KvResult<QueryPage> {
        self.record(KvOperation::Query {
            table: table.to_string(),
        })?;
        let tables = self.tables.read().expect("lock poisoned");
        let t = tables.get(table).ok_or_else(|| Self::not_found(table))?;

        let mut matching = t
            .rows
            .range(ItemKey::partition(partition)..)
            .take_while(|(k, _)| k.partition == partition)
            .filter(|(k, _)| exclusive_start.map_or(true, |start| *k > start));

        let mut items = Vec::new();
        let mut last_key = None;
        for (key, item) in matching.by_ref().take(self.page_size) {
            items.push(item.clone());
            last_key = Some(key.clone());
        }
        let last_evaluated = if matching.next().is_some() {
            last_key
        } else {
            None
        };
        Ok(QueryPage {
            items,
            last_evaluated,
        })
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: &Update,
        condition: Option<&Condition>,
    ) -> KvResult<()> {
        self.record(KvOperation::UpdateItem {
            table: table.to_string(),
        })?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let t = tables.get_mut(table).ok_or_else(|| Self::not_found(table))?;
        t.schema.check_key(key)?;

        let current = t.rows.get(key);
        if let Some(condition) = condition {
            if !condition.holds_for(current) {
                return Err(KvError::ConditionFailed);
            }
        }

        let mut item = current.cloned().unwrap_or_else(|| t.schema.key_item(key));
        update.apply_to(&mut item);
        t.rows.insert(key.clone(), item);
        Ok(())
    }

    async fn delete_item(
        &self,
        table: &str,
        key: &ItemKey,
        condition: Option<&Condition>,
    ) -> KvResult<()> {
        self.record(KvOperation::DeleteItem {
            table: table.to_string(),
        })?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let t = tables.get_mut(table).ok_or_else(|| Self::not_found(table))?;
        t.schema.check_key(key)?;

        if let Some(condition) = condition {
            if !condition.holds_for(t.rows.get(key)) {
                return Err(KvError::ConditionFailed);
            }
        }
        t.rows.remove(key);
        Ok(())
    }

    async fn batch_write(&self, table: &str, requests: &[WriteRequest]) -> KvResult<()> {
        let puts = requests
            .iter()
            .filter(|r| matches!(r, WriteRequest::Put(_)))
            .count();
        self.record(KvOperation::BatchWrite {
            table: table.to_string(),
            puts,
            deletes: requests.len() - puts,
        })?;

        if requests.len() > MAX_BATCH_OPERATIONS {
            return Err(KvError::BatchTooLarge {
                size: requests.len(),
                max: MAX_BATCH_OPERATIONS,
            });
        }

        {
            let mut remaining = self.batches_before_failure.lock().expect("lock poisoned");
            match remaining.as_mut() {
                Some(0) => return Err(KvError::Transport("injected batch failure".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }

        let mut tables = self.tables.write().expect("lock poisoned");
        let t = tables.get_mut(table).ok_or_else(|| Self::not_found(table))?;

        // Validate every request before touching any row.
        let mut resolved = Vec::with_capacity(requests.len());
        for request in requests {
            match request {
                WriteRequest::Put(item) => resolved.push((t.schema.key_of(item)?, Some(item))),
                WriteRequest::Delete(key) => {
                    t.schema.check_key(key)?;
                    resolved.push((key.clone(), None));
                }
            }
        }
        for (key, item) in resolved {
            match item {
                Some(item) => {
                    t.rows.insert(key, item.clone());
                }
                None => {
                    t.rows.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::sorted("refs", "RepositoryName", "Name")
    }

    fn row(repo: &str, name: &str) -> Item {
        Item::new().with("RepositoryName", repo).with("Name", name)
    }

    #[tokio::test]
    async fn operations_on_missing_table_fail_with_not_found() {
        let store = InMemoryKeyValueStore::new();
        let key = ItemKey::composite("demo", "HEAD");
        let err = store
            .update_item("refs", &key, &Update::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_table_not_found());
        let err = store.get_item("refs", &key).await.unwrap_err();
        assert!(err.is_table_not_found());
    }

    #[tokio::test]
    async fn create_table_is_idempotent() {
        let store = InMemoryKeyValueStore::new();
        store.create_table(&schema()).await.unwrap();
        store
            .batch_write("refs", &[WriteRequest::Put(row("demo", "a"))])
            .await
            .unwrap();
        store.create_table(&schema()).await.unwrap();
        assert_eq!(store.item_count("refs"), 1);
    }

    #[tokio::test]
    async fn update_creates_item_with_key_attributes() {
        let store = InMemoryKeyValueStore::new();
        store.create_table(&schema()).await.unwrap();
        let key = ItemKey::composite("demo", "HEAD");
        store
            .update_item("refs", &key, &Update::new().set("Target", "x"), None)
            .await
            .unwrap();
        let item = store.get_item("refs", &key).await.unwrap().unwrap();
        assert_eq!(item.get_str("RepositoryName"), Some("demo"));
        assert_eq!(item.get_str("Name"), Some("HEAD"));
        assert_eq!(item.get_str("Target"), Some("x"));
    }

    #[tokio::test]
    async fn failed_condition_leaves_item_untouched() {
        let store = InMemoryKeyValueStore::new();
        store.create_table(&schema()).await.unwrap();
        let key = ItemKey::composite("demo", "HEAD");
        store
            .update_item("refs", &key, &Update::new().set("Target", "x"), None)
            .await
            .unwrap();

        let err = store
            .update_item(
                "refs",
                &key,
                &Update::new().set("Target", "y"),
                Some(&Condition::equals("Target", "stale")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, KvError::ConditionFailed);
        let item = store.get_item("refs", &key).await.unwrap().unwrap();
        assert_eq!(item.get_str("Target"), Some("x"));
    }

    #[tokio::test]
    async fn query_pages_are_sorted_and_partitioned() {
        let store = InMemoryKeyValueStore::with_page_size(2);
        store.create_table(&schema()).await.unwrap();
        let requests: Vec<WriteRequest> = ["c", "a", "d", "b"]
            .iter()
            .map(|n| WriteRequest::Put(row("demo", n)))
            .chain(std::iter::once(WriteRequest::Put(row("other", "a"))))
            .collect();
        store.batch_write("refs", &requests).await.unwrap();

        let first = store.query_page("refs", "demo", None).await.unwrap();
        let names: Vec<&str> = first.items.iter().filter_map(|i| i.get_str("Name")).collect();
        assert_eq!(names, vec!["a", "b"]);
        let start = first.last_evaluated.clone().unwrap();

        let second = store.query_page("refs", "demo", Some(&start)).await.unwrap();
        let names: Vec<&str> = second.items.iter().filter_map(|i| i.get_str("Name")).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert!(second.last_evaluated.is_none());
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let store = InMemoryKeyValueStore::new();
        store.create_table(&schema()).await.unwrap();
        let requests: Vec<WriteRequest> = (0..26)
            .map(|i| WriteRequest::Put(row("demo", &format!("r{i}"))))
            .collect();
        let err = store.batch_write("refs", &requests).await.unwrap_err();
        assert_eq!(err, KvError::BatchTooLarge { size: 26, max: 25 });
        assert_eq!(store.item_count("refs"), 0);
    }

    #[tokio::test]
    async fn injected_batch_failure_after_count() {
        let store = InMemoryKeyValueStore::new();
        store.create_table(&schema()).await.unwrap();
        store.fail_batch_writes_after(1);
        store
            .batch_write("refs", &[WriteRequest::Put(row("demo", "a"))])
            .await
            .unwrap();
        let err = store
            .batch_write("refs", &[WriteRequest::Put(row("demo", "b"))])
            .await
            .unwrap_err();
        assert!(matches!(err, KvError::Transport(_)));
        assert_eq!(store.item_count("refs"), 1);
    }

    #[tokio::test]
    async fn unavailable_store_records_and_fails() {
        let store = InMemoryKeyValueStore::new();
        store.set_unavailable(true);
        let err = store.create_table(&schema()).await.unwrap_err();
        assert!(matches!(err, KvError::Transport(_)));
        assert_eq!(store.operations().len(), 1);
        assert!(!store.table_exists("refs"));
    }
}
