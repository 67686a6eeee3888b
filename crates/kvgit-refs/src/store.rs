//! [`ReferenceStore`]: references as conditionally written table rows.

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use kvgit_kv::{Condition, ItemKey, KeyValueStoreClient, TableSchema, Throughput};
use kvgit_types::{Reference, RepositoryName};
use tracing::debug;

use crate::cache::RefCache;
use crate::error::{RefError, Result};
use crate::row::{self, NAME, REPOSITORY_NAME, TARGET};

/// Reference storage for all repositories in one table.
///
/// Each row is one reference; a row is the unit of concurrency control.
/// There are no transactions across rows.
#[derive(Clone, Debug)]
pub struct ReferenceStore {
    client: KeyValueStoreClient,
    schema: TableSchema,
}

impl ReferenceStore {
    /// Store references in `table`, creating it with `throughput` on first write.
    pub fn new(client: KeyValueStoreClient, table: impl Into<String>, throughput: Throughput) -> Self {
        let schema = TableSchema::sorted(table, REPOSITORY_NAME, NAME)
            .with_throughput(throughput.read_capacity, throughput.write_capacity);
        Self { client, schema }
    }

    /// Schema the table is created with.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Publish `new` if the stored target still equals `old`'s.
    ///
    /// With no `old`, or an `old` marked new, the write is unconditional.
    /// Returns `Ok(false)` when another writer got there first.
    pub async fn compare_and_put(
        &self,
        repository: &RepositoryName,
        old: Option<&Reference>,
        new: &Reference,
    ) -> Result<bool> {
        let target = new.target_name();
        debug!(repository = %repository, name = %new.name, target = %target, "saving ref");

        let key = ItemKey::composite(repository.as_str(), new.name.as_str());
        let condition = expected_target(old);
        let applied = self
            .client
            .conditional_update(&self.schema, &key, &row::publish_update(new), condition.as_ref())
            .await?;

        if applied {
            debug!(repository = %repository, name = %new.name, "saved ref");
        } else {
            debug!(repository = %repository, name = %new.name, "ref changed concurrently, not saved");
        }
        Ok(applied)
    }

    /// Publish `new` only if no reference of that name is stored yet.
    ///
    /// Returns `Ok(false)` if the reference already exists.
    pub async fn create(&self, repository: &RepositoryName, new: &Reference) -> Result<bool> {
        debug!(repository = %repository, name = %new.name, target = %new.target_name(), "creating ref");
        let key = ItemKey::composite(repository.as_str(), new.name.as_str());
        let absent = Condition::AttributeNotExists(TARGET.to_string());
        let created = self
            .client
            .conditional_update(&self.schema, &key, &row::publish_update(new), Some(&absent))
            .await?;
        if !created {
            debug!(repository = %repository, name = %new.name, "ref already exists");
        }
        Ok(created)
    }

    /// Delete `reference` if the stored target still equals its target.
    pub async fn compare_and_remove(
        &self,
        repository: &RepositoryName,
        reference: &Reference,
    ) -> Result<bool> {
        let expected = reference.target_name();
        debug!(repository = %repository, name = %reference.name, target = %expected, "removing ref");

        let key = ItemKey::composite(repository.as_str(), reference.name.as_str());
        let removed = self
            .client
            .delete_item(&self.schema, &key, Some(&Condition::equals(TARGET, expected)))
            .await?;
        if removed {
            debug!(repository = %repository, name = %reference.name, "removed ref");
        }
        Ok(removed)
    }

    /// Read one reference.
    pub async fn get(&self, repository: &RepositoryName, name: &str) -> Result<Option<Reference>> {
        let key = ItemKey::composite(repository.as_str(), name);
        match self.client.get_item(&self.schema.name, &key).await? {
            Some(item) => row::decode(&item).map(Some),
            None => Ok(None),
        }
    }

    /// Lazily stream every reference of a repository, ascending by name.
    pub fn list_all_sorted(&self, repository: &RepositoryName) -> BoxStream<'static, Result<Reference>> {
        self.client
            .query_all(&self.schema.name, repository.as_str())
            .map_err(RefError::from)
            .and_then(|item| futures::future::ready(row::decode(&item)))
            .boxed()
    }

    /// Read every reference of a repository into a [`RefCache`].
    pub async fn scan_all_refs(&self, repository: &RepositoryName) -> Result<RefCache> {
        debug!(repository = %repository, "retrieving refs");
        let refs: Vec<Reference> = self.list_all_sorted(repository).try_collect().await?;
        let cache = RefCache::from_sorted(refs);
        debug!(repository = %repository, count = cache.len(), "retrieved refs");
        Ok(cache)
    }
}

fn expected_target(old: Option<&Reference>) -> Option<Condition> {
    old.filter(|r| !r.is_new())
        .map(|r| Condition::equals(TARGET, r.target_name()))
}
