//! [`PackCatalog`]: one key-value row per pack.

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use kvgit_kv::{Item, ItemKey, KeyValueStoreClient, TableSchema, MAX_BATCH_OPERATIONS};
use kvgit_types::{PackDescription, RepositoryName};
use tracing::debug;

use crate::codec;
use crate::error::{PackError, PackResult};

const REPOSITORY_NAME: &str = "RepositoryName";
const NAME: &str = "Name";
const DESCRIPTION: &str = "Description";

enum Operation<'a> {
    Add(&'a PackDescription),
    Remove(&'a PackDescription),
}

/// Pack descriptions of every repository, keyed by repository and pack base name.
#[derive(Clone, Debug)]
pub struct PackCatalog {
    client: KeyValueStoreClient,
    schema: TableSchema,
}

impl PackCatalog {
    pub fn new(client: KeyValueStoreClient, table: impl Into<String>) -> Self {
        Self {
            client,
            schema: TableSchema::sorted(table, REPOSITORY_NAME, NAME),
        }
    }

    /// Add and remove catalog rows.
    ///
    /// Additions come first, then removals, in batches of at most
    /// [`MAX_BATCH_OPERATIONS`]. Batches are independent: when one fails,
    /// the ones before it stay applied and
    /// [`PackError::PartialBatchFailure`] reports how far it got.
    pub async fn update_pack_descriptions(
        &self,
        additions: &[PackDescription],
        removals: &[PackDescription],
    ) -> PackResult<()> {
        let operations: Vec<Operation<'_>> = additions
            .iter()
            .map(Operation::Add)
            .chain(removals.iter().map(Operation::Remove))
            .collect();
        let total = operations.len();
        let mut applied = 0;

        for chunk in operations.chunks(MAX_BATCH_OPERATIONS) {
            let mut puts = Vec::new();
            let mut deletes = Vec::new();
            for op in chunk {
                match op {
                    Operation::Add(desc) => puts.push(row(desc)),
                    Operation::Remove(desc) => deletes.push(key(desc)),
                }
            }

            if let Err(source) = self.client.batch_write(&self.schema, puts, deletes).await {
                return Err(if applied == 0 {
                    PackError::Store(source)
                } else {
                    PackError::PartialBatchFailure {
                        applied,
                        total,
                        source,
                    }
                });
            }
            applied += chunk.len();
        }

        debug!(
            additions = additions.len(),
            removals = removals.len(),
            "pack catalog updated"
        );
        Ok(())
    }

    /// Lazily stream every pack description of a repository, by pack name.
    pub fn get_all_pack_descriptions(
        &self,
        repository: &RepositoryName,
    ) -> BoxStream<'static, PackResult<PackDescription>> {
        let repository = repository.clone();
        self.client
            .query_all(&self.schema.name, repository.as_str())
            .map_err(PackError::from)
            .and_then(move |item| futures::future::ready(decode(&repository, &item)))
            .boxed()
    }

    /// Collect every pack description of a repository.
    pub async fn list(&self, repository: &RepositoryName) -> PackResult<Vec<PackDescription>> {
        let packs: Vec<PackDescription> = self
            .get_all_pack_descriptions(repository)
            .try_collect()
            .await?;
        debug!(repository = %repository, count = packs.len(), "retrieved packs");
        Ok(packs)
    }
}

fn key(desc: &PackDescription) -> ItemKey {
    ItemKey::composite(desc.repository.as_str(), desc.pack_name.as_str())
}

fn row(desc: &PackDescription) -> Item {
    Item::new()
        .with(REPOSITORY_NAME, desc.repository.as_str())
        .with(NAME, desc.pack_name.as_str())
        .with(DESCRIPTION, codec::to_json(desc))
}

fn decode(repository: &RepositoryName, item: &Item) -> PackResult<PackDescription> {
    let name = item.get_str(NAME).unwrap_or_default();
    let json = item
        .get_str(DESCRIPTION)
        .ok_or_else(|| PackError::InvalidDescription {
            name: name.to_string(),
            reason: format!("missing {DESCRIPTION}"),
        })?;
    codec::from_json(repository.clone(), name, json)
}
