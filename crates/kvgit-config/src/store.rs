use kvgit_kv::{ItemKey, KeyValueStoreClient, TableSchema, Update};
use kvgit_types::RepositoryName;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Largest configuration text, in bytes, that fits in one row.
pub const MAX_ITEM_SIZE: usize = 399 * 1024;

const REPOSITORY_NAME: &str = "RepositoryName";
const TEXT: &str = "Text";

/// Configuration text of every repository in one table.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    client: KeyValueStoreClient,
    schema: TableSchema,
}

impl ConfigStore {
    pub fn new(client: KeyValueStoreClient, table: impl Into<String>) -> Self {
        Self {
            client,
            schema: TableSchema::partitioned(table, REPOSITORY_NAME),
        }
    }

    /// The stored text, or `None` if the repository has never saved any.
    pub async fn load(&self, repository: &RepositoryName) -> ConfigResult<Option<String>> {
        let item = self
            .client
            .get_item(&self.schema.name, &ItemKey::partition(repository.as_str()))
            .await?;
        let text = item.and_then(|item| item.get_str(TEXT).map(str::to_string));
        debug!(repository = %repository, found = text.is_some(), "loaded configuration");
        Ok(text)
    }

    /// Replace the stored text.
    ///
    /// Text longer than [`MAX_ITEM_SIZE`] bytes is rejected without
    /// contacting the store.
    pub async fn save(&self, repository: &RepositoryName, text: &str) -> ConfigResult<()> {
        if text.len() > MAX_ITEM_SIZE {
            return Err(ConfigError::SizeExceeded {
                size: text.len(),
                max: MAX_ITEM_SIZE,
            });
        }
        let key = ItemKey::partition(repository.as_str());
        self.client
            .conditional_update(&self.schema, &key, &Update::new().set(TEXT, text), None)
            .await?;
        debug!(repository = %repository, bytes = text.len(), "saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_kv::{InMemoryKeyValueStore, KvError, KvOperation};
    use std::sync::Arc;

    fn repo() -> RepositoryName {
        RepositoryName::new("demo").unwrap()
    }

    fn setup() -> (Arc<InMemoryKeyValueStore>, ConfigStore) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = ConfigStore::new(KeyValueStoreClient::new(kv.clone()), "kvgit.Configurations");
        (kv, store)
    }

    #[tokio::test]
    async fn missing_configuration_is_none() {
        let (_kv, store) = setup();
        assert_eq!(store.load(&repo()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_creates_table_and_overwrites() {
        let (kv, store) = setup();
        store.save(&repo(), "[core]\n\tbare = true\n").await.unwrap();
        assert_eq!(
            kv.table_schema("kvgit.Configurations")
                .map(|s| (s.partition_key, s.sort_key)),
            Some(("RepositoryName".to_string(), None))
        );
        store.save(&repo(), "[core]\n\tbare = false\n").await.unwrap();
        assert_eq!(
            store.load(&repo()).await.unwrap().as_deref(),
            Some("[core]\n\tbare = false\n")
        );
        assert_eq!(kv.item_count("kvgit.Configurations"), 1);
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_before_any_call() {
        let (kv, store) = setup();
        let text = "x".repeat(MAX_ITEM_SIZE + 1);
        let err = store.save(&repo(), &text).await.unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SizeExceeded { size, max } if size == MAX_ITEM_SIZE + 1 && max == MAX_ITEM_SIZE
        ));
        assert_eq!(kv.operations(), Vec::<KvOperation>::new());
    }

    #[tokio::test]
    async fn text_at_the_limit_is_accepted() {
        let (_kv, store) = setup();
        store.save(&repo(), &"x".repeat(MAX_ITEM_SIZE)).await.unwrap();
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let (kv, store) = setup();
        kv.set_unavailable(true);
        assert!(matches!(
            store.load(&repo()).await.unwrap_err(),
            ConfigError::Store(KvError::Transport(_))
        ));
    }
}
