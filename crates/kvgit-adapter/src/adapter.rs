//! [`StorageAdapter`]: the engine-facing storage of one repository.

use std::sync::Arc;

use kvgit_blob::{BlobStore, BlobStoreClient, RemoteRangeReader, StreamingPackWriter, UploadCompletion};
use kvgit_config::ConfigStore;
use kvgit_kv::{KeyValueStore, KeyValueStoreClient};
use kvgit_pack::{new_pack_name, PackCatalog, PackStore};
use kvgit_refs::{RefCache, ReferenceStore};
use kvgit_types::{PackDescription, PackExt, PackSource, Reference, RepositoryName};
use tracing::{debug, warn};

use crate::bridge::BlockingBridge;
use crate::config::AdapterConfig;
use crate::engine::{ConfigStorage, ObjectDatabase, ReadableChannel, RefDatabase};
use crate::error::{AdapterError, AdapterResult};

const HEAD: &str = "HEAD";

/// Storage of one repository on a key-value store and a blob store.
///
/// Holds no state beyond its store clients; any number of adapters, in any
/// number of processes, may serve the same repository.
#[derive(Clone, Debug)]
pub struct StorageAdapter {
    repository: RepositoryName,
    refs: ReferenceStore,
    catalog: PackCatalog,
    packs: PackStore,
    config: ConfigStore,
    read_ahead: u64,
    bridge: BlockingBridge,
}

impl StorageAdapter {
    pub fn new(
        repository: RepositoryName,
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
        config: &AdapterConfig,
        bridge: BlockingBridge,
    ) -> AdapterResult<Self> {
        config.validate()?;
        let kv = KeyValueStoreClient::new(kv);
        let blobs = BlobStoreClient::new(blobs);
        Ok(Self {
            repository,
            refs: ReferenceStore::new(kv.clone(), &config.refs_table, config.refs_throughput()),
            catalog: PackCatalog::new(kv.clone(), &config.pack_descriptions_table),
            packs: PackStore::new(blobs, &config.packs_bucket, config.writer_options()),
            config: ConfigStore::new(kv, &config.configurations_table),
            read_ahead: config.read_ahead,
            bridge,
        })
    }

    /// The same stores, serving another repository.
    pub fn with_repository(&self, repository: RepositoryName) -> Self {
        Self {
            repository,
            ..self.clone()
        }
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns `true` if the repository has a `HEAD`.
    pub fn exists(&self) -> AdapterResult<bool> {
        let (refs, repository) = (self.refs.clone(), self.repository.clone());
        let head = self
            .bridge
            .block_on(async move { refs.get(&repository, HEAD).await })??;
        Ok(head.is_some())
    }

    /// Initialize the repository with `HEAD` pointing at `refs/heads/{initial_branch}`.
    ///
    /// Fails with [`AdapterError::RepositoryExists`] if `HEAD` is already
    /// stored; of two concurrent creators exactly one succeeds.
    pub fn create_repository(&self, initial_branch: &str) -> AdapterResult<()> {
        let head = Reference::symbolic(HEAD, format!("refs/heads/{initial_branch}"));
        let (refs, repository) = (self.refs.clone(), self.repository.clone());
        let created = self
            .bridge
            .block_on(async move { refs.create(&repository, &head).await })??;
        if !created {
            return Err(AdapterError::RepositoryExists(self.repository.clone()));
        }
        debug!(repository = %self.repository, branch = initial_branch, "created repository");
        Ok(())
    }

    /// Wait until a pack writer's upload has finished.
    pub fn wait_for_upload(&self, completion: UploadCompletion) -> AdapterResult<()> {
        self.bridge.block_on(completion.wait())??;
        Ok(())
    }

    fn describe_files(desc: &PackDescription) -> String {
        desc.extensions()
            .map(|ext| desc.file_name(ext))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ObjectDatabase for StorageAdapter {
    fn list_packs(&self) -> AdapterResult<Vec<PackDescription>> {
        debug!(repository = %self.repository, "retrieving list of packs");
        let (catalog, repository) = (self.catalog.clone(), self.repository.clone());
        Ok(self
            .bridge
            .block_on(async move { catalog.list(&repository).await })??)
    }

    fn new_pack(&self, source: PackSource) -> PackDescription {
        let name = new_pack_name(source);
        debug!(repository = %self.repository, pack = %name, "created new pack");
        PackDescription::new(self.repository.clone(), &name).with_source(source)
    }

    fn open_file(
        &self,
        desc: &PackDescription,
        ext: PackExt,
    ) -> AdapterResult<Box<dyn ReadableChannel>> {
        let mut reader = self.packs.open_file(desc, ext);
        reader.set_read_ahead(self.read_ahead);
        Ok(Box::new(BlobChannel {
            reader,
            bridge: self.bridge.clone(),
        }))
    }

    fn write_file(&self, desc: &PackDescription, ext: PackExt) -> AdapterResult<StreamingPackWriter> {
        Ok(self.packs.write_file(desc, ext, self.bridge.handle()))
    }

    fn commit_packs(
        &self,
        additions: &[PackDescription],
        replaces: &[PackDescription],
    ) -> AdapterResult<()> {
        let total = additions.len() + replaces.len();
        debug!(repository = %self.repository, count = total, "committing packs");
        let catalog = self.catalog.clone();
        let (additions, replaces) = (additions.to_vec(), replaces.to_vec());
        self.bridge.block_on(async move {
            catalog
                .update_pack_descriptions(&additions, &replaces)
                .await
        })??;
        debug!(repository = %self.repository, count = total, "commit of packs complete");
        Ok(())
    }

    fn rollback_packs(&self, descs: &[PackDescription]) {
        for desc in descs {
            debug!(files = %Self::describe_files(desc), "rolling back pack files");
        }
        let (packs, descs) = (self.packs.clone(), descs.to_vec());
        let result = self
            .bridge
            .block_on(async move { packs.delete_packs(&descs).await })
            .and_then(|deleted| deleted.map_err(AdapterError::from));
        if let Err(e) = result {
            warn!(repository = %self.repository, error = %e, "pack rollback failed");
        }
    }
}

impl RefDatabase for StorageAdapter {
    fn compare_and_put(&self, old: Option<&Reference>, new: &Reference) -> AdapterResult<bool> {
        let (refs, repository) = (self.refs.clone(), self.repository.clone());
        let (old, new) = (old.cloned(), new.clone());
        Ok(self.bridge.block_on(async move {
            refs.compare_and_put(&repository, old.as_ref(), &new).await
        })??)
    }

    fn compare_and_remove(&self, old: &Reference) -> AdapterResult<bool> {
        let (refs, repository) = (self.refs.clone(), self.repository.clone());
        let old = old.clone();
        Ok(self
            .bridge
            .block_on(async move { refs.compare_and_remove(&repository, &old).await })??)
    }

    fn scan_all_refs(&self) -> AdapterResult<RefCache> {
        let (refs, repository) = (self.refs.clone(), self.repository.clone());
        Ok(self
            .bridge
            .block_on(async move { refs.scan_all_refs(&repository).await })??)
    }
}

impl ConfigStorage for StorageAdapter {
    fn load(&self) -> AdapterResult<String> {
        let (config, repository) = (self.config.clone(), self.repository.clone());
        let text = self
            .bridge
            .block_on(async move { config.load(&repository).await })??;
        Ok(text.unwrap_or_default())
    }

    fn save(&self, text: &str) -> AdapterResult<()> {
        let (config, repository) = (self.config.clone(), self.repository.clone());
        let text = text.to_owned();
        Ok(self
            .bridge
            .block_on(async move { config.save(&repository, &text).await })??)
    }
}

/// [`ReadableChannel`] over a remote pack file.
#[derive(Debug)]
struct BlobChannel {
    reader: RemoteRangeReader,
    bridge: BlockingBridge,
}

impl ReadableChannel for BlobChannel {
    fn position(&self) -> u64 {
        self.reader.position()
    }

    fn set_position(&mut self, position: u64) {
        self.reader.set_position(position);
    }

    fn read(&mut self, buf: &mut [u8]) -> AdapterResult<usize> {
        let mut reader = self.reader.clone();
        let len = buf.len();
        let (reader, chunk, read) = self.bridge.block_on(async move {
            let mut chunk = vec![0u8; len];
            let read = reader.read(&mut chunk).await;
            (reader, chunk, read)
        })?;
        self.reader = reader;
        let n = read?;
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn size(&self) -> Option<u64> {
        self.reader.size()
    }

    fn block_size(&self) -> usize {
        self.reader.block_size()
    }

    fn set_read_ahead(&mut self, bytes: u64) {
        self.reader.set_read_ahead(bytes);
    }
}
