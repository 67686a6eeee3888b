//! [`PackStore`]: pack files as blob store objects.

use kvgit_blob::{BlobStoreClient, RemoteRangeReader, StreamingPackWriter, WriterOptions};
use kvgit_types::{PackDescription, PackExt, RepositoryName};
use tokio::runtime::Handle;
use tracing::debug;

use crate::error::PackResult;

/// Reads, writes and deletes pack files in one bucket.
///
/// Objects are keyed `{repository}/{file name}`.
#[derive(Clone, Debug)]
pub struct PackStore {
    client: BlobStoreClient,
    bucket: String,
    options: WriterOptions,
}

impl PackStore {
    pub fn new(client: BlobStoreClient, bucket: impl Into<String>, options: WriterOptions) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            options,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Blob key of one file of a repository.
    pub fn object_name(repository: &RepositoryName, file_name: &str) -> String {
        format!("{repository}/{file_name}")
    }

    /// Open one file of a pack for reading.
    pub fn open_file(&self, desc: &PackDescription, ext: PackExt) -> RemoteRangeReader {
        let key = Self::object_name(&desc.repository, &desc.file_name(ext));
        debug!(key = %key, "reading pack file");
        RemoteRangeReader::new(self.client.clone(), &self.bucket, key, self.options.block_size)
    }

    /// Start writing one file of a pack. The upload runs on `runtime`.
    ///
    /// A size already recorded on `desc` for `ext` is declared as the
    /// upload's content length.
    pub fn write_file(
        &self,
        desc: &PackDescription,
        ext: PackExt,
        runtime: &Handle,
    ) -> StreamingPackWriter {
        let key = Self::object_name(&desc.repository, &desc.file_name(ext));
        debug!(key = %key, "writing pack file");
        let options = WriterOptions {
            content_length: desc.file_size(ext).filter(|&size| size > 0),
            ..self.options
        };
        StreamingPackWriter::start(self.client.clone(), runtime, &self.bucket, key, options)
    }

    /// Delete every file of every given pack.
    pub async fn delete_packs(&self, packs: &[PackDescription]) -> PackResult<()> {
        let keys: Vec<String> = packs
            .iter()
            .flat_map(|desc| {
                desc.extensions()
                    .map(move |ext| Self::object_name(&desc.repository, &desc.file_name(ext)))
            })
            .collect();
        if keys.is_empty() {
            return Ok(());
        }
        debug!(bucket = %self.bucket, count = keys.len(), "deleting pack files");
        self.client.delete_objects(&self.bucket, &keys).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_blob::{BlobOperation, InMemoryBlobStore};
    use std::io::Write;
    use std::sync::Arc;

    fn repo() -> RepositoryName {
        RepositoryName::new("demo").unwrap()
    }

    fn setup() -> (Arc<InMemoryBlobStore>, PackStore) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = PackStore::new(
            BlobStoreClient::new(blobs.clone()),
            "kvgit-packs",
            WriterOptions::default(),
        );
        (blobs, store)
    }

    #[test]
    fn object_names_are_repository_scoped() {
        assert_eq!(
            PackStore::object_name(&repo(), "ins-1-2.pack"),
            "demo/ins-1-2.pack"
        );
    }

    #[test]
    fn written_file_can_be_read_back_remotely() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let (blobs, store) = setup();
        let desc = PackDescription::new(repo(), "ins-1-2");

        let mut writer = store.write_file(&desc, PackExt::Pack, rt.handle());
        writer.write_all(b"PACK\x00\x00\x00\x02").unwrap();
        writer.close();
        rt.block_on(writer.completion().unwrap().wait()).unwrap();
        assert!(blobs.object("kvgit-packs", "demo/ins-1-2.pack").is_some());

        let mut reader = store.open_file(&desc, PackExt::Pack);
        assert_eq!(reader.block_size(), WriterOptions::default().block_size);
        let mut buf = [0u8; 4];
        let n = rt.block_on(reader.read(&mut buf)).unwrap();
        assert_eq!(&buf[..n], b"PACK");
        assert_eq!(reader.size(), Some(8));
    }

    #[tokio::test]
    async fn delete_covers_every_present_extension() {
        let (blobs, store) = setup();
        let a = PackDescription::new(repo(), "gc-1-1")
            .with_file(PackExt::Pack, 10)
            .with_file(PackExt::Index, 2);
        let b = PackDescription::new(repo(), "gc-1-2").with_file(PackExt::BitmapIndex, 1);
        for key in [
            "demo/gc-1-1.pack",
            "demo/gc-1-1.idx",
            "demo/gc-1-2.bitmap",
            "demo/keep.pack",
        ] {
            blobs.insert_object("kvgit-packs", key, &b"x"[..]);
        }

        store.delete_packs(&[a, b]).await.unwrap();

        assert_eq!(blobs.keys("kvgit-packs"), vec!["demo/keep.pack".to_string()]);
        assert_eq!(
            blobs.operations(),
            vec![BlobOperation::DeleteObjects { keys: 3 }]
        );
    }

    #[tokio::test]
    async fn deleting_packs_without_files_is_a_no_op() {
        let (blobs, store) = setup();
        store
            .delete_packs(&[PackDescription::new(repo(), "ins-1-1")])
            .await
            .unwrap();
        assert!(blobs.operations().is_empty());
    }
}
