//! Synchronous storage interfaces called by the version-control engine.
//!
//! The engine owns object parsing, pack generation, reference caching and
//! conflict handling. It reaches storage only through these traits.

use kvgit_blob::StreamingPackWriter;
use kvgit_refs::RefCache;
use kvgit_types::{PackDescription, PackExt, PackSource, Reference};

use crate::error::AdapterResult;

/// Seekable read access to one stored pack file.
pub trait ReadableChannel: Send {
    /// Current read position.
    fn position(&self) -> u64;

    /// Move the read position.
    fn set_position(&mut self, position: u64);

    /// Read from the current position into `buf`, advancing the position.
    /// Returns 0 at or past the end of the file.
    fn read(&mut self, buf: &mut [u8]) -> AdapterResult<usize>;

    /// File length, known after the first successful read.
    fn size(&self) -> Option<u64>;

    /// Preferred read granularity.
    fn block_size(&self) -> usize;

    /// Extra bytes to request beyond each read.
    fn set_read_ahead(&mut self, bytes: u64);
}

/// Pack storage of one repository.
pub trait ObjectDatabase {
    /// Every committed pack.
    fn list_packs(&self) -> AdapterResult<Vec<PackDescription>>;

    /// A fresh, not yet committed pack.
    fn new_pack(&self, source: PackSource) -> PackDescription;

    /// Open one file of a pack for reading.
    fn open_file(&self, desc: &PackDescription, ext: PackExt)
        -> AdapterResult<Box<dyn ReadableChannel>>;

    /// Start writing one file of a pack.
    fn write_file(&self, desc: &PackDescription, ext: PackExt) -> AdapterResult<StreamingPackWriter>;

    /// Publish `additions` and retire `replaces` in the pack catalog.
    fn commit_packs(
        &self,
        additions: &[PackDescription],
        replaces: &[PackDescription],
    ) -> AdapterResult<()>;

    /// Clean up after a failed commit. Never fails.
    fn rollback_packs(&self, descs: &[PackDescription]);
}

/// Reference storage of one repository.
pub trait RefDatabase {
    /// Publish `new` if the stored target still matches `old`.
    /// `Ok(false)` means the update lost a race.
    fn compare_and_put(&self, old: Option<&Reference>, new: &Reference) -> AdapterResult<bool>;

    /// Remove `old` if the stored target still matches it.
    fn compare_and_remove(&self, old: &Reference) -> AdapterResult<bool>;

    /// Every reference, sorted by name.
    fn scan_all_refs(&self) -> AdapterResult<RefCache>;
}

/// Configuration text of one repository.
pub trait ConfigStorage {
    /// The stored text; empty if none was ever saved.
    fn load(&self) -> AdapterResult<String>;

    /// Replace the stored text.
    fn save(&self, text: &str) -> AdapterResult<()>;
}
