//! Reference storage for kvgit.
//!
//! Every reference of every repository is one row of a single key-value
//! table, partitioned by repository name and sorted by reference name.
//! Updates are compare-and-swap on the row's stored target, which makes a
//! row the unit of concurrency control.
//!
//! # Architecture
//!
//! - **Publishing** ([`ReferenceStore::compare_and_put`]) writes the target,
//!   the symbolic and peeled flags, and the peeled object of tags. When an
//!   expected reference is given (and not marked new), the write only
//!   applies if the stored target still matches it.
//! - **Removal** ([`ReferenceStore::compare_and_remove`]) is conditioned the
//!   same way.
//! - **Listing** ([`ReferenceStore::list_all_sorted`]) streams rows in name
//!   order; the consuming engine advertises references in exactly this
//!   order.
//!
//! A lost race is `Ok(false)`. Store failures are [`RefError::Store`].
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`row`] -- Row layout and the reference <-> row mapping
//! - [`store`] -- [`ReferenceStore`]
//! - [`cache`] -- [`RefCache`], the sorted snapshot returned by a scan

pub mod cache;
pub mod error;
pub mod row;
pub mod store;

pub use cache::RefCache;
pub use error::{RefError, Result};
pub use store::ReferenceStore;
