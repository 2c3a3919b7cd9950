//! Object storage abstraction and backends for keyfs.
//!
//! keyfs never stores object bodies; it only needs to create empty objects,
//! list keys under a prefix page by page, and delete keys in batches. This
//! crate provides:
//! - The [`ObjectStore`] trait covering exactly those operations
//! - An S3-compatible backend
//! - An in-memory backend for tests and dry runs

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{
    KeyStream, ListingOptions, ListingPage, ObjectStore, ObjectStoreListExt, PageStream, validate_key,
};

use keyfs_core::{Namespace, S3Config};
use std::sync::Arc;

/// Create an object store for the container of `namespace`.
pub fn from_config(namespace: &Namespace, config: &S3Config) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate()?;
    let backend = S3Backend::new(namespace.container(), config)?;
    Ok(Arc::new(backend))
}
