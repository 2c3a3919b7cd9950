//! Storage trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use keyfs_core::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use std::pin::Pin;

/// A boxed stream of listing pages.
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<ListingPage>> + Send + 'a>>;

/// A boxed stream of object keys.
pub type KeyStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<String>> + Send + 'a>>;

/// A single page of listing results.
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    /// Full object keys in this page, in backend order.
    pub keys: Vec<String>,
}

/// Options for listing operations.
#[derive(Clone, Debug)]
pub struct ListingOptions {
    /// Number of keys to fetch per page.
    ///
    /// Clamped to `1..=MAX_PAGE_SIZE` so that one page always fits in one
    /// delete batch.
    pub page_size: usize,
}

impl ListingOptions {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Get the normalized page size.
    pub fn normalized_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Key-only object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Create (or overwrite) an object. keyfs always passes an empty body.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// List keys under `prefix` one page at a time.
    ///
    /// Pages are fetched lazily; dropping the stream stops pagination.
    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a>;

    /// Delete a batch of at most `MAX_PAGE_SIZE` keys.
    ///
    /// Returns the number of keys removed.
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize>;

    /// Longest key this backend accepts, in bytes.
    fn max_key_length(&self) -> usize;

    /// Static backend identifier used in logs (e.g. "s3", "memory").
    fn backend_name(&self) -> &'static str;
}

/// Reject empty keys and keys longer than `max` bytes.
pub fn validate_key(key: &str, max: usize) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > max {
        return Err(StorageError::KeyTooLong {
            len: key.len(),
            max,
        });
    }
    Ok(())
}

/// Convenience listing helpers built on [`ObjectStore::list_pages`].
///
/// Implemented for every `ObjectStore`; do not implement it manually.
#[async_trait]
pub trait ObjectStoreListExt: ObjectStore {
    /// Flatten pages into a stream of keys.
    fn list_keys<'a>(&'a self, prefix: &str, options: ListingOptions) -> KeyStream<'a> {
        let keys = self.list_pages(prefix, options).flat_map(|page| match page {
            Ok(page) => futures::stream::iter(page.keys.into_iter().map(Ok)).boxed(),
            Err(e) => futures::stream::once(async move { Err(e) }).boxed(),
        });
        Box::pin(keys)
    }

    /// Drain the listing into memory, keeping page boundaries.
    async fn collect_pages(
        &self,
        prefix: &str,
        options: ListingOptions,
    ) -> StorageResult<Vec<ListingPage>> {
        self.list_pages(prefix, options).try_collect().await
    }

    /// Whether any object exists under `prefix`.
    async fn has_any(&self, prefix: &str) -> StorageResult<bool> {
        let mut keys = self.list_keys(prefix, ListingOptions::new(1));
        Ok(keys.try_next().await?.is_some())
    }
}

impl<T: ObjectStore + ?Sized> ObjectStoreListExt for T {}
