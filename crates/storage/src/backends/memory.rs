//! In-memory storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ListingOptions, ListingPage, ObjectStore, PageStream, validate_key};
use async_trait::async_trait;
use bytes::Bytes;
use keyfs_core::S3_MAX_KEY_LENGTH;
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::instrument;

/// Object store held in a sorted map. Listings come back in lexicographic
/// key order, like S3.
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Bytes>>,
    max_key_length: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_max_key_length(S3_MAX_KEY_LENGTH)
    }

    /// A backend that rejects keys longer than `max_key_length` bytes.
    pub fn with_max_key_length(max_key_length: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            max_key_length,
        }
    }

    /// Snapshot of every stored key.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    #[instrument(skip(self, data), fields(backend = "memory", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        validate_key(key, self.max_key_length)?;
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        let page_size = options.normalized_page_size();
        let prefix = prefix.to_string();

        Box::pin(async_stream::stream! {
            let mut after: Option<String> = None;
            loop {
                // Re-read per page so concurrent writers behave like a live store.
                let start = match &after {
                    Some(last) => Bound::Excluded(last.clone()),
                    None => Bound::Included(prefix.clone()),
                };
                let keys: Vec<String> = {
                    let objects = self.objects.read().await;
                    objects
                        .range::<String, _>((start, Bound::Unbounded))
                        .map(|(key, _)| key)
                        .take_while(|key| key.starts_with(&prefix))
                        .take(page_size + 1)
                        .cloned()
                        .collect()
                };

                let has_more = keys.len() > page_size;
                let keys: Vec<String> = keys.into_iter().take(page_size).collect();
                after = keys.last().cloned();

                if !keys.is_empty() {
                    yield Ok::<_, StorageError>(ListingPage { keys });
                }
                if !has_more {
                    break;
                }
            }
        })
    }

    #[instrument(skip(self, keys), fields(backend = "memory", count = keys.len()))]
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        let mut objects = self.objects.write().await;
        let removed = keys
            .iter()
            .filter(|key| objects.remove(key.as_str()).is_some())
            .count();
        Ok(removed)
    }

    fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
