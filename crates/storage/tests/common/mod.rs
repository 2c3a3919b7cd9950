#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use keyfs_storage::{
    ListingOptions, ListingPage, ObjectStore, PageStream, StorageError, StorageResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Synthesizes `total_keys` chunk-shaped keys on the fly and counts how many
/// pages were actually produced, so tests can check that listing is lazy.
pub struct CountingBackend {
    pub total_keys: usize,
    pub pages_fetched: Arc<AtomicUsize>,
}

impl CountingBackend {
    pub fn new(total_keys: usize) -> (Arc<Self>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let backend = Arc::new(Self {
            total_keys,
            pages_fetched: counter.clone(),
        });
        (backend, counter)
    }

    pub fn key(i: usize) -> String {
        format!("big/{i:07}-YQ")
    }
}

#[async_trait]
impl ObjectStore for CountingBackend {
    async fn put(&self, _key: &str, _data: Bytes) -> StorageResult<()> {
        Ok(())
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        let page_size = options.normalized_page_size();
        let prefix = prefix.to_string();
        let total_keys = self.total_keys;
        let counter = self.pages_fetched.clone();

        Box::pin(async_stream::stream! {
            let mut index = 0;
            while index < total_keys {
                let end = (index + page_size).min(total_keys);
                let keys: Vec<String> = (index..end)
                    .map(Self::key)
                    .filter(|key| key.starts_with(&prefix))
                    .collect();
                counter.fetch_add(1, Ordering::SeqCst);
                yield Ok::<_, StorageError>(ListingPage { keys });
                index = end;
            }
        })
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        Ok(keys.len())
    }

    fn max_key_length(&self) -> usize {
        1024
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}
