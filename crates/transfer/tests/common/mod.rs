//! Instrumented object stores for pipeline tests.
//!
//! Each mock wraps a [`MemoryBackend`] and adds one observable behavior.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use keyfs_core::{KeyCodec, Namespace};
use keyfs_storage::{
    ListingOptions, ListingPage, MemoryBackend, ObjectStore, PageStream, StorageError,
    StorageResult,
};
use keyfs_transfer::{KeyFs, TransferEngine};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn namespace(location: &str) -> Namespace {
    Namespace::parse(location).unwrap()
}

/// A `KeyFs` over `store` with the given ceiling and listing page size.
pub fn keyfs(store: Arc<dyn ObjectStore>, concurrency: usize, page_size: usize) -> KeyFs {
    KeyFs::new(store, TransferEngine::new(concurrency)).with_page_size(page_size)
}

/// Deterministic, non-repeating test content.
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Tracks in-flight and peak concurrent puts, and the size of every delete
/// batch.
pub struct InstrumentedStore {
    pub inner: MemoryBackend,
    pub delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    puts: AtomicUsize,
    deletes_in_flight: AtomicUsize,
    delete_peak: AtomicUsize,
    delete_batches: Mutex<Vec<usize>>,
}

impl InstrumentedStore {
    pub fn new(max_key_length: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::with_max_key_length(max_key_length),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes_in_flight: AtomicUsize::new(0),
            delete_peak: AtomicUsize::new(0),
            delete_batches: Mutex::new(Vec::new()),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Most delete batches ever running at once.
    pub fn delete_peak(&self) -> usize {
        self.delete_peak.load(Ordering::SeqCst)
    }

    /// Batch sizes in the order the batches started.
    pub fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for InstrumentedStore {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.put(key, data).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.puts.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        self.inner.list_pages(prefix, options)
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        self.delete_batches.lock().unwrap().push(keys.len());
        let now = self.deletes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.delete_peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.delete_batch(keys).await;
        self.deletes_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn max_key_length(&self) -> usize {
        self.inner.max_key_length()
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

/// Fails the put of selected chunk indices and counts every attempt.
pub struct FailingStore {
    pub inner: MemoryBackend,
    codec: KeyCodec,
    failing: HashSet<u64>,
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new(prefix: &str, max_key_length: usize, failing: &[u64]) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::with_max_key_length(max_key_length),
            codec: KeyCodec::new(prefix),
            failing: failing.iter().copied().collect(),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let index = self.codec.parse(key).map(|chunk| chunk.index).ok();
        if let Some(index) = index
            && self.failing.contains(&index)
        {
            tokio::time::sleep(Duration::from_millis(2)).await;
            return Err(StorageError::S3(format!("injected failure for chunk {index}").into()));
        }
        self.inner.put(key, data).await
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        self.inner.list_pages(prefix, options)
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        self.inner.delete_batch(keys).await
    }

    fn max_key_length(&self) -> usize {
        self.inner.max_key_length()
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Returns every listing page with its keys reversed, and the pages
/// themselves reversed.
pub struct ShuffledListingStore {
    pub inner: MemoryBackend,
}

impl ShuffledListingStore {
    pub fn new(max_key_length: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::with_max_key_length(max_key_length),
        })
    }
}

#[async_trait]
impl ObjectStore for ShuffledListingStore {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    fn list_pages<'a>(&'a self, prefix: &str, options: ListingOptions) -> PageStream<'a> {
        let pages = self.inner.list_pages(prefix, options);
        Box::pin(async_stream::stream! {
            let mut pages = pages;
            let mut collected: Vec<ListingPage> = Vec::new();
            while let Some(page) = pages.next().await {
                match page {
                    Ok(mut page) => {
                        page.keys.reverse();
                        collected.push(page);
                    }
                    Err(err) => {
                        yield Err::<ListingPage, StorageError>(err);
                        return;
                    }
                }
            }
            collected.reverse();
            for page in collected {
                yield Ok(page);
            }
        })
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<usize> {
        self.inner.delete_batch(keys).await
    }

    fn max_key_length(&self) -> usize {
        self.inner.max_key_length()
    }

    fn backend_name(&self) -> &'static str {
        "shuffled"
    }
}
