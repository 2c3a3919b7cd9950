//! Encode, restore and delete pipelines for keyfs.
//!
//! All three pipelines run their per-chunk work through a
//! [`TransferEngine`], which bounds concurrency, keeps results in submission
//! order and reports the first error only after every task has finished.

pub mod delete;
pub mod encode;
pub mod engine;
pub mod error;
pub mod restore;

pub use delete::DeleteSummary;
pub use encode::{EncodeOptions, EncodeSummary};
pub use engine::{Progress, ProgressFn, TransferBatch, TransferEngine, TransferKind, TransferReport};
pub use error::{TransferError, TransferResult};
pub use restore::RestoreSummary;

use keyfs_core::KeyBudget;
use keyfs_storage::{ListingOptions, ObjectStore};
use std::sync::Arc;

/// A file-in-key-names store bound to one object store backend.
#[derive(Clone)]
pub struct KeyFs {
    store: Arc<dyn ObjectStore>,
    engine: TransferEngine,
    listing: ListingOptions,
    budget: KeyBudget,
}

impl KeyFs {
    pub fn new(store: Arc<dyn ObjectStore>, engine: TransferEngine) -> Self {
        let budget = KeyBudget::new(store.max_key_length());
        Self {
            store,
            engine,
            listing: ListingOptions::default(),
            budget,
        }
    }

    /// Keys per listing page; also the size of each delete batch.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.listing = ListingOptions::new(page_size);
        self
    }

    /// Tighten the key length limit below what the backend allows.
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.budget = KeyBudget::new(max_key_length.min(self.store.max_key_length()));
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn budget(&self) -> KeyBudget {
        self.budget
    }
}

impl std::fmt::Debug for KeyFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFs")
            .field("backend", &self.store.backend_name())
            .field("engine", &self.engine)
            .field("listing", &self.listing)
            .field("budget", &self.budget)
            .finish()
    }
}
