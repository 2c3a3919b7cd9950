//! Removing everything under a prefix.

use crate::engine::TransferKind;
use crate::error::{TransferError, TransferResult};
use crate::KeyFs;
use keyfs_core::Namespace;
use keyfs_storage::ObjectStoreListExt;

/// What a delete removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: u64,
    pub batches: u64,
}

impl KeyFs {
    /// Delete every object under `namespace`, chunk key or not.
    ///
    /// The listing is drained first; each listing page then becomes one
    /// delete batch. Batches run one at a time in listing order, whatever the
    /// engine's concurrency.
    #[tracing::instrument(skip_all, fields(namespace = %namespace))]
    pub async fn delete(&self, namespace: &Namespace) -> TransferResult<DeleteSummary> {
        let pages = self
            .store
            .collect_pages(namespace.prefix(), self.listing.clone())
            .await?;
        let batches = pages.len() as u64;
        tracing::info!(batches, "deleting");

        let report = self
            .engine
            .sequential()
            .run(
                TransferKind::Delete,
                pages.into_iter().map(|page| {
                    let store = self.store.clone();
                    async move {
                        let removed = store.delete_batch(&page.keys).await?;
                        Ok::<_, TransferError>(removed as u64)
                    }
                }),
            )
            .await;
        let deleted = report.into_result()?.into_iter().sum::<u64>();

        tracing::info!(deleted, batches, "delete complete");
        Ok(DeleteSummary { deleted, batches })
    }
}
