//! Keys to file.

use crate::engine::TransferKind;
use crate::error::{TransferError, TransferResult};
use crate::KeyFs;
use keyfs_core::{KeyCodec, Namespace, order_by_index, write_file};
use keyfs_storage::ObjectStoreListExt;
use std::path::Path;

/// What a restore read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoreSummary {
    pub chunks: u64,
    pub bytes: u64,
    /// Keys under the prefix that were not chunk keys.
    pub skipped_foreign: u64,
}

impl KeyFs {
    /// Rebuild the file stored under `namespace` into `destination`.
    ///
    /// The listing is drained completely before any decoding starts. Keys that
    /// do not look like chunk keys are skipped; chunk keys whose payload does
    /// not decode fail the restore. The destination is only created once every
    /// chunk decoded.
    #[tracing::instrument(skip_all, fields(namespace = %namespace, destination = %destination.display()))]
    pub async fn restore(
        &self,
        namespace: &Namespace,
        destination: &Path,
    ) -> TransferResult<RestoreSummary> {
        let codec = KeyCodec::new(namespace.prefix());
        let pages = self
            .store
            .collect_pages(namespace.prefix(), self.listing.clone())
            .await?;

        let mut encoded = Vec::new();
        let mut skipped_foreign = 0u64;
        for key in pages.into_iter().flat_map(|page| page.keys) {
            match codec.parse(&key) {
                Ok(chunk) => encoded.push(chunk),
                Err(err) if err.is_foreign_key() => {
                    tracing::debug!(key = %key, "skipping foreign key");
                    skipped_foreign += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        let encoded = order_by_index(encoded)?;
        tracing::info!(chunks = encoded.len(), skipped_foreign, "restoring");

        let report = self
            .engine
            .run(
                TransferKind::Download,
                encoded
                    .into_iter()
                    .map(|chunk| async move { chunk.decode().map_err(TransferError::from) }),
            )
            .await;
        let chunks = report.into_result()?;

        let bytes = write_file(destination, &chunks)
            .await
            .map_err(|e| TransferError::local_io(destination, e))?;

        tracing::info!(chunks = chunks.len(), bytes, "restore complete");
        Ok(RestoreSummary {
            chunks: chunks.len() as u64,
            bytes,
            skipped_foreign,
        })
    }
}
