//! File to keys.

use crate::engine::TransferKind;
use crate::error::{TransferError, TransferResult};
use crate::KeyFs;
use bytes::Bytes;
use keyfs_core::{ChunkSplitter, KeyCodec, MAX_CHUNK_INDEX, Namespace, expected_chunks};
use keyfs_storage::ObjectStoreListExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;

/// Options for [`KeyFs::encode`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EncodeOptions {
    /// Write even if the namespace already holds objects.
    pub force: bool,
}

/// What an encode wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSummary {
    pub chunks: u64,
    pub bytes: u64,
    pub chunk_size: usize,
}

impl KeyFs {
    /// Split `source` into chunks and store each one as an empty object whose
    /// key carries the chunk.
    ///
    /// An empty source creates no objects. Upload failures do not stop the
    /// remaining uploads; the first one is returned after all have finished.
    #[tracing::instrument(skip_all, fields(namespace = %namespace, source = %source.display()))]
    pub async fn encode(
        &self,
        source: &Path,
        namespace: &Namespace,
        options: EncodeOptions,
    ) -> TransferResult<EncodeSummary> {
        let chunk_size = self.budget.plan(namespace.prefix())?;

        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| TransferError::local_io(source, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| TransferError::local_io(source, e))?
            .len();

        let total = expected_chunks(len, chunk_size);
        if total > MAX_CHUNK_INDEX {
            return Err(keyfs_core::Error::TooManyChunks {
                max: MAX_CHUNK_INDEX,
            }
            .into());
        }

        if !options.force && self.store.has_any(namespace.prefix()).await? {
            return Err(TransferError::NamespaceNotEmpty(namespace.to_string()));
        }

        tracing::info!(bytes = len, chunk_size, chunks = total, "encoding");

        let codec = Arc::new(KeyCodec::new(namespace.prefix()));
        let mut splitter = ChunkSplitter::new(BufReader::new(file), chunk_size);
        let mut batch = self.engine.batch::<()>(TransferKind::Upload, Some(total));
        let mut bytes = 0u64;

        let read_error = loop {
            match splitter.next_chunk().await {
                Ok(Some(chunk)) => {
                    bytes += chunk.len() as u64;
                    let store = self.store.clone();
                    let codec = codec.clone();
                    batch
                        .submit(async move {
                            let key = codec.encode(&chunk);
                            store.put(&key, Bytes::new()).await?;
                            Ok::<_, TransferError>(())
                        })
                        .await;
                }
                Ok(None) => break None,
                Err(err) => break Some(err),
            }
        };

        let chunks = batch.submitted() as u64;
        let report = batch.finish().await;

        if let Some(err) = read_error {
            return Err(match err {
                keyfs_core::Error::Io(io) => TransferError::local_io(source, io),
                other => other.into(),
            });
        }
        report.into_result()?;

        tracing::info!(chunks, bytes, "encode complete");
        Ok(EncodeSummary {
            chunks,
            bytes,
            chunk_size,
        })
    }
}
