//! Reassembly of recovered chunks.

use crate::chunk::{Indexed, RecoveredChunk};
use crate::error::{Error, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Sort by index, rejecting duplicates.
///
/// Gaps are not an error: a missing index yields a shorter file. The first
/// gap is logged so the truncation is at least visible.
pub fn order_by_index<T: Indexed>(mut items: Vec<T>) -> Result<Vec<T>> {
    items.sort_unstable_by_key(Indexed::index);

    if let Some(pair) = items.windows(2).find(|w| w[0].index() == w[1].index()) {
        return Err(Error::DuplicateChunkIndex(pair[0].index()));
    }

    let mut expected = 1;
    for item in &items {
        if item.index() > expected {
            tracing::warn!(
                missing = expected,
                next = item.index(),
                "chunk index gap, restored file will be incomplete"
            );
            break;
        }
        expected = item.index() + 1;
    }

    Ok(items)
}

/// Order recovered chunks and concatenate their payloads.
pub fn reconstruct(chunks: Vec<RecoveredChunk>) -> Result<Vec<u8>> {
    let chunks = order_by_index(chunks)?;
    let total = chunks.iter().map(|c| c.payload.len()).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in &chunks {
        out.extend_from_slice(&chunk.payload);
    }
    Ok(out)
}

/// Write already-ordered chunks to `path`, creating parent directories.
///
/// Returns the number of bytes written.
pub async fn write_file(path: &Path, ordered: &[RecoveredChunk]) -> std::io::Result<u64> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    for chunk in ordered {
        file.write_all(&chunk.payload).await?;
        written += chunk.payload.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
