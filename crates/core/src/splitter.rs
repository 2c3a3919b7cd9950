//! Sequential chunk splitting.

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::plan::MAX_CHUNK_INDEX;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of chunks a source of `len` bytes produces at `chunk_size`.
pub fn expected_chunks(len: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size as u64)
}

/// Reads a source front to back in `chunk_size` blocks.
///
/// Every chunk except the last is exactly `chunk_size` bytes. An empty source
/// yields no chunks. Chunks are handed out one at a time; nothing is retained
/// once returned.
pub struct ChunkSplitter<R> {
    reader: R,
    chunk_size: usize,
    next_index: u64,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkSplitter<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            next_index: 1,
            exhausted: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read the next chunk, or `None` at end of input.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = BytesMut::zeroed(self.chunk_size);
        let mut filled = 0;
        while filled < self.chunk_size {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if self.next_index > MAX_CHUNK_INDEX {
            return Err(Error::TooManyChunks {
                max: MAX_CHUNK_INDEX,
            });
        }

        buf.truncate(filled);
        let chunk = Chunk::new(self.next_index, buf.freeze());
        self.next_index += 1;
        Ok(Some(chunk))
    }

    /// Drain the whole source into memory.
    pub async fn collect(mut self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}
