//! Chunk types.

use bytes::Bytes;
use std::fmt;

/// Anything addressed by a 1-based chunk index.
pub trait Indexed {
    fn index(&self) -> u64;
}

/// An ordered slice of a source file.
///
/// Index order is byte order: chunk `n + 1` holds the bytes immediately
/// following chunk `n`. All chunks of a file share the planned size except the
/// last, which may be shorter.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk, starting at 1.
    pub index: u64,
    /// Raw bytes.
    pub payload: Bytes,
}

/// A chunk decoded from a listed key. Listings are unordered, so these must go
/// through [`crate::order_by_index`] before reassembly.
pub type RecoveredChunk = Chunk;

impl Chunk {
    pub fn new(index: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl Indexed for Chunk {
    fn index(&self) -> u64 {
        self.index
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("index", &self.index)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// A listed key split into its index and still-encoded payload text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedChunk {
    pub index: u64,
    pub encoded: String,
}

impl Indexed for EncodedChunk {
    fn index(&self) -> u64 {
        self.index
    }
}
