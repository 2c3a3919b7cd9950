//! Core domain types and shared logic for keyfs.
//!
//! keyfs stores a file inside the *names* of empty objects. This crate holds
//! the pure parts of that scheme:
//! - Namespace parsing (`s3://container/prefix/`)
//! - Key budget planning (how many raw bytes fit in one key)
//! - Sequential chunk splitting of a source stream
//! - The key codec (`<prefix><index>-<base64url(payload)>`)
//! - Ordering and reassembly of recovered chunks

pub mod chunk;
pub mod codec;
pub mod config;
pub mod error;
pub mod namespace;
pub mod plan;
pub mod reconstruct;
pub mod splitter;

pub use chunk::{Chunk, EncodedChunk, Indexed, RecoveredChunk};
pub use codec::KeyCodec;
pub use config::{ClientConfig, S3Config};
pub use error::{Error, Result};
pub use namespace::Namespace;
pub use plan::{KeyBudget, MAX_CHUNK_INDEX, RESERVED_KEY_BYTES, S3_MAX_KEY_LENGTH};
pub use reconstruct::{order_by_index, reconstruct, write_file};
pub use splitter::{ChunkSplitter, expected_chunks};
