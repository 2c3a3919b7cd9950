//! Key budget planning.
//!
//! A key is `<prefix><index>-<payload>`. The payload is base64url without
//! padding, which spends 4 characters per 3 raw bytes, so the raw chunk size
//! is three quarters of whatever the prefix and index field leave over,
//! rounded down. Rounding up could produce keys the store refuses.

use crate::codec::key_prefix;
use crate::error::{Error, Result};

/// Maximum key length accepted by S3, in bytes.
pub const S3_MAX_KEY_LENGTH: usize = 1024;

/// Digits reserved for the chunk index.
pub const INDEX_FIELD_WIDTH: usize = 6;

/// Index digits plus the `-` separator.
pub const RESERVED_KEY_BYTES: usize = INDEX_FIELD_WIDTH + 1;

/// Largest index that fits in the reserved index field.
pub const MAX_CHUNK_INDEX: u64 = 999_999;

/// Sizes chunks so that every generated key stays within `max_key_length`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBudget {
    max_key_length: usize,
}

impl KeyBudget {
    pub fn new(max_key_length: usize) -> Self {
        Self { max_key_length }
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Maximum raw payload bytes per chunk for keys under `prefix`.
    ///
    /// The prefix is measured in the normalized form the key codec writes.
    pub fn plan(&self, prefix: &str) -> Result<usize> {
        let prefix_len = key_prefix(prefix).len();
        let sizing_error = || Error::Sizing {
            prefix_len,
            max_key_length: self.max_key_length,
        };

        let available = self
            .max_key_length
            .checked_sub(prefix_len + RESERVED_KEY_BYTES)
            .filter(|available| *available > 0)
            .ok_or_else(sizing_error)?;

        match available * 3 / 4 {
            0 => Err(sizing_error()),
            chunk_size => Ok(chunk_size),
        }
    }
}

impl Default for KeyBudget {
    fn default() -> Self {
        Self::new(S3_MAX_KEY_LENGTH)
    }
}
