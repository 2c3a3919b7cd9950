//! Key codec.
//!
//! Wire format: `<prefix><index>-<base64url-no-padding(payload)>`. The URL-safe
//! alphabet never produces `/`, so a chunk key is always a single path segment
//! directly below the prefix.

use crate::chunk::{Chunk, EncodedChunk};
use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Separates the index field from the payload field.
pub const SEPARATOR: char = '-';

/// Converts chunks to store keys under one prefix and back.
#[derive(Clone, Debug)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// The prefix is normalized with [`key_prefix`], so `"p"` and `"p//"`
    /// both produce keys under `p/`.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: key_prefix(prefix.as_ref()),
        }
    }

    /// The exact string every key produced by this codec starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the store key for a chunk.
    pub fn encode(&self, chunk: &Chunk) -> String {
        format!(
            "{}{}{SEPARATOR}{}",
            self.prefix,
            chunk.index,
            URL_SAFE_NO_PAD.encode(&chunk.payload)
        )
    }

    /// Split a listed key into index and encoded payload.
    ///
    /// Keys outside the prefix, without a separator, or with a non-numeric
    /// index field yield [`Error::MalformedKey`].
    pub fn parse(&self, key: &str) -> Result<EncodedChunk> {
        let malformed = || Error::MalformedKey(key.to_string());

        let name = key.strip_prefix(&self.prefix).ok_or_else(malformed)?;
        let name = name.strip_prefix('/').unwrap_or(name);

        let (index, encoded) = name.split_once(SEPARATOR).ok_or_else(malformed)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let index = index.parse::<u64>().map_err(|_| malformed())?;

        Ok(EncodedChunk {
            index,
            encoded: encoded.to_string(),
        })
    }

    /// Parse and decode a listed key in one step.
    pub fn decode(&self, key: &str) -> Result<Chunk> {
        self.parse(key)?.decode()
    }
}

impl EncodedChunk {
    /// Decode the payload text back into raw bytes.
    pub fn decode(&self) -> Result<Chunk> {
        let payload = URL_SAFE_NO_PAD
            .decode(&self.encoded)
            .map_err(|source| Error::PayloadDecode {
                index: self.index,
                source,
            })?;
        Ok(Chunk::new(self.index, payload))
    }
}

/// Path-style form of `prefix` as it appears in keys: empty, or ending in
/// exactly one `/`.
pub fn key_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}/")
    }
}
