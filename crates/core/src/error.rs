//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error(
        "prefix of {prefix_len} bytes leaves no room for chunk data in a {max_key_length}-byte key"
    )]
    Sizing {
        prefix_len: usize,
        max_key_length: usize,
    },

    /// The key does not follow the `<index>-<payload>` shape. Restore skips
    /// these instead of failing.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("failed to decode payload of chunk {index}: {source}")]
    PayloadDecode {
        index: u64,
        #[source]
        source: base64::DecodeError,
    },

    #[error("duplicate chunk index {0} under the same prefix")]
    DuplicateChunkIndex(u64),

    #[error("source needs more than {max} chunks")]
    TooManyChunks { max: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error marks a key that simply isn't ours.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, Self::MalformedKey(_))
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
