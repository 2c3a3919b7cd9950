//! Transfer error types.

use keyfs_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Core(#[from] keyfs_core::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Local file access failed. Always fatal to the whole operation.
    #[error("{}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} already contains objects (encode with force to write anyway)")]
    NamespaceNotEmpty(String),

    #[error("transfer task failed: {0}")]
    TaskFailed(String),
}

impl TransferError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;
