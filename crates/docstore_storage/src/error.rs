//! Error types for storage backends.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors opening or persisting a file-backed store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot file could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(String),

    /// The snapshot file has an unsupported format version.
    #[error("unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version found in the file.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// Another process holds the store's lock.
    #[error("store locked: another process has exclusive access to {path:?}")]
    Locked {
        /// Path of the store file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Creates a codec error.
    pub fn codec(message: impl ToString) -> Self {
        Self::Codec(message.to_string())
    }
}
