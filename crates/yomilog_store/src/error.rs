//! Error types for record store operations.

use std::io;
use thiserror::Error;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the store's exclusive lock.
    #[error("store locked: another process has exclusive access to {path}")]
    Locked {
        /// Directory that could not be locked.
        path: String,
    },

    /// A persisted document is damaged.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// A key contains characters the medium cannot represent.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    /// Creates a locked error.
    pub fn locked(path: impl Into<String>) -> Self {
        Self::Locked { path: path.into() }
    }

    /// Creates a corrupted error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
