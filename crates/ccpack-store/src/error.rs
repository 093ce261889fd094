//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No package is stored under this identity.
    #[error("chaincode package not found: {name}:{version}")]
    NotFound { name: String, version: String },

    /// The name or version cannot be used as a store key.
    #[error("invalid package key: {0}")]
    InvalidKey(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding in-process state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn not_found(name: &str, version: &str) -> Self {
        StoreError::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
