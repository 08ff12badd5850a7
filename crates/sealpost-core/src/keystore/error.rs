//! Key store error types.
//!
//! Defines errors that can occur during key store operations:
//! - `Serialization`: Failed to encode/decode a stored key record
//! - `Io`: Underlying storage system errors (store unavailable, write failed)

use thiserror::Error;

/// Errors that can occur during key store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// True if the stored data may still be intact and a later attempt could
    /// succeed.
    ///
    /// A record that fails to decode stays corrupt; an I/O failure says
    /// nothing about what is on disk.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Serialization(_) => false,
        }
    }
}
