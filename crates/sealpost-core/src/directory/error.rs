//! Directory error types.

use thiserror::Error;

/// Errors reported by a directory/relay backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Relay could not be reached or refused the request
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Whether retrying later may succeed.
    ///
    /// Relay outages are transient from the client's point of view; the
    /// caller decides whether to retry or surface the failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
        }
    }
}
