//! Error types for key handling and payload decryption

use thiserror::Error;

/// Errors from key generation, key import, and key agreement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Entropy did not yield a usable private scalar
    #[error("key generation failed: {reason}")]
    Generation {
        /// Why the scalar was rejected
        reason: String,
    },

    /// Peer's published public key is not a valid P-256 point
    #[error("invalid peer public key: {reason}")]
    InvalidPeerKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Locally stored key material could not be reassembled into a key pair
    #[error("invalid stored key material: {reason}")]
    InvalidStoredKey {
        /// Why the stored material was rejected
        reason: String,
    },
}

impl KeyError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Stored key corruption is recoverable by generating a fresh pair.
    /// Generation and peer key failures are not: retrying with the same
    /// inputs gives the same answer.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Generation { .. } => true,
            Self::InvalidPeerKey { .. } => true,
            Self::InvalidStoredKey { .. } => false,
        }
    }
}

/// Errors from decrypting a single payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// Authentication tag mismatch: wrong key, tampered ciphertext, or a
    /// misaligned nonce
    #[error("decryption failed: authentication failed")]
    AuthenticationFailed,

    /// Payload is not valid transport encoding or too short to hold a nonce
    /// and tag
    #[error("decryption failed: malformed input: {reason}")]
    MalformedInput {
        /// What was wrong with the input
        reason: String,
    },
}
