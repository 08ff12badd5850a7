//! Error types for key setup and conversations.
//!
//! One enum covers everything a conversation-level caller can observe. Crypto
//! errors from `sealpost-crypto` and backend errors from the key store and
//! directory are wrapped, never flattened into strings, so callers can still
//! match on the precise cause.
//!
//! Only [`SessionError::PeerKeyNotYetPublished`] is worth retrying: the peer
//! simply has not signed in yet. Everything else is either handled locally
//! (store failures fall back to an ephemeral pair) or final for the affected
//! conversation or message.

use sealpost_crypto::{DecryptError, KeyError};
use thiserror::Error;

use crate::{
    directory::{DirectoryError, UserId},
    keystore::StoreError,
};

/// Errors surfaced by key setup, key derivation, and message handling
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No usable key pair could be generated
    #[error(transparent)]
    KeyGeneration(KeyError),

    /// Local key store failure
    #[error("key store error: {0}")]
    Store(#[from] StoreError),

    /// Peer published something that is not a P-256 public key
    #[error("peer {peer} published an invalid public key: {reason}")]
    InvalidPeerKey {
        /// Owner of the bad key
        peer: UserId,
        /// Why the key was rejected
        reason: String,
    },

    /// Peer has not published a public key yet
    #[error("peer {peer} has not published a public key yet")]
    PeerKeyNotYetPublished {
        /// Peer whose key is missing
        peer: UserId,
    },

    /// A single message could not be decrypted
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    /// Relay failure
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl SessionError {
    /// Returns true if retrying the same operation later may succeed.
    ///
    /// Only a missing peer key is transient; it is polled for. Invalid peer
    /// keys and decryption failures never change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PeerKeyNotYetPublished { .. })
    }

    /// Returns true if this error leaves the session without a key pair.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyGeneration(_))
    }
}
