//! Directory / relay collaborator
//!
//! The relay stores public-key records and the append-only encrypted message
//! log. It is untrusted for confidentiality: it only ever sees public keys and
//! [`EncryptedPayload`]s. It is trusted for key authenticity, which is a known
//! gap (a relay that substitutes a public key is not detected).

mod error;
mod memory;

use std::{fmt, future::Future};

pub use error::DirectoryError;
pub use memory::MemoryDirectory;
use sealpost_crypto::EncryptedPayload;
use serde::{Deserialize, Serialize};

/// Opaque user identifier assigned by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// A registered user as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Directory-assigned identifier
    pub id: UserId,
    /// Human-readable name
    pub display_name: String,
}

/// A message as persisted by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Author
    pub sender: UserId,
    /// Addressee
    pub recipient: UserId,
    /// Encrypted body, opaque to the relay
    pub body: EncryptedPayload,
    /// Relay-assigned position, strictly increasing across all messages
    pub creation_order: u64,
}

impl StoredMessage {
    /// Whether this message belongs to the conversation between `a` and `b`.
    ///
    /// Order of `a` and `b` does not matter.
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }
}

/// Public-key directory and message relay.
///
/// Methods return `impl Future + Send` so implementations can be backed by a
/// network client. Clones share the same underlying relay.
pub trait Directory: Clone + Send + Sync + 'static {
    /// Raw public key published by `owner`, or `None` if not yet published.
    fn get_public_key(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, DirectoryError>> + Send;

    /// Insert or replace the public key of `owner`.
    ///
    /// Upsert semantics. Clients only reach this through publish-if-absent,
    /// so a published key is never overwritten by this core.
    fn put_public_key(
        &self,
        owner: UserId,
        public_key: Vec<u8>,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// All messages between `a` and `b`, ascending by creation order.
    ///
    /// A self-conversation (`a == b`) lists each message once.
    fn list_messages(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, DirectoryError>> + Send;

    /// Append a message to the log.
    fn send_message(
        &self,
        sender: UserId,
        recipient: UserId,
        body: EncryptedPayload,
    ) -> impl Future<Output = Result<StoredMessage, DirectoryError>> + Send;

    /// Every registered user.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserProfile>, DirectoryError>> + Send;
}
