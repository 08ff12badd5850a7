//! Decrypted message view.

use sealpost_core::UserId;
use sealpost_crypto::DecryptError;

/// Body of a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Decrypted text (invalid UTF-8 replaced with U+FFFD)
    Text(String),
    /// Entry could not be decrypted; siblings are unaffected
    Undecryptable(DecryptError),
}

impl MessageBody {
    /// Decrypted text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Undecryptable(_) => None,
        }
    }
}

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Author
    pub sender: UserId,
    /// Author's display name, or the id if the directory does not list them
    pub sender_name: String,
    /// Addressee
    pub recipient: UserId,
    /// Relay-assigned position
    pub creation_order: u64,
    /// Whether the local user wrote it
    pub outgoing: bool,
    /// Decrypted body or the reason it could not be decrypted
    pub body: MessageBody,
}
