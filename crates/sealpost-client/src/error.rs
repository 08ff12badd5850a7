//! Client error types.

use sealpost_core::{DirectoryError, SessionError, UserId};
use thiserror::Error;

/// Errors surfaced to the user interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Key setup, derivation, or relay failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Send or history requested with no peer selected
    #[error("no conversation selected")]
    NoConversation,

    /// Conversation key not installed yet
    #[error("conversation with {peer} is not ready")]
    ConversationNotReady {
        /// Selected peer
        peer: UserId,
    },

    /// Peer never published a public key within the polling budget
    #[error("{peer} has not published a public key after {attempts} attempts")]
    PeerKeyTimeout {
        /// Peer that was polled
        peer: UserId,
        /// Lookups performed
        attempts: u32,
    },

    /// No key can be derived for this peer
    #[error("conversation with {peer} unavailable: {reason}")]
    ConversationUnavailable {
        /// Selected peer
        peer: UserId,
        /// Why derivation failed
        reason: String,
    },

    /// The conversation was switched while its key was being derived
    #[error("conversation with {peer} was superseded")]
    Superseded {
        /// Peer whose derivation was dropped
        peer: UserId,
    },
}

impl ClientError {
    /// Returns true if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Session(e) => e.is_transient(),
            Self::PeerKeyTimeout { .. } => true,
            Self::NoConversation
            | Self::ConversationNotReady { .. }
            | Self::ConversationUnavailable { .. }
            | Self::Superseded { .. } => false,
        }
    }
}

impl From<DirectoryError> for ClientError {
    fn from(err: DirectoryError) -> Self {
        Self::Session(SessionError::Directory(err))
    }
}
