//! Active conversation state.
//!
//! Tracks which peer the user is talking to and owns that conversation's
//! symmetric key. Deriving a key suspends on the directory, and the user may
//! switch peers in the meantime. There is no cancellation: every derivation
//! carries a [`DerivationTicket`], and when it finishes the result is only
//! installed if the ticket still matches the active selection.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ select ┌──────────┐    Ok(key)    ┌───────┐
//! │ Idle │───────>│ Deriving │──────────────>│ Ready │
//! └──────┘        └──────────┘               └───────┘
//!                   │      ↑
//!     key not yet   │      │ retry
//!     published     ↓      │
//!             ┌─────────────────┐   other error   ┌─────────────┐
//!             │ AwaitingPeerKey │   (from         │ Unavailable │
//!             └─────────────────┘    Deriving)    └─────────────┘
//! ```
//!
//! `select` from any state bumps the generation and enters `Deriving`.

use sealpost_crypto::SymmetricKey;
use tracing::debug;

use crate::{directory::UserId, error::SessionError};

/// Proof of which selection a derivation was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationTicket {
    peer: UserId,
    generation: u64,
}

impl DerivationTicket {
    /// Peer the derivation targets.
    pub fn peer(&self) -> UserId {
        self.peer
    }

    /// Selection counter at the time the ticket was issued.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a finished derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result applied to the active conversation
    Installed,
    /// Ticket was superseded; result dropped
    Discarded,
}

/// Observable conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// No peer selected
    Idle,
    /// Waiting for the peer to publish a public key
    AwaitingPeerKey {
        /// Selected peer
        peer: UserId,
    },
    /// Derivation in flight
    Deriving {
        /// Selected peer
        peer: UserId,
    },
    /// Key installed; messages can be sent and read
    Ready {
        /// Selected peer
        peer: UserId,
    },
    /// Derivation failed permanently for this selection
    Unavailable {
        /// Selected peer
        peer: UserId,
        /// Why no key could be derived
        reason: String,
    },
}

/// Generation-checked owner of the active conversation key.
#[derive(Debug)]
pub struct ConversationTracker {
    generation: u64,
    state: ConversationState,
    key: Option<SymmetricKey>,
}

impl Default for ConversationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationTracker {
    /// Tracker with no peer selected.
    pub fn new() -> Self {
        Self { generation: 0, state: ConversationState::Idle, key: None }
    }

    /// Current state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Selected peer, if any.
    pub fn active_peer(&self) -> Option<UserId> {
        match &self.state {
            ConversationState::Idle => None,
            ConversationState::AwaitingPeerKey { peer }
            | ConversationState::Deriving { peer }
            | ConversationState::Ready { peer }
            | ConversationState::Unavailable { peer, .. } => Some(*peer),
        }
    }

    /// Installed key for the active peer, if ready.
    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref()
    }

    /// Switch to `peer` and start a new derivation.
    ///
    /// Drops the previous conversation key and invalidates every ticket
    /// issued before this call. Re-selecting the same peer also derives
    /// afresh.
    pub fn select(&mut self, peer: UserId) -> DerivationTicket {
        self.generation += 1;
        self.key = None;
        self.state = ConversationState::Deriving { peer };

        debug!(%peer, generation = self.generation, "selected conversation");
        DerivationTicket { peer, generation: self.generation }
    }

    /// Leave the active conversation.
    pub fn close(&mut self) {
        self.generation += 1;
        self.key = None;
        self.state = ConversationState::Idle;
    }

    /// True if `ticket` belongs to the active selection.
    pub fn is_current(&self, ticket: &DerivationTicket) -> bool {
        ticket.generation == self.generation && self.active_peer() == Some(ticket.peer)
    }

    /// Move from `AwaitingPeerKey` back to `Deriving` for another attempt.
    ///
    /// Returns false if the ticket is stale or the conversation is not
    /// waiting on the peer.
    pub fn retry(&mut self, ticket: &DerivationTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match self.state {
            ConversationState::AwaitingPeerKey { peer } => {
                self.state = ConversationState::Deriving { peer };
                true
            },
            _ => false,
        }
    }

    /// Apply a finished derivation.
    ///
    /// Stale tickets, and tickets whose derivation already completed, are
    /// discarded without touching state. A missing peer key moves the
    /// conversation to `AwaitingPeerKey`; any other error makes it
    /// `Unavailable`.
    pub fn complete(
        &mut self,
        ticket: DerivationTicket,
        result: Result<SymmetricKey, SessionError>,
    ) -> Completion {
        if !self.is_current(&ticket) || !matches!(self.state, ConversationState::Deriving { .. })
        {
            debug!(
                peer = %ticket.peer,
                generation = ticket.generation,
                current = self.generation,
                "discarding superseded derivation"
            );
            return Completion::Discarded;
        }

        let peer = ticket.peer;
        self.state = match result {
            Ok(key) => {
                self.key = Some(key);
                debug!(%peer, "conversation key installed");
                ConversationState::Ready { peer }
            },
            Err(error) if error.is_transient() => ConversationState::AwaitingPeerKey { peer },
            Err(error) => ConversationState::Unavailable { peer, reason: error.to_string() },
        };
        Completion::Installed
    }
}
