//! Peer key lookup and shared key derivation.

use sealpost_crypto::{KeyError, KeyPair, SymmetricKey, derive_symmetric_key};
use tracing::debug;

use crate::{
    directory::{Directory, UserId},
    error::SessionError,
};

/// Fetches a peer's published key and derives the conversation key.
///
/// Stateless apart from the directory handle: the same local pair and the
/// same published peer key always yield the same [`SymmetricKey`].
#[derive(Clone)]
pub struct SharedSecretDeriver<D: Directory> {
    directory: D,
}

impl<D: Directory> SharedSecretDeriver<D> {
    /// Create a deriver that looks peer keys up in `directory`.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Derive the symmetric key shared with `peer`.
    ///
    /// # Errors
    ///
    /// - `PeerKeyNotYetPublished`: the peer has no key on record (transient)
    /// - `InvalidPeerKey`: the published bytes are not a P-256 point
    /// - `Directory`: the relay could not be reached
    pub async fn derive(&self, local: &KeyPair, peer: UserId) -> Result<SymmetricKey, SessionError> {
        let Some(peer_public) = self.directory.get_public_key(peer).await? else {
            return Err(SessionError::PeerKeyNotYetPublished { peer });
        };

        let key = derive_symmetric_key(local, &peer_public).map_err(|e| match e {
            KeyError::InvalidPeerKey { reason } => SessionError::InvalidPeerKey { peer, reason },
            other => SessionError::InvalidPeerKey { peer, reason: other.to_string() },
        })?;

        debug!(%peer, "derived conversation key");
        Ok(key)
    }
}
