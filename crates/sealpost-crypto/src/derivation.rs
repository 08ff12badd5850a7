//! Shared key derivation using ECDH and HKDF

use std::fmt;

use hkdf::Hkdf;
use p256::ecdh::diffie_hellman;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{
    error::KeyError,
    keypair::{KeyPair, parse_peer_key},
};

/// Size of the derived AES-256 key (32 bytes)
const SYMMETRIC_KEY_SIZE: usize = 32;

/// A 256-bit key for AES-256-GCM, shared by both parties of a conversation.
///
/// Only usable through the payload cipher in this crate. Never persisted;
/// zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Wrap raw key material.
    ///
    /// Intended for tests and fuzzing. Production keys come from
    /// [`derive_symmetric_key`].
    pub fn from_raw(key: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn key(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.key
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        // Constant time: no early exit on the first differing byte
        self.key.iter().zip(other.key.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the conversation key from our key pair and a peer's public key.
///
/// Steps: parse the peer point, run P-256 ECDH to a 32-byte shared
/// x-coordinate, then expand it with HKDF-SHA256 using an empty salt and empty
/// info.
///
/// # Security
///
/// - Symmetric: `derive(a, B) == derive(b, A)` for key pairs (a, A), (b, B)
/// - Deterministic: same inputs always produce the same key
/// - Peer points off the curve (or the identity) are rejected before any
///   scalar multiplication
///
/// # Errors
///
/// - `InvalidPeerKey`: peer bytes are not an uncompressed P-256 point
pub fn derive_symmetric_key(local: &KeyPair, peer_public: &[u8]) -> Result<SymmetricKey, KeyError> {
    let peer = parse_peer_key(peer_public)?;

    let shared = diffie_hellman(local.secret().to_nonzero_scalar(), peer.as_affine());

    // Empty salt is equivalent to a zero-filled salt of hash length
    let hkdf = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes());

    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    let Ok(()) = hkdf.expand(&[], &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(SymmetricKey { key })
}
