//! P-256 key pairs and public key encoding
//!
//! Key generation is a pure function of caller-supplied entropy. Public keys
//! travel as SEC1 uncompressed points (`0x04 ‖ X ‖ Y`), optionally wrapped in
//! base64 for text transport.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use p256::{FieldBytes, PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};
use zeroize::Zeroizing;

use crate::error::KeyError;

/// Size of an uncompressed SEC1 P-256 point (65 bytes)
pub const PUBLIC_KEY_SIZE: usize = 65;

/// Size of a P-256 private scalar (32 bytes)
pub const PRIVATE_KEY_SIZE: usize = 32;

/// SEC1 tag byte for an uncompressed point
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Number of base64 characters shown by [`PublicKeyBytes::fingerprint`]
const FINGERPRINT_CHARS: usize = 12;

/// Uncompressed public key bytes, validated to lie on the curve.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_SIZE]);

impl PublicKeyBytes {
    /// Parse and validate raw public key bytes.
    ///
    /// Only the 65-byte uncompressed encoding is accepted. The point must be
    /// on the curve and must not be the identity.
    ///
    /// # Errors
    ///
    /// - `InvalidPeerKey`: wrong length, wrong tag, or not a curve point
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| KeyError::InvalidPeerKey {
            reason: format!("expected {PUBLIC_KEY_SIZE} bytes, got {}", bytes.len()),
        })?;

        if raw[0] != UNCOMPRESSED_TAG {
            return Err(KeyError::InvalidPeerKey {
                reason: format!("expected uncompressed point tag 0x04, got {:#04x}", raw[0]),
            });
        }

        // Rejects off-curve coordinates and the identity
        PublicKey::from_sec1_bytes(&raw)
            .map_err(|_| KeyError::InvalidPeerKey { reason: "point is not on P-256".to_string() })?;

        Ok(Self(raw))
    }

    /// Decode a base64 (standard alphabet, padded) public key and validate it.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| KeyError::InvalidPeerKey { reason: format!("bad base64: {e}") })?;
        Self::from_slice(&bytes)
    }

    /// Raw uncompressed point bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Base64 encoding suitable for embedding in text.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Short prefix of the base64 encoding, for logs.
    pub fn fingerprint(&self) -> String {
        let mut encoded = self.to_base64();
        encoded.truncate(FINGERPRINT_CHARS);
        encoded
    }

    fn to_public_key(self) -> Result<PublicKey, KeyError> {
        PublicKey::from_sec1_bytes(&self.0)
            .map_err(|_| KeyError::InvalidPeerKey { reason: "point is not on P-256".to_string() })
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKeyBytes").field(&self.fingerprint()).finish()
    }
}

/// A user's long-lived P-256 key pair.
///
/// The private scalar is zeroized when the pair is dropped.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKeyBytes,
}

impl KeyPair {
    /// Build a key pair from 32 bytes of caller-supplied entropy.
    ///
    /// The entropy is used directly as the private scalar. Caller MUST
    /// provide cryptographically secure random bytes in production.
    ///
    /// # Errors
    ///
    /// - `Generation`: the bytes encode zero or a value not below the curve
    ///   order
    pub fn from_entropy(entropy: &[u8; PRIVATE_KEY_SIZE]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_bytes(&FieldBytes::from(*entropy)).map_err(|_| {
            KeyError::Generation { reason: "entropy is not a valid P-256 scalar".to_string() }
        })?;

        Ok(Self::from_secret(secret))
    }

    /// Reassemble a key pair from its stored halves.
    ///
    /// # Errors
    ///
    /// - `InvalidStoredKey`: either half is malformed, or the public half does
    ///   not belong to the private half
    pub fn from_parts(public: &[u8], private: &[u8]) -> Result<Self, KeyError> {
        let scalar: &[u8; PRIVATE_KEY_SIZE] =
            private.try_into().map_err(|_| KeyError::InvalidStoredKey {
                reason: format!(
                    "private key must be {PRIVATE_KEY_SIZE} bytes, got {}",
                    private.len()
                ),
            })?;

        let secret = SecretKey::from_bytes(&FieldBytes::from(*scalar)).map_err(|_| {
            KeyError::InvalidStoredKey { reason: "private scalar out of range".to_string() }
        })?;

        let stored_public = PublicKeyBytes::from_slice(public)
            .map_err(|e| KeyError::InvalidStoredKey { reason: e.to_string() })?;

        let pair = Self::from_secret(secret);
        if pair.public != stored_public {
            return Err(KeyError::InvalidStoredKey {
                reason: "public key does not match private key".to_string(),
            });
        }

        Ok(pair)
    }

    fn from_secret(secret: SecretKey) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        let mut raw = [0u8; PUBLIC_KEY_SIZE];
        raw.copy_from_slice(point.as_bytes());
        Self { secret, public: PublicKeyBytes(raw) }
    }

    /// Public half, uncompressed.
    pub fn public_key(&self) -> PublicKeyBytes {
        self.public
    }

    /// Private scalar bytes for persistence. Zeroized when dropped.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

pub(crate) fn parse_peer_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    PublicKeyBytes::from_slice(bytes)?.to_public_key()
}
