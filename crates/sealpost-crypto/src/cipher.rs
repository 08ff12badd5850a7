//! Payload encryption using AES-256-GCM
//!
//! All functions are pure - the nonce must be provided by the caller.
//!
//! Wire format (no version byte):
//!
//! ```text
//! base64( nonce[12] ‖ ciphertext[n] ‖ tag[16] )
//! ```

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{derivation::SymmetricKey, error::DecryptError};

/// Size of the AES-GCM nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Smallest valid frame: nonce plus tag over an empty plaintext
pub const MIN_FRAME_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Transport-safe encrypted message body.
///
/// Holds the base64 string exactly as it travels through the relay. No
/// validation happens on construction; malformed bodies are reported by
/// [`decrypt_payload`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncryptedPayload(String);

impl EncryptedPayload {
    /// Wrap a body received from the relay.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 transport string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedPayload({} chars)", self.0.len())
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt bytes into a binary frame `nonce ‖ ciphertext ‖ tag`.
///
/// # Security
///
/// - Caller MUST supply a fresh random nonce for every call under the same
///   key; reuse breaks confidentiality of both messages
/// - No associated data is bound
pub fn seal_frame(plaintext: &[u8], key: &SymmetricKey, nonce: [u8; NONCE_SIZE]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(key.key().into());

    let Ok(ciphertext) = cipher.encrypt(&Nonce::from(nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    let mut frame = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    frame.extend_from_slice(&nonce);
    frame.extend_from_slice(&ciphertext);
    frame
}

/// Decrypt a binary frame produced by [`seal_frame`].
///
/// # Errors
///
/// - `MalformedInput`: frame shorter than nonce plus tag
/// - `AuthenticationFailed`: tag mismatch (wrong key or tampering)
pub fn open_frame(frame: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, DecryptError> {
    let too_short = || DecryptError::MalformedInput {
        reason: format!("frame is {} bytes, need at least {MIN_FRAME_SIZE}", frame.len()),
    };
    if frame.len() < MIN_FRAME_SIZE {
        return Err(too_short());
    }

    let (nonce, ciphertext) = frame.split_first_chunk::<NONCE_SIZE>().ok_or_else(too_short)?;
    let cipher = Aes256Gcm::new(key.key().into());

    cipher
        .decrypt(&Nonce::from(*nonce), ciphertext)
        .map_err(|_| DecryptError::AuthenticationFailed)
}

/// Encrypt a message body for transport.
pub fn encrypt_payload(
    plaintext: &[u8],
    key: &SymmetricKey,
    nonce: [u8; NONCE_SIZE],
) -> EncryptedPayload {
    EncryptedPayload(STANDARD.encode(seal_frame(plaintext, key, nonce)))
}

/// Decrypt a transport body.
///
/// # Errors
///
/// - `MalformedInput`: not base64, or decoded frame too short
/// - `AuthenticationFailed`: tag mismatch (wrong key or tampering)
pub fn decrypt_payload(
    payload: &EncryptedPayload,
    key: &SymmetricKey,
) -> Result<Vec<u8>, DecryptError> {
    let frame = STANDARD
        .decode(payload.as_str())
        .map_err(|e| DecryptError::MalformedInput { reason: format!("bad base64: {e}") })?;

    open_frame(&frame, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(seed: u8) -> SymmetricKey {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8);
        }
        SymmetricKey::from_raw(key)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key(0);
        let plaintext = b"Hello, World!";

        let payload = encrypt_payload(plaintext, &key, [0xAB; NONCE_SIZE]);
        let decrypted = decrypt_payload(&payload, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key(0);

        let payload = encrypt_payload(b"", &key, [0x00; NONCE_SIZE]);
        let decrypted = decrypt_payload(&payload, &key).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key(0);
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let payload = encrypt_payload(&plaintext, &key, [0xFF; NONCE_SIZE]);
        let decrypted = decrypt_payload(&payload, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn frame_layout() {
        let key = test_key(0);
        let plaintext = b"test message";
        let nonce = [0x5A; NONCE_SIZE];

        let frame = seal_frame(plaintext, &key, nonce);

        // nonce prefix, then ciphertext plus 16-byte tag
        assert_eq!(&frame[..NONCE_SIZE], &nonce);
        assert_eq!(frame.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn payload_is_base64_of_frame() {
        let key = test_key(1);
        let nonce = [0x01; NONCE_SIZE];

        let payload = encrypt_payload(b"hi", &key, nonce);
        let frame = STANDARD.decode(payload.as_str()).unwrap();

        assert_eq!(frame, seal_frame(b"hi", &key, nonce));
    }

    #[test]
    fn different_nonces_produce_different_payloads() {
        let key = test_key(0);

        let first = encrypt_payload(b"same", &key, [0x00; NONCE_SIZE]);
        let second = encrypt_payload(b"same", &key, [0xFF; NONCE_SIZE]);

        assert_ne!(first, second);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let payload = encrypt_payload(b"secret message", &test_key(0), [0x00; NONCE_SIZE]);

        let result = decrypt_payload(&payload, &test_key(1));

        assert_eq!(result, Err(DecryptError::AuthenticationFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key(0);
        let mut frame = seal_frame(b"original message", &key, [0x00; NONCE_SIZE]);

        frame[NONCE_SIZE] ^= 0x01;

        assert_eq!(open_frame(&frame, &key), Err(DecryptError::AuthenticationFailed));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let key = test_key(0);
        let mut frame = seal_frame(b"original message", &key, [0x00; NONCE_SIZE]);

        let last = frame.len() - 1;
        frame[last] ^= 0x80;

        assert_eq!(open_frame(&frame, &key), Err(DecryptError::AuthenticationFailed));
    }

    #[test]
    fn tampered_nonce_fails_decryption() {
        let key = test_key(0);
        let mut frame = seal_frame(b"original message", &key, [0x00; NONCE_SIZE]);

        frame[0] ^= 0x01;

        assert_eq!(open_frame(&frame, &key), Err(DecryptError::AuthenticationFailed));
    }

    #[test]
    fn short_frame_is_malformed() {
        let key = test_key(0);

        let result = open_frame(&[0u8; MIN_FRAME_SIZE - 1], &key);

        assert!(matches!(result, Err(DecryptError::MalformedInput { .. })));
    }

    #[test]
    fn minimum_frame_is_authenticated_not_malformed() {
        let key = test_key(0);

        let result = open_frame(&[0u8; MIN_FRAME_SIZE], &key);

        assert_eq!(result, Err(DecryptError::AuthenticationFailed));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let key = test_key(0);

        let result = decrypt_payload(&EncryptedPayload::new("%%% not base64 %%%"), &key);

        assert!(matches!(
            result,
            Err(DecryptError::MalformedInput { reason }) if reason.contains("base64")
        ));
    }

    #[test]
    fn empty_payload_is_malformed() {
        let key = test_key(0);

        let result = decrypt_payload(&EncryptedPayload::new(""), &key);

        assert!(matches!(result, Err(DecryptError::MalformedInput { .. })));
    }
}
