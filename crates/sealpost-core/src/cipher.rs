//! Message encryption with environment-supplied nonces.

use sealpost_crypto::{
    DecryptError, EncryptedPayload, NONCE_SIZE, SymmetricKey, decrypt_payload, encrypt_payload,
};

use crate::env::Environment;

/// Encrypts and decrypts message bodies under a conversation key.
///
/// Every call to [`MessageCipher::encrypt`] draws a fresh 12-byte nonce from
/// the environment, so identical plaintexts yield different payloads.
#[derive(Clone)]
pub struct MessageCipher<E: Environment> {
    env: E,
}

impl<E: Environment> MessageCipher<E> {
    /// Create a cipher drawing nonces from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Encrypt `plaintext` for transport.
    pub fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> EncryptedPayload {
        let nonce: [u8; NONCE_SIZE] = self.env.random_array();
        encrypt_payload(plaintext, key, nonce)
    }

    /// Decrypt a transport payload.
    ///
    /// # Errors
    ///
    /// - `MalformedInput`: not base64 or shorter than nonce plus tag
    /// - `AuthenticationFailed`: wrong key or tampered payload
    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
        key: &SymmetricKey,
    ) -> Result<Vec<u8>, DecryptError> {
        decrypt_payload(payload, key)
    }
}
