//! Fuzz target for payload decryption
//!
//! Feeds arbitrary bytes through both decode layers:
//! - `decrypt_payload` on the bytes interpreted as transport text
//! - `open_frame` on the raw bytes as a decoded frame
//!
//! The fuzzer should NEVER panic. Garbage must come back as
//! `MalformedInput` or `AuthenticationFailed`, never as plaintext.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_crypto::{
    DecryptError, EncryptedPayload, MIN_FRAME_SIZE, SymmetricKey, decrypt_payload, open_frame,
};

fuzz_target!(|data: &[u8]| {
    let key = SymmetricKey::from_raw([0x42; 32]);

    let text = String::from_utf8_lossy(data);
    assert!(decrypt_payload(&EncryptedPayload::new(text), &key).is_err());

    match open_frame(data, &key) {
        Ok(_) => panic!("forged frame authenticated"),
        Err(DecryptError::MalformedInput { .. }) => assert!(data.len() < MIN_FRAME_SIZE),
        Err(DecryptError::AuthenticationFailed) => assert!(data.len() >= MIN_FRAME_SIZE),
    }
});
