//! Fuzz target for peer public key parsing
//!
//! Published keys come from an untrusted relay. Any byte string must either
//! parse into a valid uncompressed P-256 point or be rejected with
//! `InvalidPeerKey`; derivation must agree with parsing.
//!
//! The fuzzer should NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealpost_crypto::{KeyError, KeyPair, PUBLIC_KEY_SIZE, PublicKeyBytes, derive_symmetric_key};

fuzz_target!(|data: &[u8]| {
    let Ok(local) = KeyPair::from_entropy(&[0x11; 32]) else {
        return;
    };

    let parsed = PublicKeyBytes::from_slice(data);
    let derived = derive_symmetric_key(&local, data);

    match (&parsed, &derived) {
        (Ok(key), Ok(_)) => {
            assert_eq!(data.len(), PUBLIC_KEY_SIZE);
            assert_eq!(key.as_bytes().as_slice(), data);
        },
        (Err(KeyError::InvalidPeerKey { .. }), Err(KeyError::InvalidPeerKey { .. })) => {},
        other => panic!("parse and derive disagree: {other:?}"),
    }
});
