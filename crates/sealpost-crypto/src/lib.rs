//! Sealpost Cryptographic Primitives
//!
//! Cryptographic building blocks for Sealpost. Pure functions with
//! deterministic outputs. Callers provide random bytes (key entropy and
//! nonces) so every operation can be replayed in tests.
//!
//! # Key Lifecycle
//!
//! Each user owns one long-lived P-256 key pair. The public half is published
//! through the relay directory; the private half never leaves local storage.
//! Two users derive the same symmetric key from their own private key and the
//! peer's published public key.
//!
//! ```text
//! Local Private Key ──┐
//!                     ├─▶ ECDH (P-256) → raw shared secret (x-coordinate)
//! Peer Public Key ────┘          │
//!                                ▼
//!                 HKDF-SHA256 (empty salt, empty info)
//!                                │
//!                                ▼
//!                   SymmetricKey (256-bit, AEAD only)
//!                                │
//!                                ▼
//!           AES-256-GCM → base64(nonce ‖ ciphertext ‖ tag)
//! ```
//!
//! # Security
//!
//! Confidentiality and integrity:
//! - AES-256-GCM authenticates every payload; a failed tag rejects the message
//! - Nonces are 12 random bytes supplied per call and never derived from state
//!
//! Key handling:
//! - Symmetric keys and private scalars are zeroized on drop
//! - Symmetric keys expose no accessor outside this crate
//!
//! Known gaps:
//! - No forward secrecy: one static key pair per user
//! - Trust on first use: nothing here authenticates a published public key

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod derivation;
mod error;
mod keypair;

pub use cipher::{
    EncryptedPayload, MIN_FRAME_SIZE, NONCE_SIZE, TAG_SIZE, decrypt_payload, encrypt_payload,
    open_frame, seal_frame,
};
pub use derivation::{SymmetricKey, derive_symmetric_key};
pub use error::{DecryptError, KeyError};
pub use keypair::{KeyPair, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, PublicKeyBytes};
