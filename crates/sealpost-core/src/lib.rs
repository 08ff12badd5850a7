//! Sealpost messaging core.
//!
//! Everything between the pure primitives in [`sealpost_crypto`] and a
//! running client: where the local key pair lives, how it is published, how a
//! conversation key is derived from a peer's published key, and which key is
//! active when the user switches conversations.
//!
//! # Components
//!
//! - [`KeyStore`]: durable local storage for the key pair ([`MemoryKeyStore`],
//!   [`RedbKeyStore`], [`ChaoticKeyStore`])
//! - [`KeyPairManager`]: load-or-generate, export, publish-if-absent
//! - [`SharedSecretDeriver`]: peer key lookup plus ECDH/HKDF
//! - [`MessageCipher`]: AES-256-GCM with environment-supplied nonces
//! - [`ConversationTracker`]: generation-checked ownership of the active key
//! - [`Directory`]: the relay collaborator ([`MemoryDirectory`] in process)
//! - [`Environment`]: time, sleep, and randomness ([`SystemEnv`] in
//!   production)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod conversation;
mod deriver;
pub mod directory;
pub mod env;
mod error;
mod key_manager;
pub mod keystore;
mod system_env;

pub use cipher::MessageCipher;
pub use conversation::{Completion, ConversationState, ConversationTracker, DerivationTicket};
pub use deriver::SharedSecretDeriver;
pub use directory::{
    Directory, DirectoryError, MemoryDirectory, StoredMessage, UserId, UserProfile,
};
pub use env::Environment;
pub use error::SessionError;
pub use key_manager::{
    KeyPairManager, KeyProvenance, LocalKeyPair, PublishOutcome, export_public_key,
};
pub use keystore::{
    ChaoticKeyStore, FaultScope, KeyName, KeyStore, MemoryKeyStore, RedbKeyStore, StoreError,
    StoredKey,
};
pub use system_env::SystemEnv;
