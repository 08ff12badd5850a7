//! Local key storage
//!
//! Trait-based abstraction for persisting the user's own key pair. The trait
//! is synchronous: backends are local and every call completes quickly. Each
//! call acquires its own store handle (a transaction for durable backends) and
//! releases it before returning, so concurrent callers in one process never
//! share a half-finished write.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::fmt;

pub use chaotic::{ChaoticKeyStore, FaultScope};
pub use error::StoreError;
pub use memory::MemoryKeyStore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub use self::redb::RedbKeyStore;

/// Name of a stored key entry.
///
/// The store is keyed by exactly two names, `publicKey` and `privateKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyName {
    /// Public half of the local key pair
    PublicKey,
    /// Private half of the local key pair
    PrivateKey,
}

impl KeyName {
    /// Both entry names, public first.
    pub const ALL: [Self; 2] = [Self::PublicKey, Self::PrivateKey];

    /// Entry name as persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicKey => "publicKey",
            Self::PrivateKey => "privateKey",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm a stored key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// ECDH over NIST P-256
    EcdhP256,
}

/// A persisted key: algorithm tag plus raw key material.
///
/// Public keys hold the 65-byte uncompressed point, private keys the 32-byte
/// scalar. Material is zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Algorithm the material belongs to
    pub algorithm: KeyAlgorithm,
    /// Raw key bytes
    pub material: Vec<u8>,
}

impl StoredKey {
    /// P-256 ECDH key material.
    pub fn ecdh_p256(material: impl Into<Vec<u8>>) -> Self {
        Self { algorithm: KeyAlgorithm::EcdhP256, material: material.into() }
    }
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.material.len())
            .finish()
    }
}

impl Drop for StoredKey {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

/// Durable storage for the local key pair
///
/// Must be Clone (shared between the key manager and diagnostics), Send + Sync
/// (thread-safe), and synchronous. Implementations share internal state via
/// Arc, so clones access the same underlying storage.
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Load a key entry.
    ///
    /// Returns `None` if the entry has never been written (first run) or was
    /// cleared.
    fn load(&self, name: KeyName) -> Result<Option<StoredKey>, StoreError>;

    /// Save a key entry, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Write failures are reported, never swallowed. Callers decide whether
    /// to continue with an unpersisted key.
    fn save(&self, name: KeyName, key: &StoredKey) -> Result<(), StoreError>;

    /// Remove both entries.
    ///
    /// Models the user clearing local storage. The next key setup generates a
    /// fresh pair.
    fn clear(&self) -> Result<(), StoreError>;
}
