//! Local key pair lifecycle.
//!
//! The key pair is created once per user and kept until local storage is
//! cleared. [`KeyPairManager::load_or_generate`] loads both halves from the
//! [`KeyStore`], or generates and persists a fresh pair when either half is
//! missing, fails to decode, or does not match the other.
//!
//! # Store failures
//!
//! A store failure never aborts key setup. The pair is still returned, marked
//! [`KeyProvenance::Ephemeral`], and is valid for the rest of the session:
//!
//! - failed write: the fresh pair could not be persisted; the next process
//!   start generates yet another pair
//! - failed read: the store may still hold the durable pair, so the fresh
//!   pair is never written over it; the next process start loads the
//!   durable pair again
//!
//! A published key is never overwritten, so peers keep deriving against
//! whichever key was published first.

use sealpost_crypto::{KeyPair, PRIVATE_KEY_SIZE, PublicKeyBytes};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    directory::{Directory, UserId},
    env::Environment,
    error::SessionError,
    keystore::{KeyName, KeyStore, StoreError, StoredKey},
};

/// Where the local key pair came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyProvenance {
    /// Both halves were read back from the key store
    Loaded,
    /// Freshly generated and persisted
    Generated,
    /// Freshly generated but not persisted; valid for this session only
    Ephemeral {
        /// Why persisting failed
        cause: StoreError,
    },
}

/// The local key pair together with its provenance.
#[derive(Debug, Clone)]
pub struct LocalKeyPair {
    pair: KeyPair,
    provenance: KeyProvenance,
}

impl LocalKeyPair {
    /// The key pair.
    pub fn pair(&self) -> &KeyPair {
        &self.pair
    }

    /// How the pair was obtained.
    pub fn provenance(&self) -> &KeyProvenance {
        &self.provenance
    }

    /// Public half, uncompressed.
    pub fn public_key(&self) -> PublicKeyBytes {
        self.pair.public_key()
    }

    /// True if the pair will not survive a restart.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self.provenance, KeyProvenance::Ephemeral { .. })
    }
}

/// Result of [`KeyPairManager::publish_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No key was on record; ours was inserted
    Published,
    /// Our key was already on record
    AlreadyPresent,
    /// A different key was on record and left untouched; peers derive
    /// against that key, so messages to us will not decrypt locally
    Mismatched,
}

impl PublishOutcome {
    /// True if the directory now holds our key.
    pub fn matches_local(self) -> bool {
        !matches!(self, Self::Mismatched)
    }
}

/// Raw public key bytes as published to the directory (65-byte uncompressed
/// point).
pub fn export_public_key(pair: &KeyPair) -> Vec<u8> {
    pair.public_key().as_bytes().to_vec()
}

/// What the store holds for the local key pair.
enum StoredPair {
    /// Both halves present and consistent
    Found(KeyPair),
    /// Nothing usable on record; safe to overwrite
    Absent,
    /// A read failed; the store may still hold the durable pair
    Unreadable(StoreError),
}

/// Loads, generates, and caches the local key pair.
///
/// The pair is read from the store at most once per manager; later calls
/// return the cached pair.
pub struct KeyPairManager<S: KeyStore, E: Environment> {
    store: S,
    env: E,
    cached: Option<LocalKeyPair>,
}

impl<S: KeyStore, E: Environment> KeyPairManager<S, E> {
    /// Create a manager over the given store.
    pub fn new(store: S, env: E) -> Self {
        Self { store, env, cached: None }
    }

    /// Underlying key store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached pair, if [`Self::load_or_generate`] has succeeded.
    pub fn cached(&self) -> Option<&LocalKeyPair> {
        self.cached.as_ref()
    }

    /// Return the local key pair, loading or generating it on first use.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration`: no pair was stored and the environment's entropy
    ///   did not yield a valid private scalar
    pub fn load_or_generate(&mut self) -> Result<&LocalKeyPair, SessionError> {
        let local = match self.cached.take() {
            Some(cached) => cached,
            None => match self.load_stored() {
                StoredPair::Found(pair) => {
                    info!(fingerprint = %pair.public_key().fingerprint(), "loaded key pair");
                    LocalKeyPair { pair, provenance: KeyProvenance::Loaded }
                },
                StoredPair::Absent => self.generate()?,
                StoredPair::Unreadable(cause) => self.generate_ephemeral(cause)?,
            },
        };

        Ok(self.cached.insert(local))
    }

    /// Remove both halves from the store and forget the cached pair.
    ///
    /// The next [`Self::load_or_generate`] generates a new pair.
    ///
    /// # Errors
    ///
    /// - `Store`: the backend could not remove the entries; the cache is kept
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.cached = None;
        info!("cleared local key pair");
        Ok(())
    }

    /// Publish our public key unless `owner` already has one on record.
    ///
    /// Never overwrites: the first published key wins, and a different key
    /// already on record is reported as [`PublishOutcome::Mismatched`]. Query
    /// and insert are two separate directory calls, so two devices publishing
    /// for the same owner at the same moment may both insert.
    ///
    /// # Errors
    ///
    /// - `Directory`: the relay could not be reached
    pub async fn publish_if_absent<D: Directory>(
        &self,
        owner: UserId,
        public_key: &PublicKeyBytes,
        directory: &D,
    ) -> Result<PublishOutcome, SessionError> {
        if let Some(existing) = directory.get_public_key(owner).await? {
            if existing.as_slice() == public_key.as_bytes().as_slice() {
                debug!(%owner, "public key already published");
                return Ok(PublishOutcome::AlreadyPresent);
            }

            warn!(
                %owner,
                local = %public_key.fingerprint(),
                "directory holds a different public key; keeping it"
            );
            return Ok(PublishOutcome::Mismatched);
        }

        directory.put_public_key(owner, public_key.as_bytes().to_vec()).await?;
        info!(%owner, fingerprint = %public_key.fingerprint(), "published public key");
        Ok(PublishOutcome::Published)
    }

    /// Both halves from the store, if present and consistent.
    fn load_stored(&self) -> StoredPair {
        let public = self.load_entry(KeyName::PublicKey);
        let private = self.load_entry(KeyName::PrivateKey);

        let (public, private) = match (public, private) {
            (Ok(public), Ok(private)) => (public, private),
            (Err(cause), _) | (_, Err(cause)) => return StoredPair::Unreadable(cause),
        };

        let (Some(public), Some(private)) = (public, private) else {
            return StoredPair::Absent;
        };

        match KeyPair::from_parts(&public.material, &private.material) {
            Ok(pair) => StoredPair::Found(pair),
            Err(error) => {
                warn!(%error, "stored key pair unusable; generating a new one");
                StoredPair::Absent
            },
        }
    }

    /// A record that fails to decode counts as absent. Only transient
    /// failures are reported.
    fn load_entry(&self, name: KeyName) -> Result<Option<StoredKey>, StoreError> {
        match self.store.load(name) {
            Ok(entry) => Ok(entry),
            Err(error) if error.is_transient() => Err(error),
            Err(error) => {
                warn!(%name, %error, "stored key record corrupt; treating entry as absent");
                Ok(None)
            },
        }
    }

    fn fresh_pair(&self) -> Result<KeyPair, SessionError> {
        let entropy: Zeroizing<[u8; PRIVATE_KEY_SIZE]> = Zeroizing::new(self.env.random_array());
        KeyPair::from_entropy(&entropy).map_err(SessionError::KeyGeneration)
    }

    fn generate(&self) -> Result<LocalKeyPair, SessionError> {
        let pair = self.fresh_pair()?;

        let provenance = match self.persist(&pair) {
            Ok(()) => {
                info!(fingerprint = %pair.public_key().fingerprint(), "generated key pair");
                KeyProvenance::Generated
            },
            Err(cause) => {
                warn!(
                    fingerprint = %pair.public_key().fingerprint(),
                    error = %cause,
                    "could not persist key pair; using it for this session only"
                );
                KeyProvenance::Ephemeral { cause }
            },
        };

        Ok(LocalKeyPair { pair, provenance })
    }

    /// Fresh pair that is never written, so a durable pair behind a failed
    /// read stays in place.
    fn generate_ephemeral(&self, cause: StoreError) -> Result<LocalKeyPair, SessionError> {
        let pair = self.fresh_pair()?;

        warn!(
            fingerprint = %pair.public_key().fingerprint(),
            error = %cause,
            "key store read failed; using a fresh pair for this session only"
        );

        Ok(LocalKeyPair { pair, provenance: KeyProvenance::Ephemeral { cause } })
    }

    fn persist(&self, pair: &KeyPair) -> Result<(), StoreError> {
        self.store.save(KeyName::PublicKey, &StoredKey::ecdh_p256(export_public_key(pair)))?;
        self.store.save(KeyName::PrivateKey, &StoredKey::ecdh_p256(&pair.private_key_bytes()[..]))
    }
}
