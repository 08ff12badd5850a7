//! Chaotic key store wrapper for fault injection testing
//!
//! Randomly fails operations so tests can check that key setup degrades to an
//! ephemeral pair instead of aborting when local storage misbehaves.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use super::{KeyName, KeyStore, StoreError, StoredKey};

/// Which operations are eligible for injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultScope {
    /// Loads, saves, and clears may all fail
    All,
    /// Only saves and clears may fail; loads always reach the inner store
    WritesOnly,
    /// Only loads may fail; saves and clears always reach the inner store
    ReadsOnly,
}

/// Chaotic key store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations based on a configured
/// failure rate. Uses Arc<Mutex<>> for the RNG state, making it Clone and
/// thread-safe.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: KeyStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    scope: FaultScope,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    injected: Arc<Mutex<usize>>,
}

/// Linear congruential generator, reproducible from its seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<S: KeyStore> ChaoticKeyStore<S> {
    /// Create a new chaotic wrapper with a fixed default seed
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x5EA1_9057_0000_0001)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            scope: FaultScope::All,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            injected: Arc::new(Mutex::new(0)),
        }
    }

    /// Restrict which operations may fail.
    #[must_use]
    pub fn with_scope(mut self, scope: FaultScope) -> Self {
        self.scope = scope;
        self
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        #[allow(clippy::expect_used)]
        *self.injected.lock().expect("injected mutex poisoned")
    }

    fn maybe_fail(&self, is_write: bool) -> Result<(), StoreError> {
        let eligible = match self.scope {
            FaultScope::All => true,
            FaultScope::WritesOnly => is_write,
            FaultScope::ReadsOnly => !is_write,
        };
        if !eligible {
            return Ok(());
        }

        #[allow(clippy::expect_used)]
        let fail =
            self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate);

        if fail {
            #[allow(clippy::expect_used)]
            let mut injected = self.injected.lock().expect("injected mutex poisoned");
            *injected += 1;
            return Err(StoreError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: KeyStore> KeyStore for ChaoticKeyStore<S> {
    fn load(&self, name: KeyName) -> Result<Option<StoredKey>, StoreError> {
        self.maybe_fail(false)?;
        self.inner.load(name)
    }

    fn save(&self, name: KeyName, key: &StoredKey) -> Result<(), StoreError> {
        self.maybe_fail(true)?;
        self.inner.save(name, key)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.maybe_fail(true)?;
        self.inner.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;

    #[test]
    fn zero_rate_never_fails() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 0.0);

        for _ in 0..100 {
            store.save(KeyName::PublicKey, &StoredKey::ecdh_p256(vec![1])).unwrap();
            store.load(KeyName::PublicKey).unwrap();
        }
        assert_eq!(store.injected_failures(), 0);
    }

    #[test]
    fn full_rate_always_fails() {
        let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0);

        assert!(matches!(store.load(KeyName::PublicKey), Err(StoreError::Io(_))));
        assert!(store.save(KeyName::PublicKey, &StoredKey::ecdh_p256(vec![1])).is_err());
        assert!(store.clear().is_err());
        assert_eq!(store.injected_failures(), 3);
        assert!(store.inner().is_empty());
    }

    #[test]
    fn writes_only_scope_lets_loads_through() {
        let inner = MemoryKeyStore::new();
        inner.save(KeyName::PrivateKey, &StoredKey::ecdh_p256(vec![5])).unwrap();
        let store = ChaoticKeyStore::new(inner, 1.0).with_scope(FaultScope::WritesOnly);

        assert!(store.load(KeyName::PrivateKey).unwrap().is_some());
        assert!(store.save(KeyName::PublicKey, &StoredKey::ecdh_p256(vec![1])).is_err());
    }

    #[test]
    fn reads_only_scope_lets_writes_through() {
        let store =
            ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0).with_scope(FaultScope::ReadsOnly);

        store.save(KeyName::PublicKey, &StoredKey::ecdh_p256(vec![1])).unwrap();

        assert!(store.load(KeyName::PublicKey).is_err());
        assert_eq!(store.inner().len(), 1);
        assert_eq!(store.injected_failures(), 1);
    }

    #[test]
    fn same_seed_same_failures() {
        let run = |seed| {
            let store = ChaoticKeyStore::with_seed(MemoryKeyStore::new(), 0.5, seed);
            (0..64).map(|_| store.load(KeyName::PublicKey).is_err()).collect::<Vec<_>>()
        };

        assert_eq!(run(42), run(42));
        let failures = run(42).into_iter().filter(|f| *f).count();
        assert!(failures > 0 && failures < 64);
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between")]
    fn rejects_out_of_range_rate() {
        let _ = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.5);
    }
}
