#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::{KeyName, KeyStore, StoreError, StoredKey};

/// In-memory key store for tests and ephemeral sessions
///
/// Contents vanish with the process. Uses `lock().expect()`, which panics if
/// the mutex is poisoned - acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<HashMap<KeyName, StoredKey>>>,
}

impl MemoryKeyStore {
    /// Create a new empty `MemoryKeyStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (0, 1, or 2).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn load(&self, name: KeyName) -> Result<Option<StoredKey>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").get(&name).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn save(&self, name: KeyName, key: &StoredKey) -> Result<(), StoreError> {
        self.inner.lock().expect("Mutex poisoned").insert(name, key.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn clear(&self) -> Result<(), StoreError> {
        self.inner.lock().expect("Mutex poisoned").clear();
        Ok(())
    }
}
