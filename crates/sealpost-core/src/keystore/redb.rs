//! Redb-backed durable key store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Every
//! operation opens its own transaction and commits or drops it before
//! returning. Keys survive process restarts.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};

use super::{KeyName, KeyStore, StoreError, StoredKey};

/// Table: keys
/// Key: entry name (`publicKey` / `privateKey`)
/// Value: CBOR-encoded `StoredKey`
const KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("keys");

/// Durable key store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the KEYS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KEYS).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyStore for RedbKeyStore {
    fn load(&self, name: KeyName) -> Result<Option<StoredKey>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;

        let table = txn.open_table(KEYS).map_err(|e| StoreError::Io(e.to_string()))?;

        match table.get(name.as_str()).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(value) => {
                let key: StoredKey = ciborium::from_reader(value.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(key))
            },
            None => Ok(None),
        }
    }

    fn save(&self, name: KeyName, key: &StoredKey) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(key, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(KEYS).map_err(|e| StoreError::Io(e.to_string()))?;

            table
                .insert(name.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(KEYS).map_err(|e| StoreError::Io(e.to_string()))?;

            for name in KeyName::ALL {
                table.remove(name.as_str()).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}
