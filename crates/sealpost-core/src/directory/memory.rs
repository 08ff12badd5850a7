//! In-process relay for tests and the demo binary.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::{BTreeMap, HashMap},
    future::{Future, ready},
    sync::{Arc, Mutex},
};

use sealpost_crypto::EncryptedPayload;

use super::{Directory, DirectoryError, StoredMessage, UserId, UserProfile};

/// In-memory directory with a monotonic message counter.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same underlying state, so
/// two sessions holding clones talk to the same relay.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<MemoryDirectoryInner>>,
}

#[derive(Default)]
struct MemoryDirectoryInner {
    users: BTreeMap<UserId, String>,
    public_keys: HashMap<UserId, Vec<u8>>,
    messages: Vec<StoredMessage>,
    next_user_id: u64,
    next_creation_order: u64,
    offline: bool,
}

impl MemoryDirectoryInner {
    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline {
            return Err(DirectoryError::Unavailable("relay offline".to_string()));
        }
        Ok(())
    }
}

impl MemoryDirectory {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return their new identifier.
    ///
    /// Identifiers start at 1 and are never reused.
    pub fn register_user(&self, display_name: impl Into<String>) -> UserId {
        let mut inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");

        inner.next_user_id += 1;
        let id = UserId(inner.next_user_id);
        inner.users.insert(id, display_name.into());
        id
    }

    /// Simulate a relay outage. While offline every call fails with
    /// [`DirectoryError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").offline = offline;
    }

    /// Number of published public keys.
    pub fn public_key_count(&self) -> usize {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").public_keys.len()
    }

    /// Number of messages in the log.
    pub fn message_count(&self) -> usize {
        self.inner.lock().expect("MemoryDirectory mutex poisoned").messages.len()
    }

    fn with_inner<T>(
        &self,
        f: impl FnOnce(&mut MemoryDirectoryInner) -> T,
    ) -> Result<T, DirectoryError> {
        let mut inner = self.inner.lock().expect("MemoryDirectory mutex poisoned");
        inner.check_online()?;
        Ok(f(&mut inner))
    }
}

impl Directory for MemoryDirectory {
    fn get_public_key(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, DirectoryError>> + Send {
        ready(self.with_inner(|inner| inner.public_keys.get(&owner).cloned()))
    }

    fn put_public_key(
        &self,
        owner: UserId,
        public_key: Vec<u8>,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        ready(self.with_inner(|inner| {
            inner.public_keys.insert(owner, public_key);
        }))
    }

    fn list_messages(
        &self,
        a: UserId,
        b: UserId,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, DirectoryError>> + Send {
        // The log is append-only with increasing creation order, so filtering
        // preserves ascending order.
        ready(self.with_inner(|inner| {
            inner.messages.iter().filter(|m| m.is_between(a, b)).cloned().collect()
        }))
    }

    fn send_message(
        &self,
        sender: UserId,
        recipient: UserId,
        body: EncryptedPayload,
    ) -> impl Future<Output = Result<StoredMessage, DirectoryError>> + Send {
        ready(self.with_inner(|inner| {
            inner.next_creation_order += 1;
            let message = StoredMessage {
                sender,
                recipient,
                body,
                creation_order: inner.next_creation_order,
            };
            inner.messages.push(message.clone());
            message
        }))
    }

    fn list_users(&self) -> impl Future<Output = Result<Vec<UserProfile>, DirectoryError>> + Send {
        ready(self.with_inner(|inner| {
            inner
                .users
                .iter()
                .map(|(id, name)| UserProfile { id: *id, display_name: name.clone() })
                .collect()
        }))
    }
}
