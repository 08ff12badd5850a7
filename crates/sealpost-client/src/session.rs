//! Signed-in user session.
//!
//! Glues the core components together for one local user: key setup and
//! publishing at start, conversation open with polling for peers that have
//! not signed in yet, sending, and history decryption.
//!
//! # Flow
//!
//! ```text
//! start ──> load_or_generate ──> publish_if_absent
//!
//! open_conversation(peer)
//!   select ──> derive ──┬─ Ok ─────────────> Ready
//!                       ├─ not published ──> sleep ──> derive (up to N times)
//!                       └─ other error ────> Unavailable
//!
//! send(text)   ──> encrypt (fresh nonce) ──> relay append
//! history()    ──> relay list ──> decrypt each (failures stay per message)
//! ```

use sealpost_core::{
    Completion, ConversationState, ConversationTracker, DerivationTicket, Directory, Environment,
    KeyPairManager, KeyProvenance, KeyStore, LocalKeyPair, MessageCipher, PublishOutcome,
    SessionError, SharedSecretDeriver, StoredMessage, UserId, UserProfile,
};
use sealpost_crypto::{KeyPair, PublicKeyBytes, SymmetricKey};
use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    error::ClientError,
    message::{DisplayMessage, MessageBody},
};

/// One signed-in user talking to at most one peer at a time.
pub struct Session<S: KeyStore, D: Directory, E: Environment> {
    user: UserId,
    keys: KeyPairManager<S, E>,
    local: LocalKeyPair,
    publish_outcome: PublishOutcome,
    directory: D,
    deriver: SharedSecretDeriver<D>,
    cipher: MessageCipher<E>,
    conversation: ConversationTracker,
    env: E,
    config: SessionConfig,
}

impl<S: KeyStore, D: Directory, E: Environment> Session<S, D, E> {
    /// Set up keys for `user` and publish the public half.
    ///
    /// A key store that cannot be written does not prevent sign-in; the
    /// session then runs on an ephemeral pair (see
    /// [`Session::key_provenance`]).
    ///
    /// # Errors
    ///
    /// - `Session(KeyGeneration)`: no usable key pair
    /// - `Session(Directory)`: the relay rejected the publish
    pub async fn start(
        user: UserId,
        store: S,
        directory: D,
        env: E,
        config: SessionConfig,
    ) -> Result<Self, ClientError> {
        let mut keys = KeyPairManager::new(store, env.clone());
        let local = keys.load_or_generate()?.clone();

        let publish_outcome = keys.publish_if_absent(user, &local.public_key(), &directory).await?;

        info!(
            %user,
            fingerprint = %local.public_key().fingerprint(),
            ephemeral = local.is_ephemeral(),
            published = ?publish_outcome,
            "session started"
        );

        Ok(Self {
            user,
            keys,
            local,
            publish_outcome,
            deriver: SharedSecretDeriver::new(directory.clone()),
            directory,
            cipher: MessageCipher::new(env.clone()),
            conversation: ConversationTracker::new(),
            env,
            config,
        })
    }

    /// Local user.
    pub fn user_id(&self) -> UserId {
        self.user
    }

    /// Local public key.
    pub fn public_key(&self) -> PublicKeyBytes {
        self.local.public_key()
    }

    /// Local key pair, for running derivations outside
    /// [`Session::open_conversation`].
    pub fn local_pair(&self) -> &KeyPair {
        self.local.pair()
    }

    /// Whether the key pair was loaded, generated, or is ephemeral.
    pub fn key_provenance(&self) -> &KeyProvenance {
        self.local.provenance()
    }

    /// What sign-in found in the directory for our public key.
    ///
    /// [`PublishOutcome::Mismatched`] means peers derive against a key this
    /// session does not hold, so messages sent to us will not decrypt.
    pub fn publish_outcome(&self) -> PublishOutcome {
        self.publish_outcome
    }

    /// Key store behind this session.
    pub fn key_store(&self) -> &S {
        self.keys.store()
    }

    /// Deriver for running a derivation started with
    /// [`Session::begin_open`].
    pub fn deriver(&self) -> &SharedSecretDeriver<D> {
        &self.deriver
    }

    /// State of the active conversation.
    pub fn conversation_state(&self) -> &ConversationState {
        self.conversation.state()
    }

    /// Selected peer, if any.
    pub fn active_peer(&self) -> Option<UserId> {
        self.conversation.active_peer()
    }

    /// Every registered user.
    ///
    /// # Errors
    ///
    /// - `Session(Directory)`: the relay could not be reached
    pub async fn users(&self) -> Result<Vec<UserProfile>, ClientError> {
        Ok(self.directory.list_users().await?)
    }

    /// Select `peer` without deriving.
    ///
    /// For callers that run the derivation themselves and report back through
    /// [`Session::finish_open`]. Invalidates any derivation in flight.
    pub fn begin_open(&mut self, peer: UserId) -> DerivationTicket {
        self.conversation.select(peer)
    }

    /// Report a derivation started with [`Session::begin_open`].
    pub fn finish_open(
        &mut self,
        ticket: DerivationTicket,
        result: Result<SymmetricKey, SessionError>,
    ) -> Completion {
        self.conversation.complete(ticket, result)
    }

    /// Leave the active conversation and drop its key.
    pub fn close_conversation(&mut self) {
        self.conversation.close();
    }

    /// Select `peer` and derive the conversation key.
    ///
    /// If the peer has not published a key yet, looks it up again every
    /// `poll_interval` until `max_poll_attempts` lookups have been made.
    ///
    /// # Errors
    ///
    /// - `PeerKeyTimeout`: the peer never published within the budget
    /// - `ConversationUnavailable`: invalid peer key or relay failure
    pub async fn open_conversation(&mut self, peer: UserId) -> Result<(), ClientError> {
        let ticket = self.conversation.select(peer);
        let attempts = self.config.max_poll_attempts.max(1);

        for attempt in 1..=attempts {
            let result = self.deriver.derive(self.local.pair(), peer).await;

            if self.conversation.complete(ticket, result) == Completion::Discarded {
                return Err(ClientError::Superseded { peer });
            }

            match self.conversation.state() {
                ConversationState::Ready { .. } => {
                    info!(user = %self.user, %peer, attempt, "conversation ready");
                    return Ok(());
                },
                ConversationState::Unavailable { reason, .. } => {
                    warn!(user = %self.user, %peer, %reason, "conversation unavailable");
                    return Err(ClientError::ConversationUnavailable {
                        peer,
                        reason: reason.clone(),
                    });
                },
                ConversationState::AwaitingPeerKey { .. } if attempt < attempts => {
                    debug!(user = %self.user, %peer, attempt, "peer key not published; polling");
                    self.env.sleep(self.config.poll_interval).await;
                    self.conversation.retry(&ticket);
                },
                ConversationState::AwaitingPeerKey { .. } => {},
                ConversationState::Idle | ConversationState::Deriving { .. } => {
                    return Err(ClientError::Superseded { peer });
                },
            }
        }

        warn!(user = %self.user, %peer, attempts, "gave up waiting for peer key");
        Err(ClientError::PeerKeyTimeout { peer, attempts })
    }

    /// Encrypt `text` and append it to the active conversation.
    ///
    /// # Errors
    ///
    /// - `NoConversation` / `ConversationNotReady`: no key to encrypt with
    /// - `Session(Directory)`: the relay rejected the message
    pub async fn send(&self, text: &str) -> Result<StoredMessage, ClientError> {
        let (peer, key) = self.ready_conversation()?;
        let payload = self.cipher.encrypt(text.as_bytes(), key);

        let stored = self.directory.send_message(self.user, peer, payload).await?;
        debug!(user = %self.user, %peer, creation_order = stored.creation_order, "message sent");
        Ok(stored)
    }

    /// Decrypt the active conversation, oldest first.
    ///
    /// A message that fails to decrypt is returned as
    /// [`MessageBody::Undecryptable`] and does not affect the others. Each
    /// entry carries its author's display name from the user list.
    ///
    /// # Errors
    ///
    /// - `NoConversation` / `ConversationNotReady`: no key to decrypt with
    /// - `Session(Directory)`: the relay could not be reached
    pub async fn history(&self) -> Result<Vec<DisplayMessage>, ClientError> {
        let (peer, key) = self.ready_conversation()?;
        let messages = self.directory.list_messages(self.user, peer).await?;
        let users = self.directory.list_users().await?;

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender_name = display_name(&users, message.sender);
                self.render(message, sender_name, key)
            })
            .collect())
    }

    fn render(
        &self,
        message: StoredMessage,
        sender_name: String,
        key: &SymmetricKey,
    ) -> DisplayMessage {
        let body = match self.cipher.decrypt(&message.body, key) {
            Ok(plaintext) => MessageBody::Text(String::from_utf8_lossy(&plaintext).into_owned()),
            Err(error) => {
                warn!(
                    user = %self.user,
                    creation_order = message.creation_order,
                    %error,
                    "could not decrypt message"
                );
                MessageBody::Undecryptable(error)
            },
        };

        DisplayMessage {
            sender: message.sender,
            sender_name,
            recipient: message.recipient,
            creation_order: message.creation_order,
            outgoing: message.sender == self.user,
            body,
        }
    }

    fn ready_conversation(&self) -> Result<(UserId, &SymmetricKey), ClientError> {
        let peer = self.conversation.active_peer().ok_or(ClientError::NoConversation)?;
        let key = self.conversation.key().ok_or(ClientError::ConversationNotReady { peer })?;
        Ok((peer, key))
    }
}

/// Falls back to the id when the user is not listed.
fn display_name(users: &[UserProfile], id: UserId) -> String {
    users
        .iter()
        .find(|profile| profile.id == id)
        .map_or_else(|| id.to_string(), |profile| profile.display_name.clone())
}
