//! End-to-end session tests against the in-process relay.
//!
//! These cover the full path a user takes: sign in (key setup and publish),
//! open a conversation, send, and read history from the other side.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use rand::RngCore;
use sealpost_client::{
    ClientError, MessageBody, PublishOutcome, Session, SessionConfig, SystemEnv, UserId,
};
use sealpost_core::{
    ChaoticKeyStore, Completion, ConversationState, Directory, FaultScope, KeyProvenance,
    KeyStore, MemoryDirectory, MemoryKeyStore, RedbKeyStore,
};
use sealpost_crypto::{DecryptError, EncryptedPayload};
use tempfile::tempdir;

struct ImmediateFuture;

impl Future for ImmediateFuture {
    type Output = ();
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        Poll::Ready(())
    }
}

#[derive(Clone)]
struct TestEnv;

impl sealpost_client::Environment for TestEnv {
    type Instant = std::time::Instant;
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        ImmediateFuture
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::thread_rng().fill_bytes(buffer);
    }
}

type TestSession = Session<MemoryKeyStore, MemoryDirectory, TestEnv>;

async fn sign_in(relay: &MemoryDirectory, user: UserId) -> TestSession {
    Session::start(user, MemoryKeyStore::new(), relay.clone(), TestEnv, SessionConfig::default())
        .await
        .unwrap()
}

fn texts(history: &[sealpost_client::DisplayMessage]) -> Vec<Option<&str>> {
    history.iter().map(|m| m.body.text()).collect()
}

#[tokio::test]
async fn hello_reaches_peer() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");

    let mut alice = sign_in(&relay, alice_id).await;
    let mut bob = sign_in(&relay, bob_id).await;

    alice.open_conversation(bob_id).await.unwrap();
    bob.open_conversation(alice_id).await.unwrap();

    alice.send("hello").await.unwrap();

    let history = bob.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].body, MessageBody::Text("hello".to_string()));
    assert_eq!(history[0].sender, alice_id);
    assert_eq!(history[0].sender_name, "alice");
    assert!(!history[0].outgoing);

    let own = alice.history().await.unwrap();
    assert!(own[0].outgoing);
    assert_eq!(own[0].body.text(), Some("hello"));
}

#[tokio::test]
async fn relay_never_sees_plaintext() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let mut alice = sign_in(&relay, alice_id).await;
    let _bob = sign_in(&relay, bob_id).await;
    alice.open_conversation(bob_id).await.unwrap();

    let first = alice.send("hello").await.unwrap();
    let second = alice.send("hello").await.unwrap();

    assert!(!first.body.as_str().contains("hello"));
    assert_ne!(first.body, second.body);
}

#[tokio::test]
async fn conversation_both_directions_in_order() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let mut alice = sign_in(&relay, alice_id).await;
    let mut bob = sign_in(&relay, bob_id).await;
    alice.open_conversation(bob_id).await.unwrap();
    bob.open_conversation(alice_id).await.unwrap();

    alice.send("ping").await.unwrap();
    bob.send("pong").await.unwrap();
    alice.send("ping again").await.unwrap();

    let history = alice.history().await.unwrap();
    assert_eq!(texts(&history), vec![Some("ping"), Some("pong"), Some("ping again")]);
    assert!(history.windows(2).all(|w| w[0].creation_order < w[1].creation_order));
}

#[tokio::test]
async fn restarted_session_republishes_nothing() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let store = MemoryKeyStore::new();

    let first =
        Session::start(alice_id, store.clone(), relay.clone(), TestEnv, SessionConfig::default())
            .await
            .unwrap();
    let second = Session::start(alice_id, store, relay.clone(), TestEnv, SessionConfig::default())
        .await
        .unwrap();

    assert_eq!(first.key_provenance(), &KeyProvenance::Generated);
    assert_eq!(second.key_provenance(), &KeyProvenance::Loaded);
    assert_eq!(first.publish_outcome(), PublishOutcome::Published);
    assert_eq!(second.publish_outcome(), PublishOutcome::AlreadyPresent);
    assert_eq!(first.public_key(), second.public_key());
    assert_eq!(relay.public_key_count(), 1);
}

#[tokio::test]
async fn cleared_store_reports_mismatched_key() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let store = MemoryKeyStore::new();

    let first =
        Session::start(alice_id, store.clone(), relay.clone(), TestEnv, SessionConfig::default())
            .await
            .unwrap();
    store.clear().unwrap();
    let mut alice =
        Session::start(alice_id, store, relay.clone(), TestEnv, SessionConfig::default())
            .await
            .unwrap();

    assert_eq!(alice.key_provenance(), &KeyProvenance::Generated);
    assert_eq!(alice.publish_outcome(), PublishOutcome::Mismatched);
    assert!(!alice.publish_outcome().matches_local());
    assert_eq!(
        relay.get_public_key(alice_id).await.unwrap(),
        Some(first.public_key().as_bytes().to_vec())
    );

    // Bob derives against the key on record, which alice no longer holds
    let mut bob = sign_in(&relay, bob_id).await;
    bob.open_conversation(alice_id).await.unwrap();
    alice.open_conversation(bob_id).await.unwrap();
    bob.send("hello").await.unwrap();

    let history = alice.history().await.unwrap();
    assert_eq!(history[0].body, MessageBody::Undecryptable(DecryptError::AuthenticationFailed));
}

#[tokio::test]
async fn redb_keys_keep_old_messages_readable() {
    let dir = tempdir().unwrap();
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");

    {
        let store = RedbKeyStore::open(dir.path().join("alice.redb")).unwrap();
        let mut alice =
            Session::start(alice_id, store, relay.clone(), TestEnv, SessionConfig::default())
                .await
                .unwrap();
        let _bob = sign_in(&relay, bob_id).await;
        alice.open_conversation(bob_id).await.unwrap();
        alice.send("before restart").await.unwrap();
    }

    let store = RedbKeyStore::open(dir.path().join("alice.redb")).unwrap();
    let mut alice =
        Session::start(alice_id, store, relay.clone(), TestEnv, SessionConfig::default())
            .await
            .unwrap();
    alice.open_conversation(bob_id).await.unwrap();

    assert_eq!(alice.key_provenance(), &KeyProvenance::Loaded);
    let history = alice.history().await.unwrap();
    assert_eq!(texts(&history), vec![Some("before restart")]);
}

#[tokio::test]
async fn unwritable_store_still_signs_in() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let store = ChaoticKeyStore::new(MemoryKeyStore::new(), 1.0).with_scope(FaultScope::WritesOnly);

    let mut alice =
        Session::start(alice_id, store, relay.clone(), TestEnv, SessionConfig::default())
            .await
            .unwrap();
    let mut bob = sign_in(&relay, bob_id).await;

    assert!(matches!(alice.key_provenance(), KeyProvenance::Ephemeral { .. }));
    assert!(alice.key_store().inner().is_empty());

    alice.open_conversation(bob_id).await.unwrap();
    bob.open_conversation(alice_id).await.unwrap();
    alice.send("still works").await.unwrap();

    assert_eq!(texts(&bob.history().await.unwrap()), vec![Some("still works")]);
}

#[tokio::test]
async fn corrupted_message_does_not_hide_siblings() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let mut alice = sign_in(&relay, alice_id).await;
    let mut bob = sign_in(&relay, bob_id).await;
    alice.open_conversation(bob_id).await.unwrap();
    bob.open_conversation(alice_id).await.unwrap();

    alice.send("one").await.unwrap();
    relay.send_message(alice_id, bob_id, EncryptedPayload::new("%%% not base64")).await.unwrap();
    // Valid base64 and long enough, but not sealed under the conversation key
    relay.send_message(alice_id, bob_id, EncryptedPayload::new("A".repeat(48))).await.unwrap();
    alice.send("four").await.unwrap();

    let history = bob.history().await.unwrap();

    assert_eq!(history.len(), 4);
    assert_eq!(history[0].body.text(), Some("one"));
    assert!(matches!(
        history[1].body,
        MessageBody::Undecryptable(DecryptError::MalformedInput { .. })
    ));
    assert_eq!(history[2].body, MessageBody::Undecryptable(DecryptError::AuthenticationFailed));
    assert_eq!(history[3].body.text(), Some("four"));
}

#[tokio::test]
async fn gives_up_on_peer_that_never_publishes() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let config = SessionConfig { max_poll_attempts: 3, ..SessionConfig::default() };
    let mut alice =
        Session::start(alice_id, MemoryKeyStore::new(), relay.clone(), TestEnv, config)
            .await
            .unwrap();

    let err = alice.open_conversation(bob_id).await.unwrap_err();

    assert_eq!(err, ClientError::PeerKeyTimeout { peer: bob_id, attempts: 3 });
    assert!(err.is_transient());
    assert_eq!(alice.conversation_state(), &ConversationState::AwaitingPeerKey { peer: bob_id });
    assert!(matches!(alice.send("lost").await, Err(ClientError::ConversationNotReady { .. })));
}

#[tokio::test]
async fn polling_succeeds_once_peer_publishes() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let config = SessionConfig { poll_interval: Duration::from_millis(10), max_poll_attempts: 200 };
    let mut alice = Session::start(
        alice_id,
        MemoryKeyStore::new(),
        relay.clone(),
        SystemEnv::new(),
        config.clone(),
    )
    .await
    .unwrap();

    let late_bob = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Session::start(bob_id, MemoryKeyStore::new(), relay.clone(), SystemEnv::new(), config)
            .await
            .unwrap()
    };

    let (opened, mut bob) = tokio::join!(alice.open_conversation(bob_id), late_bob);

    opened.unwrap();
    bob.open_conversation(alice_id).await.unwrap();
    alice.send("you made it").await.unwrap();
    assert_eq!(texts(&bob.history().await.unwrap()), vec![Some("you made it")]);
}

#[tokio::test]
async fn invalid_published_key_makes_conversation_unavailable() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let mallory_id = relay.register_user("mallory");
    relay.put_public_key(mallory_id, vec![0xAB; 65]).await.unwrap();
    let mut alice = sign_in(&relay, alice_id).await;

    let err = alice.open_conversation(mallory_id).await.unwrap_err();

    assert!(matches!(err, ClientError::ConversationUnavailable { peer, .. } if peer == mallory_id));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn superseded_derivation_is_discarded() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");
    let carol_id = relay.register_user("carol");
    let mut alice = sign_in(&relay, alice_id).await;
    let _bob = sign_in(&relay, bob_id).await;
    let _carol = sign_in(&relay, carol_id).await;

    let to_bob = alice.begin_open(bob_id);
    let to_carol = alice.begin_open(carol_id);

    let bob_key = alice.deriver().derive(alice.local_pair(), bob_id).await;
    let carol_key = alice.deriver().derive(alice.local_pair(), carol_id).await;

    assert_eq!(alice.finish_open(to_bob, bob_key), Completion::Discarded);
    assert_eq!(alice.finish_open(to_carol, carol_key), Completion::Installed);
    assert_eq!(alice.active_peer(), Some(carol_id));

    let sent = alice.send("hi carol").await.unwrap();
    assert_eq!(sent.recipient, carol_id);
}

#[tokio::test]
async fn self_conversation_shows_each_message_once() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let mut alice = sign_in(&relay, alice_id).await;

    alice.open_conversation(alice_id).await.unwrap();
    alice.send("note to self").await.unwrap();

    let history = alice.history().await.unwrap();
    assert_eq!(texts(&history), vec![Some("note to self")]);
}

#[tokio::test]
async fn send_without_conversation_fails() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let alice = sign_in(&relay, alice_id).await;

    assert_eq!(alice.send("nobody").await.unwrap_err(), ClientError::NoConversation);
    assert_eq!(alice.history().await.unwrap_err(), ClientError::NoConversation);
}

#[tokio::test]
async fn relay_outage_at_sign_in_is_reported() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    relay.set_offline(true);

    let result = Session::start(
        alice_id,
        MemoryKeyStore::new(),
        relay.clone(),
        TestEnv,
        SessionConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(ClientError::Session(_))));
}

#[tokio::test]
async fn users_lists_everyone() {
    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    relay.register_user("bob");
    let alice = sign_in(&relay, alice_id).await;

    let names: Vec<_> = alice.users().await.unwrap().into_iter().map(|u| u.display_name).collect();

    assert_eq!(names, vec!["alice", "bob"]);
}
