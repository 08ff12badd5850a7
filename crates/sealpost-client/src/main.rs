//! Sealpost demo binary.
//!
//! Signs two users in against an in-process relay, opens the conversation
//! from both sides, sends one message from alice, and prints bob's decrypted
//! history. Key pairs live in redb files under the data directory, so a
//! second run loads them instead of generating new ones.
//!
//! # Usage
//!
//! ```bash
//! sealpost-demo --data-dir ./sealpost-data --message "hello"
//!
//! # More detail
//! RUST_LOG=debug sealpost-demo
//! ```

use std::path::PathBuf;

use clap::Parser;
use sealpost_client::{DisplayMessage, MessageBody, Session, SessionConfig, SystemEnv};
use sealpost_core::{MemoryDirectory, RedbKeyStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealpost end-to-end encryption demo
#[derive(Parser, Debug)]
#[command(name = "sealpost-demo")]
#[command(about = "Two-user end-to-end encrypted exchange over an in-process relay")]
#[command(version)]
struct Args {
    /// Directory holding each user's key store
    #[arg(short, long, default_value = "sealpost-data")]
    data_dir: PathBuf,

    /// Message alice sends to bob
    #[arg(short, long, default_value = "hello")]
    message: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    std::fs::create_dir_all(&args.data_dir)?;
    tracing::info!("Key stores in {}", args.data_dir.display());

    let relay = MemoryDirectory::new();
    let alice_id = relay.register_user("alice");
    let bob_id = relay.register_user("bob");

    let env = SystemEnv::new();
    let config = SessionConfig::default();

    let mut alice = Session::start(
        alice_id,
        RedbKeyStore::open(args.data_dir.join("alice.redb"))?,
        relay.clone(),
        env.clone(),
        config.clone(),
    )
    .await?;
    let mut bob = Session::start(
        bob_id,
        RedbKeyStore::open(args.data_dir.join("bob.redb"))?,
        relay.clone(),
        env,
        config,
    )
    .await?;

    for session in [&alice, &bob] {
        tracing::info!(
            "{} key {} ({:?})",
            session.user_id(),
            session.public_key().fingerprint(),
            session.key_provenance()
        );
        if !session.publish_outcome().matches_local() {
            tracing::warn!(
                "{} has a different key on record; incoming messages will not decrypt",
                session.user_id()
            );
        }
    }

    alice.open_conversation(bob_id).await?;
    bob.open_conversation(alice_id).await?;

    let sent = alice.send(&args.message).await?;
    tracing::info!("Relay stored message #{}", sent.creation_order);

    for message in bob.history().await? {
        print_line(&message);
    }

    Ok(())
}

#[allow(clippy::print_stdout, reason = "Transcript is the demo's output")]
fn print_line(message: &DisplayMessage) {
    let sender = &message.sender_name;
    match &message.body {
        MessageBody::Text(text) => println!("[{}] {sender}: {text}", message.creation_order),
        MessageBody::Undecryptable(error) => {
            println!("[{}] {sender}: <{error}>", message.creation_order);
        },
    }
}
