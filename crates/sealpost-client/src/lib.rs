//! Sealpost client
//!
//! Async session layer over [`sealpost_core`]. A [`Session`] signs one user
//! in (key setup and publish), opens conversations with polling for peers
//! that have not published a key yet, and sends and decrypts messages.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod message;
mod session;

pub use config::{DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, SessionConfig};
pub use error::ClientError;
pub use message::{DisplayMessage, MessageBody};
pub use sealpost_core::{Environment, PublishOutcome, SystemEnv, UserId};
pub use session::Session;
