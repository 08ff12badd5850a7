//! Session configuration.

use std::time::Duration;

/// Default delay between polls for a peer's public key.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of lookups before giving up on a peer's public key.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 20;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between lookups while the peer has not published a key
    pub poll_interval: Duration,
    /// Total lookups per conversation open, including the first (minimum 1)
    pub max_poll_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_POLL_INTERVAL, max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS }
    }
}
