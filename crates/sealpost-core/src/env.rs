//! Environment abstraction for deterministic testing.
//!
//! Decouples key setup and conversation logic from system resources (time,
//! randomness). Tests plug in fixed or seeded randomness and instant sleeps;
//! production uses [`crate::SystemEnv`].

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only used between polls for a peer's public key.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Uses cryptographically secure RNG in production
    /// - Every call yields fresh bytes (nonces depend on this)
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Fixed-size array of random bytes.
    ///
    /// Convenience for nonces and key entropy.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}
