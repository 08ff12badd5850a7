//! Fuzz target for key setup under key store failures
//!
//! Runs `KeyPairManager` over a `ChaoticKeyStore` with arbitrary failure
//! rates, seeds, and planted garbage entries.
//!
//! # Invariants
//!
//! - Key setup NEVER panics and never fails on store errors alone
//! - A pair reported as `Loaded` matches what the store holds
//! - A pair reported as `Generated` was fully persisted
//! - Once a pair has been persisted, later runs never replace it, even when
//!   reads fail

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealpost_core::{
    ChaoticKeyStore, KeyName, KeyPairManager, KeyProvenance, KeyStore, MemoryKeyStore, StoredKey,
    SystemEnv, export_public_key,
};

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    /// Seed for ChaoticKeyStore RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Entries planted before the first run
    planted: Vec<(bool, Vec<u8>)>,
    /// Number of restarts
    restarts: u8,
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = (scenario.failure_rate_tenth % 10) as f64 / 10.0;
    let inner = MemoryKeyStore::new();

    for (is_public, material) in scenario.planted.iter().take(4) {
        let name = if *is_public { KeyName::PublicKey } else { KeyName::PrivateKey };
        let _ = inner.save(name, &StoredKey::ecdh_p256(material.clone()));
    }

    let mut persisted: Option<Vec<u8>> = None;

    for _ in 0..=(scenario.restarts % 5) {
        let store = ChaoticKeyStore::with_seed(inner.clone(), failure_rate, scenario.chaos_seed);
        let mut manager = KeyPairManager::new(store, SystemEnv::new());

        let Ok(local) = manager.load_or_generate() else {
            panic!("key setup failed on store errors alone");
        };

        let stored_public = inner.load(KeyName::PublicKey).ok().flatten();
        match local.provenance() {
            KeyProvenance::Loaded | KeyProvenance::Generated => {
                let Some(stored) = stored_public else {
                    panic!("persisted pair missing from store");
                };
                assert_eq!(stored.material, export_public_key(local.pair()));
                if let Some(earlier) = &persisted {
                    assert_eq!(&stored.material, earlier, "persisted pair was replaced");
                }
                persisted = Some(stored.material.clone());
            },
            KeyProvenance::Ephemeral { .. } => {
                if let Some(earlier) = &persisted {
                    let Some(stored) = stored_public else {
                        panic!("persisted pair removed by an ephemeral run");
                    };
                    assert_eq!(&stored.material, earlier, "ephemeral run replaced persisted pair");
                }
            },
        }
    }
});
