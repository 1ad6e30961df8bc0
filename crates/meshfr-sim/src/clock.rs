//! Deterministic clock and nonce/randomness source (spec.md §6 `clock`),
//! grounded on `lockframe-core::env::Environment`'s async `TestEnv`
//! pattern, re-expressed synchronously: `meshfr_core::Environment` has
//! no async methods, so advancing time here is a plain method call
//! rather than a future the scheduler polls.

use meshfr_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A manually-advanced virtual clock paired with a seeded RNG, so
/// multi-node scenarios reproduce byte-for-byte given the same seed.
pub struct DeterministicEnv {
    now_ms: u64,
    nonce: u64,
    rng: ChaCha8Rng,
}

impl DeterministicEnv {
    /// A fresh clock at `t=0`, seeded for reproducible randomness.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { now_ms: 0, nonce: 0, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Advance the virtual clock by `delta_ms`.
    pub fn advance(&mut self, delta_ms: u64) {
        self.now_ms += delta_ms;
    }
}

impl Environment for DeterministicEnv {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    fn random_bytes(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}
