/// Test data generators

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Reproducible RNG for tests that need randomness without flakiness.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Stream of `(round, sender, value-bit)` deliveries with rounds in
/// `1..=max_round` and senders in `0..max_sender`.
pub fn deliveries(max_round: i32, max_sender: i32) -> impl Strategy<Value = Vec<(i32, i32, bool)>> {
    prop::collection::vec((1..=max_round, 0..max_sender, any::<bool>()), 0..64)
}
