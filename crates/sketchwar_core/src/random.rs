//! Injectable randomness.
//!
//! Lane assignment, path retry tie-breaks and terrain generation draw from a
//! [`RandomSource`] owned by the battlefield. Production code uses
//! [`SeededRandom`]; tests and scenario files use [`ScriptedRandom`] to pin
//! exact choices.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform index picks.
pub trait RandomSource: Send {
    /// Pick an index in `0..len`. `len` is always at least 1.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// ChaCha-backed randomness, seeded or drawn from OS entropy.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Deterministic stream for `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Unseeded stream.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }
}

/// Replays a fixed list of picks, then keeps returning `0`.
///
/// Each pick is reduced modulo `len`, so a script written for three lanes
/// stays valid for any list length.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    picks: VecDeque<usize>,
}

impl ScriptedRandom {
    /// Script the given picks in order.
    #[must_use]
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }

    /// Picks not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.picks.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % len.max(1)
    }
}
