//! Determinism testing utilities.
//!
//! The battlefield draws lane picks and reroute tie-breaks from an injected
//! [`RandomSource`](sketchwar_core::random::RandomSource). With the same seed,
//! the same placements and the same clock readings, two runs must end in the
//! same state. This harness checks that.
//!
//! Sources of divergence this catches:
//!
//! - **`HashMap` iteration order**: the tick walks the grid, never a map.
//! - **Unseeded randomness**: every draw goes through the injected source.
//! - **Float math**: stats and hit points are fixed-point.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use sketchwar_core::battlefield::Battlefield;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battlefield is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a setup/step pair several times and compare final hashes.
///
/// `step` receives the step index so callers can derive clock readings
/// from it.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for index in 0..steps {
            step(&mut state, index);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Hash of everything observable on the board: each occupied cell's unit
/// id, kind, side and exact hit points, in scan order, plus the winner.
#[must_use]
pub fn battlefield_hash(field: &Battlefield) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (cell, id, unit) in field.occupied() {
        cell.hash(&mut hasher);
        id.hash(&mut hasher);
        unit.kind.hash(&mut hasher);
        unit.side.hash(&mut hasher);
        unit.hp.to_bits().hash(&mut hasher);
        field.lane_of(id).hash(&mut hasher);
    }
    field.winner().hash(&mut hasher);
    hasher.finish()
}

/// Tick two boards built by `setup` every `frame_ms` and report the first
/// frame at which they differ.
pub fn find_first_divergence<F>(setup: F, frames: u64, frame_ms: u64) -> Option<u64>
where
    F: Fn() -> Battlefield,
{
    let mut first = setup();
    let mut second = setup();

    if battlefield_hash(&first) != battlefield_hash(&second) {
        return Some(0);
    }

    for frame in 1..=frames {
        first.tick(frame * frame_ms);
        second.tick(frame * frame_ms);
        if battlefield_hash(&first) != battlefield_hash(&second) {
            return Some(frame);
        }
    }

    None
}

/// Proptest strategies for battlefield tests.
pub mod strategies {
    use proptest::prelude::*;
    use sketchwar_core::unit::Side;
    use sketchwar_core::unit_kind::UnitKind;

    /// One scripted input to a battlefield.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum BoardAction {
        /// Place a unit near the side's base.
        Place(UnitKind, Side),
        /// Advance the clock and tick.
        Advance(u64),
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Left), Just(Side::Right)]
    }

    /// Any kind a sketch can become.
    pub fn arb_sketchable_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::SKETCHABLE.to_vec())
    }

    /// Clock advance between ticks.
    ///
    /// Range: 16 to 3000 ms (one frame up to longer than any interval)
    pub fn arb_advance() -> impl Strategy<Value = u64> {
        16u64..3000u64
    }

    /// A single board action, ticks weighted over placements.
    pub fn arb_action() -> impl Strategy<Value = BoardAction> {
        prop_oneof![
            1 => (arb_sketchable_kind(), arb_side()).prop_map(|(kind, side)| BoardAction::Place(kind, side)),
            3 => arb_advance().prop_map(BoardAction::Advance),
        ]
    }

    /// A sequence of board actions.
    pub fn arb_action_sequence(max_len: usize) -> impl Strategy<Value = Vec<BoardAction>> {
        proptest::collection::vec(arb_action(), 1..max_len)
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
