//! Seed sweeps for balance checks.
//!
//! Runs one scenario across a range of seeds in parallel using rayon and
//! tallies who won. Only seeded randomness varies between runs, so a
//! scenario with scripted lane picks and preset terrain plays out the same
//! every time.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sketchwar_core::catalog::UnitCatalog;
use sketchwar_core::snapshot::NullRenderer;
use sketchwar_core::unit::Side;

use crate::scenario::{Scenario, ScenarioError};

/// Sweep settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// First seed.
    pub seed_start: u64,
    /// Number of runs, one seed each.
    pub runs: u32,
    /// Worker threads (0 = rayon default).
    pub threads: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            seed_start: 0,
            runs: 100,
            threads: 0,
        }
    }
}

/// One run of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRun {
    /// Seed used.
    pub seed: u64,
    /// Side whose base survived, if a base fell.
    pub winner: Option<Side>,
    /// Frames run.
    pub frames: u32,
}

/// Totals across a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Scenario name.
    pub scenario: String,
    /// Runs completed.
    pub runs: u32,
    /// Runs the left side won.
    pub left_wins: u32,
    /// Runs the right side won.
    pub right_wins: u32,
    /// Runs that hit the frame limit.
    pub undecided: u32,
    /// Mean frames over decided runs.
    pub mean_frames_to_decision: Option<f64>,
    /// Per-seed results in seed order.
    pub results: Vec<SweepRun>,
}

impl SweepSummary {
    /// Tally per-seed results.
    #[must_use]
    pub fn from_runs(scenario: impl Into<String>, results: Vec<SweepRun>) -> Self {
        let wins = |side: Side| results.iter().filter(|run| run.winner == Some(side)).count() as u32;
        let left_wins = wins(Side::Left);
        let right_wins = wins(Side::Right);
        let decided = left_wins + right_wins;

        let mean_frames_to_decision = (decided > 0).then(|| {
            let total: u64 = results
                .iter()
                .filter(|run| run.winner.is_some())
                .map(|run| u64::from(run.frames))
                .sum();
            total as f64 / f64::from(decided)
        });

        Self {
            scenario: scenario.into(),
            runs: results.len() as u32,
            left_wins,
            right_wins,
            undecided: results.len() as u32 - decided,
            mean_frames_to_decision,
            results,
        }
    }

    /// Share of decided runs won by `side`.
    #[must_use]
    pub fn win_rate(&self, side: Side) -> Option<f64> {
        let decided = self.left_wins + self.right_wins;
        if decided == 0 {
            return None;
        }
        let wins = match side {
            Side::Left => self.left_wins,
            Side::Right => self.right_wins,
        };
        Some(f64::from(wins) / f64::from(decided))
    }
}

/// Run `scenario` once per seed.
///
/// # Errors
///
/// The first [`ScenarioError`]; a board that fails to build fails every
/// seed alike.
pub fn run_sweep(
    scenario: &Scenario,
    catalog: Arc<UnitCatalog>,
    config: SweepConfig,
) -> Result<SweepSummary, ScenarioError> {
    if scenario.lane_picks.is_some() {
        tracing::warn!(
            scenario = %scenario.name,
            "Scripted lane picks ignore the seed, runs may be identical"
        );
    }

    let sweep = || {
        (0..config.runs)
            .into_par_iter()
            .map(|i| -> Result<SweepRun, ScenarioError> {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                let mut run = scenario.clone();
                run.seed = seed;
                let outcome = run.run(Arc::clone(&catalog), &mut NullRenderer)?;
                tracing::debug!(
                    seed,
                    winner = ?outcome.winner,
                    frames = outcome.frames,
                    "Sweep run done"
                );
                Ok(SweepRun {
                    seed,
                    winner: outcome.winner,
                    frames: outcome.frames,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    };

    let results = if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(sweep)?,
            Err(e) => {
                tracing::warn!(%e, "Thread pool unavailable, using the global pool");
                sweep()?
            }
        }
    } else {
        sweep()?
    };

    let summary = SweepSummary::from_runs(scenario.name.clone(), results);
    tracing::info!(
        scenario = %summary.scenario,
        runs = summary.runs,
        left_wins = summary.left_wins,
        right_wins = summary.right_wins,
        undecided = summary.undecided,
        "Sweep complete"
    );
    Ok(summary)
}
