//! Headless battlefield runner for scripted matches and CI.
//!
//! This crate drives the simulation without a browser or GPU:
//!
//! - **Protocol play**: another program controls a match with JSON commands
//!   on stdin and reads state on stdout
//! - **Scenarios**: RON files fix the board, seed and placement timeline
//! - **Sweeps**: one scenario across many seeds, in parallel
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: commands (frame, place, sketch, query, reset, quit)
//! - **stdout**: responses and board state (JSON)
//! - **stderr**: logs and optional ASCII frames (human-readable)
//!
//! See the [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Play interactively
//! echo '{"cmd":"place","side":"left","kind":"tank"}' | cargo run -p sketchwar_headless -- run
//!
//! # Run a scenario with ASCII frames on stderr
//! cargo run -p sketchwar_headless -- simulate --scenario scenarios/skirmish.ron --ascii
//! ```

pub mod ascii;
pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use ascii::{render_ascii, AsciiConfig, AsciiRenderer};
pub use batch::{run_sweep, SweepConfig, SweepSummary};
pub use protocol::{Command, Response};
pub use runner::{EchoClassifier, HeadlessRunner, RunnerConfig};
pub use scenario::{load_catalog, parse_terrain, Scenario, ScenarioError, ScenarioOutcome};
