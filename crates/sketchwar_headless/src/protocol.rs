//! JSON protocol for driving a match from another process.
//!
//! One JSON object per line in each direction:
//!
//! **Input (stdin):** commands from the controlling program
//! **Output (stdout):** responses and board state
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. `frame` advances the clock and runs frames, then reports state
//! 4. When a base falls the runner emits `match_over` and the board resets
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","width":30,"height":20,"round":1}
//! -> {"cmd":"place","side":"left","kind":"tank"}
//! <- {"type":"placed","side":"left","kind":"tank","unit":3,"x":1,"y":10,"lane_row":5}
//! -> {"cmd":"sketch","side":"right","sketch":"a medic"}
//! <- {"type":"rejected","side":"right","reason":"Sketch not recognized: a medic"}
//! -> {"cmd":"frame","count":20}
//! <- {"type":"state","tick":20,...}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use sketchwar_core::snapshot::UnitView;
use sketchwar_core::unit::Side;
use sketchwar_core::unit_kind::UnitKind;

/// Protocol version announced in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands accepted by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the clock and run frames.
    Frame {
        /// Frames to run (default: 1).
        #[serde(default = "default_frame_count")]
        count: u32,
        /// Clock step per frame; the runner's default when absent.
        #[serde(default)]
        step_ms: Option<u64>,
    },

    /// Place a unit by kind name, bypassing the sketch path.
    Place {
        /// Placing side.
        side: Side,
        /// Unit kind label.
        kind: String,
    },

    /// Submit a sketch for classification and placement.
    Sketch {
        /// Drawing side.
        side: Side,
        /// Sketch payload handed to the classifier.
        sketch: String,
    },

    /// Report current state without advancing time.
    Query,

    /// Start a fresh board.
    Reset,

    /// Stop the runner.
    Quit,
}

fn default_frame_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses written by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Board width in cells.
        width: u32,
        /// Board height in cells.
        height: u32,
        /// Current round.
        round: u32,
    },

    /// Current board state.
    State {
        /// Ticks run on this board.
        tick: u64,
        /// Clock reading.
        now_ms: u64,
        /// Current round.
        round: u32,
        /// Winner of the most recent finished round.
        last_winner: Option<Side>,
        /// Base hit points per side.
        bases: Vec<BaseReadout>,
        /// Occupied cells in row-major order.
        units: Vec<UnitView>,
    },

    /// A unit was put on the board.
    Placed {
        /// Owning side.
        side: Side,
        /// Unit kind.
        kind: UnitKind,
        /// New unit id.
        unit: u32,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Assigned lane row; absent for bases.
        lane_row: Option<i32>,
    },

    /// A placement or sketch did not put a unit on the board.
    Rejected {
        /// Requesting side.
        side: Side,
        /// Human-readable reason.
        reason: String,
        /// Recognized kind, when there was one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<UnitKind>,
    },

    /// A base fell; the board has been reset for the next round.
    MatchOver {
        /// Side whose base survived.
        winner: Side,
        /// Round that ended.
        round: u32,
        /// Tick that ended it.
        tick: u64,
    },

    /// A command could not be processed.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, if it parsed.
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

/// A base's hit points in a state report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseReadout {
    /// Owning side.
    pub side: Side,
    /// Current hit points.
    pub hp: f64,
    /// Full hit points.
    pub max_hp: f64,
    /// Whole-percent health for display.
    pub percent: u32,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(width: u32, height: u32, round: u32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            width,
            height,
            round,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to a JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}","cmd":null}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for error reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Frame { .. } => "frame",
            Self::Place { .. } => "place",
            Self::Sketch { .. } => "sketch",
            Self::Query => "query",
            Self::Reset => "reset",
            Self::Quit => "quit",
        }
    }
}
