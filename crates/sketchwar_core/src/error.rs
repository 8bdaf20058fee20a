//! Error types for the battlefield simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for simulation setup and data loading.
///
/// Normal gameplay outcomes (blocked moves, full placement columns, missing
/// targets) are never reported through this type.
#[derive(Debug, Error)]
pub enum GameError {
    /// Requested terrain preset does not exist.
    #[error("Unknown map preset: {0}")]
    UnknownMap(String),

    /// A label does not name any unit kind.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or source name) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Why a placement request did not put a unit on the board.
///
/// These are ordinary gameplay outcomes; the board is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Every candidate cell up to the midline is taken or impassable.
    #[error("No free cell between the base and the midline")]
    NoFreeSlot,

    /// The side's reserved base cell already holds a unit.
    #[error("Base cell is already occupied")]
    BaseSlotOccupied,

    /// A base has fallen; the board must be reset first.
    #[error("Match is over")]
    MatchOver,
}
