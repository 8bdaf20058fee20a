//! # Sketchwar Core
//!
//! Battlefield simulation for a two-lane sketch battle game.
//!
//! This crate contains the simulation only:
//! - No rendering (renderers consume [`snapshot::BattlefieldSnapshot`])
//! - No IO (the classification service and clock are injected)
//! - No floating-point stats (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Per-kind stats and the counter table
//! - [`terrain`] - Terrain grid, presets and generation
//! - [`unit`] - Unit entities and the id arena
//! - [`battlefield`] - Grid, tick loop, targeting, movement, placement
//! - [`match_controller`] - Frame driving, win detection, sketch placement
//! - [`math`] - Fixed-point math and grid coordinates

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battlefield;
pub mod catalog;
pub mod classification;
pub mod clock;
pub mod config;
pub mod effects;
pub mod error;
pub mod match_controller;
pub mod math;
pub mod random;
pub mod snapshot;
pub mod terrain;
pub mod unit;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battlefield::{
        ActionTimers, BattleEvent, Battlefield, Lane, Placement, TickReport,
    };
    pub use crate::catalog::{UnitCatalog, UnitStats};
    pub use crate::classification::{
        interpret_label, ClassificationError, ClassificationRequest, Classifier,
    };
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{BattlefieldConfig, TerrainSource};
    pub use crate::effects::{CombatEffect, EffectKind};
    pub use crate::error::{GameError, PlacementError, Result};
    pub use crate::match_controller::{BaseHealth, FrameOutcome, MatchController, PlacementOutcome};
    pub use crate::math::{ratio, Cell, Direction, Fixed};
    pub use crate::random::{RandomSource, ScriptedRandom, SeededRandom};
    pub use crate::snapshot::{BattlefieldSnapshot, NullRenderer, RenderError, Renderer, UnitView};
    pub use crate::terrain::{Terrain, TerrainMap};
    pub use crate::unit::{Side, Unit, UnitArena, UnitId};
    pub use crate::unit_kind::{Role, UnitKind};
}
