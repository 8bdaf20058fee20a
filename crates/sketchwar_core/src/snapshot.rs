//! Read-only board views and the renderer seam.
//!
//! Renderers receive a [`BattlefieldSnapshot`] once per frame. Hit points and
//! effect magnitudes are converted to `f64` here since nothing downstream
//! feeds back into the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::EffectKind;
use crate::math::Cell;
use crate::terrain::Terrain;
use crate::unit::{Side, UnitId};
use crate::unit_kind::UnitKind;

/// One occupied cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit id.
    pub id: UnitId,
    /// Unit kind.
    pub kind: UnitKind,
    /// Owning side.
    pub side: Side,
    /// Cell the unit stands in.
    pub cell: Cell,
    /// Current hit points.
    pub hp: f64,
    /// Hit points at creation.
    pub max_hp: f64,
}

impl UnitView {
    /// Remaining health in `0.0..=1.0`.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_hp > 0.0 {
            (self.hp / self.max_hp).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// One in-flight attack or heal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectView {
    /// Attack or heal.
    pub kind: EffectKind,
    /// Acting unit's cell.
    pub from: Cell,
    /// Target's cell.
    pub to: Cell,
    /// Damage dealt or hit points restored.
    pub magnitude: f64,
    /// Milliseconds since the action.
    pub age_ms: u64,
    /// Total lifetime of the effect.
    pub duration_ms: u64,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattlefieldSnapshot {
    /// Board width in cells.
    pub width: u32,
    /// Board height in cells.
    pub height: u32,
    /// Engine time of the snapshot.
    pub now_ms: u64,
    /// Ticks run so far.
    pub tick: u64,
    /// Terrain in row-major order.
    pub terrain: Vec<Terrain>,
    /// Occupied cells in row-major order.
    pub units: Vec<UnitView>,
    /// Live combat effects, oldest first.
    pub effects: Vec<EffectView>,
    /// Set once a base has fallen.
    pub winner: Option<Side>,
}

impl BattlefieldSnapshot {
    /// Terrain at `cell`, `None` off the board.
    #[must_use]
    pub fn terrain_at(&self, cell: Cell) -> Option<Terrain> {
        let (x, y) = (usize::try_from(cell.x).ok()?, usize::try_from(cell.y).ok()?);
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        self.terrain.get(y * self.width as usize + x).copied()
    }

    /// Unit standing in `cell`.
    #[must_use]
    pub fn unit_at(&self, cell: Cell) -> Option<&UnitView> {
        self.units.iter().find(|unit| unit.cell == cell)
    }

    /// A side's base.
    #[must_use]
    pub fn base(&self, side: Side) -> Option<&UnitView> {
        self.units
            .iter()
            .find(|unit| unit.kind == UnitKind::Base && unit.side == side)
    }
}

/// Error reported by a rendering surface. Never affects the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The surface could not be drawn to.
    #[error("Render surface unavailable: {0}")]
    Surface(String),
}

/// Consumer of per-frame snapshots.
pub trait Renderer {
    /// Draw one frame.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`]; callers log it and carry on.
    fn render(&mut self, snapshot: &BattlefieldSnapshot) -> Result<(), RenderError>;
}

/// Renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &BattlefieldSnapshot) -> Result<(), RenderError> {
        Ok(())
    }
}
