//! Test fixtures and helpers.
//!
//! Pre-built battlefields and controllers for consistent testing. Every
//! fixture uses scripted or seeded randomness so lane picks are known.

use std::sync::Arc;

use fixed::types::I32F32;
use sketchwar_core::battlefield::{Battlefield, TickReport};
use sketchwar_core::catalog::UnitCatalog;
use sketchwar_core::clock::ManualClock;
use sketchwar_core::config::BattlefieldConfig;
use sketchwar_core::match_controller::MatchController;
use sketchwar_core::math::Cell;
use sketchwar_core::random::{RandomSource, ScriptedRandom, SeededRandom};
use sketchwar_core::terrain::Terrain;
use sketchwar_core::unit::{Side, UnitId};
use sketchwar_core::unit_kind::UnitKind;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Build a battlefield, panicking on a bad config.
///
/// # Panics
///
/// Panics if `config` fails validation.
#[must_use]
pub fn battlefield(config: BattlefieldConfig, random: Box<dyn RandomSource>) -> Battlefield {
    Battlefield::new(config, Arc::new(UnitCatalog::standard()), random)
        .expect("fixture config must be valid")
}

/// Standard-size, all-plain board whose lane picks replay `picks`.
#[must_use]
pub fn open_battlefield_with(picks: impl IntoIterator<Item = usize>) -> Battlefield {
    battlefield(
        BattlefieldConfig::open(),
        Box::new(ScriptedRandom::new(picks)),
    )
}

/// Standard-size, all-plain board; every lane pick is the top lane.
#[must_use]
pub fn open_battlefield() -> Battlefield {
    open_battlefield_with([])
}

/// Board with the stock terrain and seeded randomness.
#[must_use]
pub fn stock_battlefield(seed: u64) -> Battlefield {
    battlefield(
        BattlefieldConfig::default(),
        Box::new(SeededRandom::from_seed(seed)),
    )
}

/// Spawn a unit and pin its lane row.
///
/// # Panics
///
/// Panics if the cell cannot take the unit.
pub fn spawn_on_lane(
    field: &mut Battlefield,
    kind: UnitKind,
    side: Side,
    cell: Cell,
    lane_row: i32,
) -> UnitId {
    let id = field
        .spawn_at(kind, side, cell)
        .unwrap_or_else(|| panic!("cannot spawn {kind} at {cell:?}"));
    assert!(field.assign_lane(id, lane_row), "bad lane row {lane_row}");
    id
}

/// Paint terrain onto a rectangle of cells, inclusive on both corners.
///
/// # Panics
///
/// Panics if any cell refuses the terrain.
pub fn paint(field: &mut Battlefield, from: Cell, to: Cell, terrain: Terrain) {
    for y in from.y..=to.y {
        for x in from.x..=to.x {
            let cell = Cell::new(x, y);
            assert!(field.set_terrain(cell, terrain), "cannot paint {cell:?}");
        }
    }
}

/// Tick at `first_ms`, `first_ms + step_ms`, ... `count` times.
pub fn tick_every(
    field: &mut Battlefield,
    first_ms: u64,
    step_ms: u64,
    count: usize,
) -> Vec<TickReport> {
    (0..count as u64)
        .map(|i| field.tick(first_ms + i * step_ms))
        .collect()
}

/// Controller over an open board, with a clock handle the test advances.
#[must_use]
pub fn manual_controller() -> (MatchController, ManualClock) {
    let clock = ManualClock::default();
    let controller = MatchController::new(open_battlefield(), Box::new(clock.clone()));
    (controller, clock)
}
