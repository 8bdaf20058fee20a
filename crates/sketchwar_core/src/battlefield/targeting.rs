//! Target acquisition.
//!
//! The acting unit scans the whole grid in row-major order and keeps the
//! strictly nearest eligible unit within range, so equal distances resolve
//! to the candidate found first.

use crate::math::Cell;
use crate::unit::{Unit, UnitId};
use crate::unit_kind::Role;

use super::Battlefield;

/// The unit an actor will attack or heal this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Target {
    pub id: UnitId,
    pub cell: Cell,
    pub distance_squared: i32,
}

/// Whether `actor` may act on `candidate`.
///
/// Healers look for injured allies; everyone else looks for enemies,
/// bases included.
pub(super) fn is_eligible(actor: &Unit, candidate: &Unit) -> bool {
    match actor.role {
        Role::Healer => candidate.side == actor.side && candidate.is_injured(),
        Role::Combatant | Role::Static => candidate.side != actor.side,
    }
}

/// Nearest eligible unit within `actor.range` of `origin`.
pub(super) fn find_target(
    field: &Battlefield,
    actor_id: UnitId,
    origin: Cell,
    actor: &Unit,
) -> Option<Target> {
    let mut best: Option<Target> = None;

    for (cell, candidate_id, candidate) in field.occupied() {
        if candidate_id == actor_id || !is_eligible(actor, candidate) {
            continue;
        }
        if !origin.within(cell, actor.range) {
            continue;
        }
        let distance_squared = origin.distance_squared(cell);
        if best.map_or(true, |found| distance_squared < found.distance_squared) {
            best = Some(Target {
                id: candidate_id,
                cell,
                distance_squared,
            });
        }
    }

    best
}
