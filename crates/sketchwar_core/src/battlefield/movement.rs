//! Lane-disciplined movement with local obstacle avoidance.
//!
//! A unit far from the enemy base heads for `(enemy_base.x, lane_row)`,
//! stepping onto its lane row before advancing. Within
//! [`LANE_RELEASE_COLUMNS`] of the enemy base it heads for the base itself.
//! Only steps that strictly reduce the distance to that goal are taken; when
//! none is open the unit picks a new lane row instead of moving.

use serde::{Deserialize, Serialize};

use crate::math::{Cell, Direction};
use crate::random::RandomSource;

/// Columns from the enemy base at which units stop following their lane.
pub const LANE_RELEASE_COLUMNS: i32 = 4;

/// Rows above and below the unit searched when picking a new lane.
pub const REROUTE_SPAN: i32 = 2;

/// The three target rows assigned at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// A quarter of the way down the board.
    Top,
    /// The base row.
    Middle,
    /// Three quarters of the way down.
    Bottom,
}

impl Lane {
    /// All lanes, in pick order.
    pub const ALL: [Self; 3] = [Self::Top, Self::Middle, Self::Bottom];

    /// Row index of this lane on a board `height` rows tall.
    #[must_use]
    pub const fn row(self, height: u32) -> i32 {
        let row = match self {
            Self::Top => height / 4,
            Self::Middle => height / 2,
            Self::Bottom => height * 3 / 4,
        };
        row as i32
    }
}

/// Where a unit at `cell` is currently heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Heading {
    pub goal: Cell,
    /// Still converging on the lane rather than the base.
    pub on_lane_leg: bool,
}

pub(super) fn heading(cell: Cell, lane_row: i32, enemy_base: Cell) -> Heading {
    if (cell.x - enemy_base.x).abs() > LANE_RELEASE_COLUMNS {
        Heading {
            goal: Cell::new(enemy_base.x, lane_row),
            on_lane_leg: true,
        }
    } else {
        Heading {
            goal: enemy_base,
            on_lane_leg: false,
        }
    }
}

/// Directions to try, best first.
///
/// The preferred step is onto the lane row while on the lane leg, otherwise
/// toward the goal column. The rest follow in the order vertical toward the
/// goal, opposite vertical, lateral, and are then ranked by the distance
/// they leave to the goal.
pub(super) fn ranked_directions(cell: Cell, heading: Heading) -> Vec<Direction> {
    let dx = heading.goal.x - cell.x;
    let dy = heading.goal.y - cell.y;
    let toward_row = Direction::vertical(dy);
    let toward_column = Direction::horizontal(dx);

    let preferred = if heading.on_lane_leg {
        toward_row.or(toward_column)
    } else {
        toward_column.or(toward_row)
    }
    .unwrap_or(Direction::Right);

    let vertical = toward_row.unwrap_or(Direction::Up);
    let lateral = toward_column.unwrap_or(Direction::Right);
    let mut rest = vec![vertical, vertical.opposite(), lateral, lateral.opposite()];
    rest.retain(|dir| *dir != preferred);
    rest.sort_by_key(|dir| cell.step(*dir).distance_squared(heading.goal));

    let mut ranked = Vec::with_capacity(4);
    ranked.push(preferred);
    ranked.extend(rest);
    ranked
}

/// First open step that strictly closes on the goal.
pub(super) fn choose_step(
    cell: Cell,
    heading: Heading,
    mut can_enter: impl FnMut(Cell) -> bool,
) -> Option<Cell> {
    let current = cell.distance_squared(heading.goal);
    ranked_directions(cell, heading)
        .into_iter()
        .map(|dir| cell.step(dir))
        .find(|next| next.distance_squared(heading.goal) < current && can_enter(*next))
}

/// Pick a new lane row near `cell` for a blocked unit.
///
/// Candidate rows lie within [`REROUTE_SPAN`] of the unit, on the board and
/// off the current lane. Each is scored by the distance from one step ahead
/// on that row to the enemy base; ties are broken by `random`.
pub(super) fn reroute(
    cell: Cell,
    lane_row: i32,
    enemy_base: Cell,
    height: i32,
    random: &mut dyn RandomSource,
) -> Option<i32> {
    let ahead_x = cell.x
        + Direction::horizontal(enemy_base.x - cell.x).map_or(0, |dir| dir.delta().0);

    let scored: Vec<(i32, i32)> = (cell.y - REROUTE_SPAN..=cell.y + REROUTE_SPAN)
        .filter(|row| *row != lane_row && (0..height).contains(row))
        .map(|row| (row, Cell::new(ahead_x, row).distance_squared(enemy_base)))
        .collect();

    let best = scored.iter().map(|(_, score)| *score).min()?;
    let tied: Vec<i32> = scored
        .into_iter()
        .filter(|(_, score)| *score == best)
        .map(|(row, _)| row)
        .collect();

    let pick = if tied.len() > 1 {
        random.pick_index(tied.len())
    } else {
        0
    };
    tied.get(pick).copied()
}
