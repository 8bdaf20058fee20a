//! Placing units on the board.
//!
//! New units start in the column next to their base and fill outward: the
//! base row, then one row above, then one row below, then the next column.
//! The search never crosses the midline.

use crate::error::PlacementError;
use crate::math::Cell;
use crate::unit::{Side, Unit, UnitId};
use crate::unit_kind::UnitKind;

use super::{Battlefield, Lane};

/// A successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// New unit.
    pub id: UnitId,
    /// Cell it was put in.
    pub cell: Cell,
    /// Lane row assigned, `None` for bases.
    pub lane_row: Option<i32>,
}

/// Row offsets tried in each column, relative to the base row.
const ROW_OFFSETS: [i32; 3] = [0, -1, 1];

impl Battlefield {
    /// Place a new unit of `kind` for `side` near its base.
    ///
    /// A random lane is assigned on success. Placing a base delegates to
    /// [`place_base`](Self::place_base).
    ///
    /// # Errors
    ///
    /// [`PlacementError::NoFreeSlot`] when every candidate cell up to the
    /// midline is taken or impassable for `kind`, and
    /// [`PlacementError::MatchOver`] after a base has fallen. The board is
    /// unchanged on error.
    pub fn place_unit(&mut self, kind: UnitKind, side: Side) -> Result<Placement, PlacementError> {
        if self.is_over() {
            return Err(PlacementError::MatchOver);
        }
        if kind == UnitKind::Base {
            return self.place_base(side);
        }

        let cell = self
            .placement_columns(side)
            .flat_map(|x| {
                let row = self.base_cell(side).y;
                ROW_OFFSETS.map(|dy| Cell::new(x, row + dy))
            })
            .find(|cell| self.can_enter(kind, *cell))
            .ok_or(PlacementError::NoFreeSlot)?;

        let unit = Unit::from_catalog(&self.catalog, kind, side);
        let id = self.spawn(unit, cell).ok_or(PlacementError::NoFreeSlot)?;
        let lane_row = self.assign_random_lane(id);
        tracing::debug!(unit = %id, %kind, %side, ?cell, lane_row, "Unit placed");

        Ok(Placement {
            id,
            cell,
            lane_row: Some(lane_row),
        })
    }

    /// Place `side`'s base on its reserved cell.
    ///
    /// # Errors
    ///
    /// [`PlacementError::BaseSlotOccupied`] if the cell is taken, and
    /// [`PlacementError::MatchOver`] after a base has fallen.
    pub fn place_base(&mut self, side: Side) -> Result<Placement, PlacementError> {
        if self.is_over() {
            return Err(PlacementError::MatchOver);
        }
        let cell = self.base_cell(side);
        if self.occupant(cell).is_some() {
            return Err(PlacementError::BaseSlotOccupied);
        }

        let unit = Unit::from_catalog(&self.catalog, UnitKind::Base, side);
        let id = self
            .spawn(unit, cell)
            .ok_or(PlacementError::BaseSlotOccupied)?;
        tracing::debug!(unit = %id, %side, ?cell, "Base placed");

        Ok(Placement {
            id,
            cell,
            lane_row: None,
        })
    }

    /// Put a unit in an exact cell, for scenarios and tests.
    ///
    /// Bases may only go on their own reserved cell and other units never
    /// on a base cell. Returns `None` if the cell is off the board, taken,
    /// impassable for `kind`, or the match is over.
    pub fn spawn_at(&mut self, kind: UnitKind, side: Side, cell: Cell) -> Option<UnitId> {
        if self.is_over() || !self.terrain.contains(cell) || self.occupant(cell).is_some() {
            return None;
        }
        if !self.terrain.passable(kind, cell) {
            return None;
        }

        if kind == UnitKind::Base {
            if cell != self.base_cell(side) {
                return None;
            }
            return self.spawn(Unit::from_catalog(&self.catalog, kind, side), cell);
        }
        if self.is_base_cell(cell) {
            return None;
        }

        let id = self.spawn(Unit::from_catalog(&self.catalog, kind, side), cell)?;
        self.assign_random_lane(id);
        Some(id)
    }

    fn assign_random_lane(&mut self, id: UnitId) -> i32 {
        let pick = self.random.pick_index(Lane::ALL.len());
        let lane = Lane::ALL.get(pick).copied().unwrap_or(Lane::Middle);
        let row = lane.row(self.config.height);
        self.lanes.insert(id, row);
        row
    }

    /// Columns searched for `side`, nearest the base first, stopping short
    /// of the other half of the board.
    fn placement_columns(&self, side: Side) -> Box<dyn Iterator<Item = i32>> {
        let width = self.config.width as i32;
        let midline = width / 2;
        match side {
            Side::Left => Box::new(1..midline),
            Side::Right => Box::new((midline..width - 1).rev()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::UnitCatalog;
    use crate::config::BattlefieldConfig;
    use crate::random::ScriptedRandom;
    use crate::terrain::Terrain;

    fn field_with(random: ScriptedRandom) -> Battlefield {
        Battlefield::new(
            BattlefieldConfig::open(),
            Arc::new(UnitCatalog::standard()),
            Box::new(random),
        )
        .unwrap()
    }

    #[test]
    fn test_first_placement_is_next_to_base() {
        let mut field = field_with(ScriptedRandom::new([2]));
        let placed = field.place_unit(UnitKind::Soldier, Side::Left).unwrap();
        assert_eq!(placed.cell, Cell::new(1, 10));
        assert_eq!(placed.lane_row, Some(15));
        assert_eq!(field.lane_of(placed.id), Some(15));

        let placed = field.place_unit(UnitKind::Tank, Side::Right).unwrap();
        assert_eq!(placed.cell, Cell::new(28, 10));
        assert_eq!(placed.lane_row, Some(5));
    }

    #[test]
    fn test_placement_fills_above_then_below_then_next_column() {
        let mut field = field_with(ScriptedRandom::default());
        let cells: Vec<Cell> = (0..4)
            .map(|_| field.place_unit(UnitKind::Soldier, Side::Left).unwrap().cell)
            .collect();
        assert_eq!(
            cells,
            vec![
                Cell::new(1, 10),
                Cell::new(1, 9),
                Cell::new(1, 11),
                Cell::new(2, 10),
            ]
        );
    }

    #[test]
    fn test_placement_stops_at_midline() {
        let mut field = field_with(ScriptedRandom::default());
        // Columns 1..15 with three rows each.
        for _ in 0..42 {
            let placed = field.place_unit(UnitKind::Wall, Side::Left).unwrap();
            assert!(placed.cell.x < 15);
        }
        let before = field.unit_count();
        assert_eq!(
            field.place_unit(UnitKind::Wall, Side::Left),
            Err(PlacementError::NoFreeSlot)
        );
        assert_eq!(field.unit_count(), before);

        // The right half is untouched.
        let placed = field.place_unit(UnitKind::Wall, Side::Right).unwrap();
        assert_eq!(placed.cell, Cell::new(28, 10));
    }

    #[test]
    fn test_right_side_never_crosses_midline() {
        let mut field = field_with(ScriptedRandom::default());
        for _ in 0..42 {
            let placed = field.place_unit(UnitKind::Wall, Side::Right).unwrap();
            assert!(placed.cell.x >= 15);
        }
        assert_eq!(
            field.place_unit(UnitKind::Wall, Side::Right),
            Err(PlacementError::NoFreeSlot)
        );
    }

    #[test]
    fn test_placement_skips_impassable_terrain() {
        let mut field = field_with(ScriptedRandom::default());
        field.terrain.set(Cell::new(1, 10), Terrain::Water);

        let soldier = field.place_unit(UnitKind::Soldier, Side::Left).unwrap();
        assert_eq!(soldier.cell, Cell::new(1, 9));

        field.terrain.set(Cell::new(1, 11), Terrain::Water);
        let plane = field.place_unit(UnitKind::Plane, Side::Left).unwrap();
        assert_eq!(plane.cell, Cell::new(1, 10));
    }

    #[test]
    fn test_base_slot_occupied() {
        let mut field = field_with(ScriptedRandom::default());
        assert_eq!(
            field.place_base(Side::Left),
            Err(PlacementError::BaseSlotOccupied)
        );
        assert_eq!(
            field.place_unit(UnitKind::Base, Side::Right),
            Err(PlacementError::BaseSlotOccupied)
        );
    }

    #[test]
    fn test_no_placement_after_match_over() {
        let mut field = field_with(ScriptedRandom::default());
        field.winner = Some(Side::Right);
        assert_eq!(
            field.place_unit(UnitKind::Soldier, Side::Left),
            Err(PlacementError::MatchOver)
        );
        assert_eq!(field.spawn_at(UnitKind::Soldier, Side::Left, Cell::new(5, 5)), None);
    }

    #[test]
    fn test_spawn_at_rejects_base_cells_and_water() {
        let mut field = field_with(ScriptedRandom::default());
        field.terrain.set(Cell::new(4, 4), Terrain::Water);

        assert_eq!(field.spawn_at(UnitKind::Soldier, Side::Left, Cell::new(29, 10)), None);
        assert_eq!(field.spawn_at(UnitKind::Soldier, Side::Left, Cell::new(4, 4)), None);
        assert_eq!(field.spawn_at(UnitKind::Soldier, Side::Left, Cell::new(30, 4)), None);
        assert!(field.spawn_at(UnitKind::Ufo, Side::Left, Cell::new(4, 4)).is_some());
        assert!(field.validate().is_ok());
    }
}
