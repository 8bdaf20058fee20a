//! Terrain grid: cell types, their modifiers, and passability.
//!
//! The map is loaded once from a preset row-string layout (or generated
//! randomly) and is immutable afterwards, except that base cells are forced
//! to [`Terrain::Plain`].

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_serde, ratio, Cell, Fixed};
use crate::random::RandomSource;
use crate::unit_kind::UnitKind;

/// Terrain type of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground.
    #[default]
    Plain,
    /// Woodland.
    Forest,
    /// High ground.
    Mountain,
    /// Only airborne units may enter.
    Water,
}

impl Terrain {
    /// Map a preset layout character. Unknown characters are plain.
    #[must_use]
    pub const fn from_char(c: char) -> Self {
        match c {
            'f' => Self::Forest,
            'm' => Self::Mountain,
            'w' => Self::Water,
            _ => Self::Plain,
        }
    }

    /// Layout character for this terrain; the inverse of [`from_char`](Self::from_char).
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Plain => 'p',
            Self::Forest => 'f',
            Self::Mountain => 'm',
            Self::Water => 'w',
        }
    }

    /// Movement/attack/defense modifiers.
    ///
    /// Advisory: combat resolution does not apply them.
    #[must_use]
    pub fn effects(self) -> TerrainEffects {
        match self {
            Self::Plain => TerrainEffects::new(ratio(1, 1), ratio(1, 1), ratio(1, 1)),
            Self::Mountain => TerrainEffects::new(ratio(1, 2), ratio(6, 5), ratio(13, 10)),
            Self::Forest => TerrainEffects::new(ratio(4, 5), ratio(1, 1), ratio(6, 5)),
            Self::Water => TerrainEffects::new(ratio(3, 10), ratio(4, 5), ratio(4, 5)),
        }
    }

    /// Whether a unit of `kind` may stand on this terrain.
    #[must_use]
    pub const fn allows(self, kind: UnitKind) -> bool {
        match self {
            Self::Water => kind.is_airborne(),
            Self::Plain | Self::Forest | Self::Mountain => true,
        }
    }

    /// Solid color used when terrain art is unavailable.
    #[must_use]
    pub const fn fallback_color(self) -> &'static str {
        match self {
            Self::Plain => "#90EE90",
            Self::Mountain => "#808080",
            Self::Water => "#4169E1",
            Self::Forest => "#228B22",
        }
    }
}

/// Terrain modifiers for a cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainEffects {
    /// Movement speed multiplier.
    #[serde(with = "fixed_serde")]
    pub move_modifier: Fixed,
    /// Attack multiplier for units standing here.
    #[serde(with = "fixed_serde")]
    pub attack_modifier: Fixed,
    /// Defense multiplier for units standing here.
    #[serde(with = "fixed_serde")]
    pub defense_modifier: Fixed,
}

impl TerrainEffects {
    const fn new(move_modifier: Fixed, attack_modifier: Fixed, defense_modifier: Fixed) -> Self {
        Self {
            move_modifier,
            attack_modifier,
            defense_modifier,
        }
    }
}

/// Generation weights in percent: plain, forest, mountain, water.
const GENERATION_WEIGHTS: [(Terrain, usize); 4] = [
    (Terrain::Plain, 70),
    (Terrain::Forest, 10),
    (Terrain::Mountain, 10),
    (Terrain::Water, 10),
];

/// Preset id of the stock two-lane map.
pub const DEFAULT_MAP_ID: &str = "map1";

/// Row strings of the stock map: mountain blocks top and bottom, a forest
/// wedge on the left flank, and a water channel on the right flank.
const MAP1: [&str; 20] = [
    "pppppppppppppppppppppppppppppp",
    "pppppmmmmppppppppppppmmmmppppp",
    "pppppmmmmppppppppppppmmmmppppp",
    "pppppmmmmppppppppppppmmmmppppw",
    "ppppppppppppppppppppppppppppww",
    "fffppppppppppppppppppppppppwww",
    "ffffpppppppppppppppppppppwwwwp",
    "fffffppppppppppppppppppppwwwpp",
    "ffffffpppppppppppppppppwwppppp",
    "fffffffppppppppppppppppppppppp",
    "ffffffpppppppppppppppppwwppppp",
    "fffffppppppppppppppppppppwwwpp",
    "ffffpppppppppppppppppppppwwwwp",
    "fffppppppppppppppppppppppppwww",
    "ppppppppppppppppppppppppppppww",
    "pppppmmmmppppppppppppmmmmppppw",
    "pppppmmmmppppppppppppmmmmppppp",
    "pppppmmmmppppppppppppmmmmppppp",
    "pppppppppppppppppppppppppppppp",
    "pppppppppppppppppppppppppppppp",
];

fn preset_rows(map_id: &str) -> Option<&'static [&'static str]> {
    match map_id {
        "map1" => Some(&MAP1),
        _ => None,
    }
}

/// Ids of all built-in presets.
#[must_use]
pub fn preset_ids() -> &'static [&'static str] {
    &[DEFAULT_MAP_ID]
}

/// Terrain grid stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: u32,
    height: u32,
    cells: Vec<Terrain>,
}

impl TerrainMap {
    /// Create an all-plain map.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "TerrainMap width must be positive");
        assert!(height > 0, "TerrainMap height must be positive");

        Self {
            width,
            height,
            cells: vec![Terrain::Plain; (width as usize) * (height as usize)],
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a cell is within the grid.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    #[inline]
    fn index(&self, cell: Cell) -> usize {
        (cell.y as usize) * (self.width as usize) + (cell.x as usize)
    }

    /// Terrain at `cell`.
    ///
    /// # Panics
    ///
    /// Out-of-bounds cells are a caller bug; use [`get`](Self::get) when the
    /// cell may be off the grid.
    #[must_use]
    pub fn terrain_at(&self, cell: Cell) -> Terrain {
        assert!(self.contains(cell), "terrain lookup out of bounds: {cell:?}");
        self.cells[self.index(cell)]
    }

    /// Terrain at `cell`, `None` if out of bounds.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Terrain> {
        self.contains(cell).then(|| self.cells[self.index(cell)])
    }

    /// Set terrain at `cell`. Returns `false` if out of bounds.
    pub fn set(&mut self, cell: Cell, terrain: Terrain) -> bool {
        if self.contains(cell) {
            let index = self.index(cell);
            self.cells[index] = terrain;
            true
        } else {
            false
        }
    }

    /// Whether a unit of `kind` may enter `cell`, judged on terrain alone.
    ///
    /// Same bounds precondition as [`terrain_at`](Self::terrain_at).
    #[must_use]
    pub fn passable(&self, kind: UnitKind, cell: Cell) -> bool {
        self.terrain_at(cell).allows(kind)
    }

    /// Fill the grid from a preset layout.
    ///
    /// On an unknown id the map is reset to all plain and the error returned.
    /// Rows or columns missing from the layout are plain.
    pub fn load_preset(&mut self, map_id: &str) -> Result<()> {
        self.cells.fill(Terrain::Plain);
        let rows = preset_rows(map_id).ok_or_else(|| GameError::UnknownMap(map_id.to_string()))?;

        for (y, row) in rows.iter().take(self.height as usize).enumerate() {
            for (x, c) in row.chars().take(self.width as usize).enumerate() {
                let cell = Cell::new(x as i32, y as i32);
                let index = self.index(cell);
                self.cells[index] = Terrain::from_char(c);
            }
        }
        Ok(())
    }

    /// Randomly fill the grid using the stock terrain weights.
    ///
    /// `keep_plain` cells (the bases) always stay plain.
    pub fn generate(&mut self, random: &mut dyn RandomSource, keep_plain: &[Cell]) {
        let total: usize = GENERATION_WEIGHTS.iter().map(|(_, w)| w).sum();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let cell = Cell::new(x, y);
                let terrain = if keep_plain.contains(&cell) {
                    Terrain::Plain
                } else {
                    let mut roll = random.pick_index(total);
                    let mut chosen = Terrain::Plain;
                    for (terrain, weight) in GENERATION_WEIGHTS {
                        if roll < weight {
                            chosen = terrain;
                            break;
                        }
                        roll -= weight;
                    }
                    chosen
                };
                let index = self.index(cell);
                self.cells[index] = terrain;
            }
        }
    }

    /// Force the given cells to plain.
    pub fn clear_cells(&mut self, cells: &[Cell]) {
        for &cell in cells {
            self.set(cell, Terrain::Plain);
        }
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Terrain]> {
        self.cells.chunks(self.width as usize)
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Terrain] {
        &self.cells
    }

    /// The map as preset row strings, one per row.
    #[must_use]
    pub fn layout_rows(&self) -> Vec<String> {
        self.rows()
            .map(|row| row.iter().map(|terrain| terrain.as_char()).collect())
            .collect()
    }
}

impl Default for TerrainMap {
    /// All-plain map with the standard battlefield dimensions.
    fn default() -> Self {
        Self::new(30, 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    #[test]
    fn test_new_map_is_all_plain() {
        let map = TerrainMap::new(4, 3);
        assert_eq!(map.cells().len(), 12);
        assert!(map.cells().iter().all(|t| *t == Terrain::Plain));
    }

    #[test]
    fn test_load_preset_map1() {
        let mut map = TerrainMap::default();
        map.load_preset(DEFAULT_MAP_ID).unwrap();

        assert_eq!(map.terrain_at(Cell::new(0, 0)), Terrain::Plain);
        assert_eq!(map.terrain_at(Cell::new(5, 1)), Terrain::Mountain);
        assert_eq!(map.terrain_at(Cell::new(0, 9)), Terrain::Forest);
        assert_eq!(map.terrain_at(Cell::new(29, 5)), Terrain::Water);
        // The left base cell is forest in the layout; the engine clears it.
        assert_eq!(map.terrain_at(Cell::new(0, 10)), Terrain::Forest);
        assert_eq!(map.terrain_at(Cell::new(29, 10)), Terrain::Plain);
    }

    #[test]
    fn test_layout_rows_reproduce_preset() {
        let mut map = TerrainMap::default();
        map.load_preset(DEFAULT_MAP_ID).unwrap();
        assert_eq!(map.layout_rows(), MAP1.to_vec());
    }

    #[test]
    fn test_every_listed_preset_loads() {
        for id in preset_ids() {
            let mut map = TerrainMap::default();
            assert!(map.load_preset(id).is_ok(), "{id} failed to load");
        }
    }

    #[test]
    fn test_unknown_preset_leaves_plain_map() {
        let mut map = TerrainMap::default();
        map.load_preset(DEFAULT_MAP_ID).unwrap();

        let err = map.load_preset("atlantis").unwrap_err();
        assert!(matches!(err, GameError::UnknownMap(id) if id == "atlantis"));
        assert!(map.cells().iter().all(|t| *t == Terrain::Plain));
    }

    #[test]
    fn test_water_only_passable_when_airborne() {
        let mut map = TerrainMap::new(3, 3);
        let lake = Cell::new(1, 1);
        map.set(lake, Terrain::Water);

        assert!(!map.passable(UnitKind::Soldier, lake));
        assert!(!map.passable(UnitKind::Tank, lake));
        assert!(map.passable(UnitKind::Plane, lake));
        assert!(map.passable(UnitKind::Ufo, lake));
        assert!(map.passable(UnitKind::Soldier, Cell::new(0, 0)));
    }

    #[test]
    fn test_get_handles_out_of_bounds() {
        let map = TerrainMap::new(3, 3);
        assert_eq!(map.get(Cell::new(-1, 0)), None);
        assert_eq!(map.get(Cell::new(3, 0)), None);
        assert_eq!(map.get(Cell::new(2, 2)), Some(Terrain::Plain));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_terrain_at_out_of_bounds_panics() {
        let map = TerrainMap::new(3, 3);
        let _ = map.terrain_at(Cell::new(5, 5));
    }

    #[test]
    fn test_generate_follows_rolls_and_keeps_base_plain() {
        // Rolls map into the weight table: 0..70 plain, 70..80 forest,
        // 80..90 mountain, 90..100 water.
        let mut random = ScriptedRandom::new([95, 75, 85, 10]);
        let mut map = TerrainMap::new(5, 1);
        let base = Cell::new(4, 0);
        map.generate(&mut random, &[base]);

        assert_eq!(
            map.cells(),
            &[
                Terrain::Water,
                Terrain::Forest,
                Terrain::Mountain,
                Terrain::Plain,
                Terrain::Plain,
            ]
        );
    }

    #[test]
    fn test_mountain_modifiers() {
        let effects = Terrain::Mountain.effects();
        assert_eq!(effects.move_modifier, ratio(1, 2));
        assert_eq!(effects.defense_modifier, ratio(13, 10));
        assert_eq!(Terrain::Plain.effects().attack_modifier, Fixed::ONE);
    }
}
