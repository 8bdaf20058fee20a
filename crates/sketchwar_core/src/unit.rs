//! Unit entities and the arena that owns them.
//!
//! Units are identified by a [`UnitId`] handed out by the [`UnitArena`].
//! The battlefield grid stores ids, and all per-unit engine bookkeeping is
//! keyed by id, so removing a unit is `arena.remove(id)` plus purging those
//! maps.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitCatalog;
use crate::math::{fixed_serde, option_fixed_serde, Fixed};
use crate::unit_kind::{Role, UnitKind};

/// One of the two competing players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Base on the left edge, advances rightward.
    Left,
    /// Base on the right edge, advances leftward.
    Right,
}

impl Side {
    /// Both sides.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identity of a unit for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Raw numeric value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A combat actor.
///
/// Position is not part of the unit; it is the grid cell holding its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit kind.
    pub kind: UnitKind,
    /// Owning side.
    pub side: Side,
    /// Behavior role, fixed at construction.
    pub role: Role,
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Hit points at creation.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Damage per attack.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Moves per base interval.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Attacks or heals per base interval.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Attack or heal range in cells.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Hit points restored per heal.
    #[serde(default, with = "option_fixed_serde")]
    pub heal_power: Option<Fixed>,
}

impl Unit {
    /// Instantiate `kind` for `side` from the catalog, at full health.
    #[must_use]
    pub fn from_catalog(catalog: &UnitCatalog, kind: UnitKind, side: Side) -> Self {
        let stats = catalog.stats_for(kind);
        Self {
            kind,
            side,
            role: kind.role(),
            hp: stats.hp,
            max_hp: stats.hp,
            attack: stats.attack,
            speed: stats.speed,
            attack_speed: stats.attack_speed,
            range: stats.range,
            heal_power: stats.heal_power,
        }
    }

    /// Whether this is a side's base.
    #[must_use]
    pub const fn is_base(&self) -> bool {
        matches!(self.role, Role::Static)
    }

    /// Whether hit points are below maximum.
    #[must_use]
    pub fn is_injured(&self) -> bool {
        self.hp < self.max_hp
    }

    /// Milliseconds between attacks (or heals); `None` means never.
    #[must_use]
    pub fn attack_interval_ms(&self, base_interval_ms: u64) -> Option<u64> {
        pacing_interval_ms(base_interval_ms, self.attack_speed)
    }

    /// Milliseconds between moves; `None` means never.
    #[must_use]
    pub fn move_interval_ms(&self, base_interval_ms: u64) -> Option<u64> {
        if !self.role.is_mobile() {
            return None;
        }
        pacing_interval_ms(base_interval_ms, self.speed)
    }
}

/// `base / rate`, rounded to whole milliseconds. A non-positive rate never acts.
#[must_use]
pub fn pacing_interval_ms(base_interval_ms: u64, rate: Fixed) -> Option<u64> {
    if rate <= Fixed::ZERO {
        return None;
    }
    let base = Fixed::checked_from_num(base_interval_ms)?;
    base.checked_div(rate)
        .map(|interval| interval.round().to_num::<u64>())
}

/// Storage for all live units.
///
/// Ids are never reused within one arena; [`clear`](Self::clear) keeps the
/// counter running so stale ids from before a reset cannot alias new units.
#[derive(Debug, Clone, Default)]
pub struct UnitArena {
    units: HashMap<UnitId, Unit>,
    next_id: u32,
}

impl UnitArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit and return its id.
    pub fn insert(&mut self, unit: Unit) -> UnitId {
        let id = UnitId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Remove every unit.
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Unit)> {
        self.units.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;

    #[test]
    fn test_from_catalog_starts_at_full_health() {
        let catalog = UnitCatalog::standard();
        let tank = Unit::from_catalog(&catalog, UnitKind::Tank, Side::Right);
        assert_eq!(tank.hp, Fixed::from_num(3000));
        assert_eq!(tank.hp, tank.max_hp);
        assert_eq!(tank.role, Role::Combatant);
        assert!(!tank.is_injured());
        assert!(!tank.is_base());
    }

    #[test]
    fn test_pacing_intervals() {
        assert_eq!(pacing_interval_ms(2000, Fixed::ONE), Some(2000));
        assert_eq!(pacing_interval_ms(2000, ratio(3, 2)), Some(1333));
        assert_eq!(pacing_interval_ms(2000, ratio(5, 2)), Some(800));
        assert_eq!(pacing_interval_ms(2000, ratio(1, 2)), Some(4000));
        assert_eq!(pacing_interval_ms(2000, Fixed::ZERO), None);
    }

    #[test]
    fn test_base_never_moves_but_attacks() {
        let catalog = UnitCatalog::standard();
        let base = Unit::from_catalog(&catalog, UnitKind::Base, Side::Left);
        assert!(base.is_base());
        assert_eq!(base.move_interval_ms(2000), None);
        assert_eq!(base.attack_interval_ms(2000), Some(2000));
    }

    #[test]
    fn test_wall_never_moves() {
        let catalog = UnitCatalog::standard();
        let wall = Unit::from_catalog(&catalog, UnitKind::Wall, Side::Left);
        assert_eq!(wall.move_interval_ms(2000), None);
        assert_eq!(wall.attack_interval_ms(2000), Some(2500));
    }

    #[test]
    fn test_arena_ids_are_not_reused() {
        let catalog = UnitCatalog::standard();
        let mut arena = UnitArena::new();
        let a = arena.insert(Unit::from_catalog(&catalog, UnitKind::Soldier, Side::Left));
        arena.remove(a);
        arena.clear();
        let b = arena.insert(Unit::from_catalog(&catalog, UnitKind::Soldier, Side::Left));
        assert_ne!(a, b);
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Left.opponent(), Side::Right);
        assert_eq!(Side::Right.opponent(), Side::Left);
    }
}
