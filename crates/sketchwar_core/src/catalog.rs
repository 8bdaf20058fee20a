//! Unit catalog: per-kind combat stats and the counter table.
//!
//! The catalog is immutable after construction and is shared with the
//! battlefield through an `Arc`. It can be dumped to and loaded from RON so
//! balance tweaks do not need a rebuild.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::COUNTER_BONUS;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, option_fixed_serde, ratio, Fixed};
use crate::unit_kind::UnitKind;

/// Combat statistics for one unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum (and starting) hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Damage per resolved attack.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Moves per base interval. Zero never moves.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Attacks (or heals) per base interval. Zero never acts.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Attack or heal range in cells (Euclidean).
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Hit points restored per heal, for healers.
    #[serde(default, with = "option_fixed_serde")]
    pub heal_power: Option<Fixed>,
}

impl UnitStats {
    /// Stat block handed out for kinds missing from the catalog.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(1000, 20, Fixed::ONE, Fixed::ONE, 2)
    }

    fn new(hp: i32, attack: i32, speed: Fixed, attack_speed: Fixed, range: i32) -> Self {
        Self {
            hp: Fixed::from_num(hp),
            attack: Fixed::from_num(attack),
            speed,
            attack_speed,
            range: Fixed::from_num(range),
            heal_power: None,
        }
    }

    fn with_heal_power(mut self, heal_power: i32) -> Self {
        self.heal_power = Some(Fixed::from_num(heal_power));
        self
    }
}

/// Immutable stat and counter tables.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCatalog {
    stats: HashMap<UnitKind, UnitStats>,
    counters: HashMap<UnitKind, Vec<UnitKind>>,
    counter_bonus: Fixed,
}

impl UnitCatalog {
    /// The built-in roster.
    #[must_use]
    pub fn standard() -> Self {
        use UnitKind::*;

        let int = |n: i32| Fixed::from_num(n);
        let stats = HashMap::from([
            (Base, UnitStats::new(10_000, 10, Fixed::ZERO, int(1), 4)),
            (Wall, UnitStats::new(8000, 5, Fixed::ZERO, ratio(4, 5), 1)),
            (Ufo, UnitStats::new(1000, 50, ratio(5, 2), ratio(6, 5), 3)),
            (Soldier, UnitStats::new(2000, 10, ratio(4, 5), ratio(3, 2), 1)),
            (Tank, UnitStats::new(3000, 15, int(1), int(1), 2)),
            (Plane, UnitStats::new(2500, 20, int(2), ratio(3, 2), 3)),
            (Cannon, UnitStats::new(1500, 25, ratio(1, 2), ratio(1, 2), 10)),
            (Godzilla, UnitStats::new(5000, 100, ratio(1, 2), int(1), 2)),
            (Cavalry, UnitStats::new(2500, 10, int(1), ratio(6, 5), 2)),
            (
                Medic,
                UnitStats::new(1500, 0, ratio(4, 5), int(1), 3).with_heal_power(50),
            ),
            (Gundam, UnitStats::new(4800, 90, ratio(3, 5), ratio(6, 5), 3)),
        ]);

        let counters = HashMap::from([
            (Soldier, vec![Cannon, Medic]),
            (Tank, vec![Plane, Medic]),
            (Plane, vec![Cannon, Cavalry]),
            (Cannon, vec![Tank, Wall, Ufo]),
            (Godzilla, vec![Plane, Gundam]),
            (Cavalry, vec![Cannon, Soldier]),
            (Gundam, vec![Ufo]),
        ]);

        Self {
            stats,
            counters,
            counter_bonus: COUNTER_BONUS,
        }
    }

    /// Stats for `kind`, or [`UnitStats::fallback`] when the catalog has no entry.
    #[must_use]
    pub fn stats_for(&self, kind: UnitKind) -> UnitStats {
        self.stats
            .get(&kind)
            .copied()
            .unwrap_or_else(UnitStats::fallback)
    }

    /// Stats for a raw label. Unknown labels get the fallback block.
    #[must_use]
    pub fn stats_for_label(&self, label: &str) -> UnitStats {
        UnitKind::from_label(label).map_or_else(UnitStats::fallback, |kind| self.stats_for(kind))
    }

    /// Damage multiplier applied when the attacker counters the defender.
    #[must_use]
    pub const fn counter_bonus_multiplier(&self) -> Fixed {
        self.counter_bonus
    }

    /// Whether `attacker` deals bonus damage to `defender`. One-directional.
    #[must_use]
    pub fn is_countered(&self, attacker: UnitKind, defender: UnitKind) -> bool {
        self.counters
            .get(&attacker)
            .is_some_and(|defenders| defenders.contains(&defender))
    }

    /// Kinds `attacker` has a counter bonus against.
    #[must_use]
    pub fn counters_of(&self, attacker: UnitKind) -> &[UnitKind] {
        self.counters
            .get(&attacker)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parse a catalog from RON text.
    ///
    /// `source` names the input in error messages.
    pub fn from_ron(text: &str, source: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        Ok(data.into())
    }

    /// Serialize the catalog as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        let data = CatalogData::from(self);
        ron::ser::to_string_pretty(&data, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("catalog serialization failed: {e}")))
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// On-disk catalog layout. Entries are kept in [`UnitKind::ALL`] order so
/// dumps are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogData {
    #[serde(with = "fixed_serde")]
    counter_bonus: Fixed,
    units: Vec<CatalogEntry>,
    #[serde(default)]
    counters: Vec<CounterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogEntry {
    kind: UnitKind,
    stats: UnitStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterEntry {
    attacker: UnitKind,
    defenders: Vec<UnitKind>,
}

impl From<&UnitCatalog> for CatalogData {
    fn from(catalog: &UnitCatalog) -> Self {
        let units = UnitKind::ALL
            .into_iter()
            .filter_map(|kind| {
                catalog
                    .stats
                    .get(&kind)
                    .map(|stats| CatalogEntry { kind, stats: *stats })
            })
            .collect();
        let counters = UnitKind::ALL
            .into_iter()
            .filter_map(|attacker| {
                catalog.counters.get(&attacker).map(|defenders| CounterEntry {
                    attacker,
                    defenders: defenders.clone(),
                })
            })
            .collect();
        Self {
            counter_bonus: catalog.counter_bonus,
            units,
            counters,
        }
    }
}

impl From<CatalogData> for UnitCatalog {
    fn from(data: CatalogData) -> Self {
        Self {
            stats: data
                .units
                .into_iter()
                .map(|entry| (entry.kind, entry.stats))
                .collect(),
            counters: data
                .counters
                .into_iter()
                .map(|entry| (entry.attacker, entry.defenders))
                .collect(),
            counter_bonus: data.counter_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_roster_values() {
        let catalog = UnitCatalog::standard();
        let soldier = catalog.stats_for(UnitKind::Soldier);
        assert_eq!(soldier.hp, Fixed::from_num(2000));
        assert_eq!(soldier.attack, Fixed::from_num(10));
        assert_eq!(soldier.range, Fixed::ONE);
        assert_eq!(soldier.attack_speed, ratio(3, 2));

        let medic = catalog.stats_for(UnitKind::Medic);
        assert_eq!(medic.heal_power, Some(Fixed::from_num(50)));
        assert_eq!(medic.attack, Fixed::ZERO);

        let base = catalog.stats_for(UnitKind::Base);
        assert_eq!(base.speed, Fixed::ZERO);
        assert_eq!(base.hp, Fixed::from_num(10_000));
    }

    #[test]
    fn test_unknown_label_gets_fallback_stats() {
        let catalog = UnitCatalog::standard();
        let stats = catalog.stats_for_label("dragon");
        assert_eq!(stats, UnitStats::fallback());
        assert_eq!(stats.hp, Fixed::from_num(1000));
        assert_eq!(stats.attack, Fixed::from_num(20));
        assert_eq!(stats.range, Fixed::from_num(2));
    }

    #[test]
    fn test_missing_entry_gets_fallback_stats() {
        let catalog = UnitCatalog::from(CatalogData {
            counter_bonus: COUNTER_BONUS,
            units: Vec::new(),
            counters: Vec::new(),
        });
        assert_eq!(catalog.stats_for(UnitKind::Tank), UnitStats::fallback());
    }

    #[test]
    fn test_counters_are_one_directional() {
        let catalog = UnitCatalog::standard();
        assert!(catalog.is_countered(UnitKind::Cavalry, UnitKind::Soldier));
        assert!(!catalog.is_countered(UnitKind::Soldier, UnitKind::Cavalry));
        assert!(catalog.is_countered(UnitKind::Cannon, UnitKind::Ufo));
        assert!(!catalog.is_countered(UnitKind::Ufo, UnitKind::Cannon));
        assert!(catalog.counters_of(UnitKind::Medic).is_empty());
    }

    #[test]
    fn test_counter_bonus_is_one_and_a_half() {
        let catalog = UnitCatalog::standard();
        assert_eq!(catalog.counter_bonus_multiplier(), Fixed::from_num(1.5));
    }

    #[test]
    fn test_ron_dump_reloads_identically() {
        let catalog = UnitCatalog::standard();
        let text = catalog.to_ron().unwrap();
        let reloaded = UnitCatalog::from_ron(&text, "dump.ron").unwrap();
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn test_bad_ron_reports_source() {
        let err = UnitCatalog::from_ron("not a catalog", "broken.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { path, .. } if path == "broken.ron"));
    }
}
