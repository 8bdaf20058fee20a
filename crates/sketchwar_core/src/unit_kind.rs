//! Unit kinds and the behavior role each kind is dispatched to.
//!
//! - [`UnitKind`]: closed set of unit types a sketch can be recognized as
//! - [`Role`]: how the engine drives a unit (attack, heal, or stand still)
//!
//! The role is computed once when a unit is constructed; the tick loop never
//! compares type names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Every unit type known to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Each side's objective. Immobile, very high hp.
    Base,
    /// Immobile barrier with a short-range attack.
    Wall,
    /// Fast, fragile flyer.
    Ufo,
    /// Basic infantry.
    Soldier,
    /// Armored ground vehicle.
    Tank,
    /// Aircraft.
    Plane,
    /// Long-range artillery.
    Cannon,
    /// Giant monster.
    Godzilla,
    /// Mounted infantry.
    Cavalry,
    /// Heals injured allies instead of attacking.
    Medic,
    /// Giant robot.
    Gundam,
}

impl UnitKind {
    /// All unit kinds in catalog order.
    pub const ALL: [Self; 11] = [
        Self::Base,
        Self::Wall,
        Self::Ufo,
        Self::Soldier,
        Self::Tank,
        Self::Plane,
        Self::Cannon,
        Self::Godzilla,
        Self::Cavalry,
        Self::Medic,
        Self::Gundam,
    ];

    /// Kinds a player sketch may be recognized as.
    ///
    /// Bases are created by the engine and are never placed from a sketch.
    pub const SKETCHABLE: [Self; 10] = [
        Self::Wall,
        Self::Ufo,
        Self::Soldier,
        Self::Tank,
        Self::Plane,
        Self::Cannon,
        Self::Godzilla,
        Self::Cavalry,
        Self::Medic,
        Self::Gundam,
    ];

    /// Stable label used by the classifier and in data files.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Wall => "wall",
            Self::Ufo => "ufo",
            Self::Soldier => "soldier",
            Self::Tank => "tank",
            Self::Plane => "plane",
            Self::Cannon => "cannon",
            Self::Godzilla => "godzilla",
            Self::Cavalry => "cavalry",
            Self::Medic => "medic",
            Self::Gundam => "gundam",
        }
    }

    /// Single-character glyph for renderers without unit art.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Base => '#',
            Self::Wall => 'W',
            Self::Ufo => 'U',
            Self::Soldier => 'S',
            Self::Tank => 'T',
            Self::Plane => 'P',
            Self::Cannon => 'C',
            Self::Godzilla => 'G',
            Self::Cavalry => 'K',
            Self::Medic => 'M',
            Self::Gundam => 'R',
        }
    }

    /// Behavior role for this kind.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Base => Role::Static,
            Self::Medic => Role::Healer,
            _ => Role::Combatant,
        }
    }

    /// Flying and hovering kinds may cross water.
    #[must_use]
    pub const fn is_airborne(self) -> bool {
        matches!(self, Self::Plane | Self::Ufo)
    }

    /// Look up a kind by label (trimmed, case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UnitKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| GameError::UnknownUnitType(s.to_string()))
    }
}

/// How the engine drives a unit each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Attacks the nearest enemy in range, otherwise advances.
    Combatant,
    /// Heals the nearest injured ally in range, otherwise advances.
    Healer,
    /// Attacks enemies in range but never moves; survives at 0 hp (bases).
    Static,
}

impl Role {
    /// Whether units with this role may move.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !matches!(self, Self::Static)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip_through_lookup() {
        for kind in UnitKind::ALL {
            assert_eq!(UnitKind::from_label(kind.label()), Some(kind));
        }
    }

    #[test]
    fn test_from_label_is_lenient_about_case_and_whitespace() {
        assert_eq!(UnitKind::from_label("  Tank\n"), Some(UnitKind::Tank));
        assert_eq!(UnitKind::from_label("UFO"), Some(UnitKind::Ufo));
        assert_eq!(UnitKind::from_label("unknown"), None);
        assert_eq!(UnitKind::from_label(""), None);
    }

    #[test]
    fn test_from_str_reports_unknown_label() {
        let err = "dragon".parse::<UnitKind>().unwrap_err();
        assert!(matches!(err, GameError::UnknownUnitType(label) if label == "dragon"));
    }

    #[test]
    fn test_roles() {
        assert_eq!(UnitKind::Base.role(), Role::Static);
        assert_eq!(UnitKind::Medic.role(), Role::Healer);
        assert_eq!(UnitKind::Wall.role(), Role::Combatant);
        assert!(!Role::Static.is_mobile());
    }

    #[test]
    fn test_only_flyers_are_airborne() {
        let airborne: Vec<_> = UnitKind::ALL
            .into_iter()
            .filter(|k| k.is_airborne())
            .collect();
        assert_eq!(airborne, vec![UnitKind::Ufo, UnitKind::Plane]);
    }

    #[test]
    fn test_base_is_not_sketchable() {
        assert!(!UnitKind::SKETCHABLE.contains(&UnitKind::Base));
        assert_eq!(UnitKind::SKETCHABLE.len() + 1, UnitKind::ALL.len());
    }
}
