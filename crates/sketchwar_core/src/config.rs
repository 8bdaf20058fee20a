//! Gameplay constants and the battlefield configuration built from them.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::terrain::DEFAULT_MAP_ID;

/// Columns on the standard board.
pub const GRID_WIDTH: u32 = 30;

/// Rows on the standard board.
pub const GRID_HEIGHT: u32 = 20;

/// Largest width or height a battlefield may have.
pub const MAX_GRID_DIM: u32 = 1024;

/// Pacing base: a unit with rate 1 acts once per this many milliseconds.
pub const BASE_INTERVAL_MS: u64 = 2000;

/// How long an attack or heal effect stays visible.
pub const EFFECT_DURATION_MS: u64 = 500;

/// Damage multiplier for countered matchups (1.5).
pub const COUNTER_BONUS: Fixed = Fixed::from_bits(3 << 31);

/// Minimum gap between two sketch submissions from the same side.
pub const PLACEMENT_COOLDOWN_MS: u64 = 3000;

/// Where the battlefield gets its terrain from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainSource {
    /// Every cell is plain.
    Plain,
    /// A built-in row-string layout.
    Preset(String),
    /// Weighted random terrain drawn from the battlefield's randomness.
    Generated,
}

impl Default for TerrainSource {
    fn default() -> Self {
        Self::Preset(DEFAULT_MAP_ID.to_string())
    }
}

/// Battlefield dimensions, pacing and terrain choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlefieldConfig {
    /// Board width in cells.
    pub width: u32,
    /// Board height in cells.
    pub height: u32,
    /// Pacing base interval in milliseconds.
    pub base_interval_ms: u64,
    /// Lifetime of combat effects in milliseconds.
    pub effect_duration_ms: u64,
    /// Terrain loaded at construction and on every reset.
    pub terrain: TerrainSource,
}

impl BattlefieldConfig {
    /// Standard dimensions with an all-plain board.
    #[must_use]
    pub fn open() -> Self {
        Self {
            terrain: TerrainSource::Plain,
            ..Self::default()
        }
    }

    /// Check the board is large enough for two bases and a midline, and
    /// small enough that squared cell distances fit in `i32`.
    pub fn validate(&self) -> Result<()> {
        if self.width < 4 {
            return Err(GameError::InvalidState(format!(
                "battlefield width {} is too narrow, need at least 4",
                self.width
            )));
        }
        if self.height == 0 {
            return Err(GameError::InvalidState(
                "battlefield height must be positive".to_string(),
            ));
        }
        if self.width > MAX_GRID_DIM || self.height > MAX_GRID_DIM {
            return Err(GameError::InvalidState(format!(
                "battlefield {}x{} exceeds the {MAX_GRID_DIM} cell limit",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for BattlefieldConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            base_interval_ms: BASE_INTERVAL_MS,
            effect_duration_ms: EFFECT_DURATION_MS,
            terrain: TerrainSource::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;

    #[test]
    fn test_counter_bonus_constant() {
        assert_eq!(COUNTER_BONUS, ratio(3, 2));
    }

    #[test]
    fn test_default_uses_stock_map() {
        let config = BattlefieldConfig::default();
        assert_eq!(config.width, 30);
        assert_eq!(config.height, 20);
        assert_eq!(config.terrain, TerrainSource::Preset("map1".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_tiny_boards() {
        let narrow = BattlefieldConfig {
            width: 3,
            ..BattlefieldConfig::open()
        };
        assert!(narrow.validate().is_err());

        let flat = BattlefieldConfig {
            height: 0,
            ..BattlefieldConfig::open()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_boards() {
        let wide = BattlefieldConfig {
            width: 50_000,
            height: 1,
            ..BattlefieldConfig::open()
        };
        assert!(matches!(wide.validate(), Err(GameError::InvalidState(_))));

        let tall = BattlefieldConfig {
            height: MAX_GRID_DIM + 1,
            ..BattlefieldConfig::open()
        };
        assert!(tall.validate().is_err());

        let largest = BattlefieldConfig {
            width: MAX_GRID_DIM,
            height: MAX_GRID_DIM,
            ..BattlefieldConfig::open()
        };
        assert!(largest.validate().is_ok());
    }
}
