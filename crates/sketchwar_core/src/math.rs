//! Fixed-point math and grid coordinates.
//!
//! Stats and hit points use fixed-point arithmetic so combat results do not
//! depend on platform float behavior. Grid positions are plain integers.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point value from an integer ratio.
///
/// Catalog values such as `0.8` are written as `ratio(4, 5)` to keep floats
/// out of the simulation.
///
/// # Panics
///
/// Panics if `den` is zero.
#[must_use]
pub fn ratio(num: i32, den: i32) -> Fixed {
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for `Option<Fixed>`.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_bits()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<i64>::deserialize(deserializer)?;
        Ok(opt.map(Fixed::from_bits))
    }
}

/// A cell coordinate on the battlefield grid.
///
/// Signed so neighbor arithmetic can step off the board; callers bounds-check
/// before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Column, 0 at the left edge.
    pub x: i32,
    /// Row, 0 at the top edge.
    pub y: i32,
}

impl Cell {
    /// Create a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance in cells (avoids sqrt for comparisons).
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// The neighboring cell one step in `dir`.
    #[must_use]
    pub const fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Whether `other` lies within `range` cells (Euclidean).
    #[must_use]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        Fixed::saturating_from_num(self.distance_squared(other)) <= range.saturating_mul(range)
    }
}

/// One of the four grid movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward row 0.
    Up,
    /// Toward the last row.
    Down,
    /// Toward column 0.
    Left,
    /// Toward the last column.
    Right,
}

impl Direction {
    /// All four directions.
    pub const ALL: [Self; 4] = [Self::Right, Self::Left, Self::Up, Self::Down];

    /// Column/row delta of one step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Horizontal direction that closes `dx`, if any.
    #[must_use]
    pub const fn horizontal(dx: i32) -> Option<Self> {
        if dx > 0 {
            Some(Self::Right)
        } else if dx < 0 {
            Some(Self::Left)
        } else {
            None
        }
    }

    /// Vertical direction that closes `dy`, if any.
    #[must_use]
    pub const fn vertical(dy: i32) -> Option<Self> {
        if dy > 0 {
            Some(Self::Down)
        } else if dy < 0 {
            Some(Self::Up)
        } else {
            None
        }
    }

    /// The reverse direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_builds_fractions() {
        assert_eq!(ratio(3, 2), Fixed::from_num(1.5));
        assert_eq!(ratio(5, 2) * Fixed::from_num(2), Fixed::from_num(5));
    }

    #[test]
    fn test_within_uses_euclidean_distance() {
        let origin = Cell::new(0, 0);
        assert!(origin.within(Cell::new(1, 0), Fixed::ONE));
        assert!(!origin.within(Cell::new(1, 1), Fixed::ONE));
        assert!(origin.within(Cell::new(1, 1), Fixed::from_num(2)));
        assert!(origin.within(Cell::new(3, 4), Fixed::from_num(5)));
        assert!(!origin.within(Cell::new(3, 4), Fixed::from_num(4)));
    }

    #[test]
    fn test_step_and_opposite() {
        let cell = Cell::new(5, 5);
        for dir in Direction::ALL {
            assert_eq!(cell.step(dir).step(dir.opposite()), cell);
        }
        assert_eq!(Direction::horizontal(-3), Some(Direction::Left));
        assert_eq!(Direction::vertical(0), None);
    }
}
