//! Fixed-point math and grid geometry for deterministic decisions.
//!
//! Floating-point operations can produce different results on different
//! CPUs. Anything fractional that feeds a persisted value (cost grids in
//! particular) goes through [`Fixed`].

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all fractional math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Side length of a region grid in cells.
pub const REGION_SIZE: u8 = 50;

/// Number of cells in a region grid.
pub const REGION_CELLS: usize = (REGION_SIZE as usize) * (REGION_SIZE as usize);

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

/// A cell position inside one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column (0..50).
    pub x: u8,
    /// Row (0..50).
    pub y: u8,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance, the range metric used for interaction checks.
    #[must_use]
    pub const fn range_to(self, other: Self) -> u8 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Whether the position lies on the region border (an exit row/column).
    #[must_use]
    pub const fn is_region_edge(self) -> bool {
        self.x == 0 || self.y == 0 || self.x == REGION_SIZE - 1 || self.y == REGION_SIZE - 1
    }

    /// Row-major index into a region grid.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        (self.y as usize) * (REGION_SIZE as usize) + (self.x as usize)
    }

    /// Inverse of [`GridPos::index`]. Returns `None` outside the grid.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= REGION_CELLS {
            return None;
        }
        let size = REGION_SIZE as usize;
        Some(Self::new((index % size) as u8, (index / size) as u8))
    }

    /// Whether the position is inside the region grid.
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x < REGION_SIZE && self.y < REGION_SIZE
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_chebyshev() {
        let a = GridPos::new(25, 25);
        assert_eq!(a.range_to(GridPos::new(30, 25)), 5);
        assert_eq!(a.range_to(GridPos::new(28, 29)), 4);
        assert_eq!(a.range_to(a), 0);
    }

    #[test]
    fn test_index_round_trip() {
        let pos = GridPos::new(7, 42);
        assert_eq!(pos.index(), 42 * 50 + 7);
        assert_eq!(GridPos::from_index(pos.index()), Some(pos));
        assert_eq!(GridPos::from_index(REGION_CELLS), None);
    }

    #[test]
    fn test_region_edge() {
        assert!(GridPos::new(0, 10).is_region_edge());
        assert!(GridPos::new(10, 49).is_region_edge());
        assert!(!GridPos::new(1, 48).is_region_edge());
    }

    #[test]
    fn test_fixed_serde_preserves_bits() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "fixed_serde")] Fixed);

        let value = Fixed::from_num(2.75);
        let json = serde_json::to_string(&Wrapper(value)).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.0, value);
    }
}
