//! Error types for grid construction.

use std::fmt;

use posgrid_core::{ConfigError, Coord};

/// Errors arising while building a [`Grid`](crate::Grid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Attempted to construct a grid with zero cells.
    EmptyGrid,
    /// A dimension exceeds [`Grid::MAX_DIM`](crate::Grid::MAX_DIM).
    DimensionTooLarge {
        /// Which dimension (`"width"` or `"height"`).
        name: &'static str,
        /// The rejected value.
        value: u32,
        /// The maximum allowed value.
        max: u32,
    },
    /// A blocked or start coordinate lies outside the grid.
    CoordOutOfBounds {
        /// The offending coordinate.
        coord: Coord,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// Layout rows do not all have the same length.
    RaggedLayout {
        /// Zero-based row index of the first mismatching row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the mismatching row.
        found: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid must have at least one cell"),
            Self::DimensionTooLarge { name, value, max } => {
                write!(f, "grid {name} {value} exceeds maximum {max}")
            }
            Self::CoordOutOfBounds {
                coord,
                width,
                height,
            } => write!(f, "coordinate {coord} outside {width}x{height} grid"),
            Self::RaggedLayout {
                row,
                expected,
                found,
            } => write!(
                f,
                "layout row {row} has {found} cells, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for GridError {}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        ConfigError::InvalidGrid {
            reason: e.to_string(),
        }
    }
}
