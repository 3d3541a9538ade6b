//! Grid coordinates and cardinal directions.

use std::cmp::Ordering;
use std::fmt;

/// An integer cell coordinate on a 2D grid.
///
/// `x` is the column and `y` the row, with `(0, 0)` in the top-left
/// corner. Coordinates are plain values: equality and hashing are by
/// value, and the total order is row-major (`y` first, then `x`), which
/// matches ascending grid index. That order is the tie-break used
/// wherever entities must be sorted deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Coord {
    /// Construct a coordinate from column and row.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This coordinate shifted by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// This coordinate shifted one cell in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// L1 distance: the number of 4-connected moves on an open grid.
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// L∞ distance: the radius of the smallest square window containing both.
    pub fn chebyshev(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Straight-line distance between cell centres.
    pub fn euclidean(self, other: Coord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// Whether the two cells share an edge.
    pub fn is_adjacent(self, other: Coord) -> bool {
        self.manhattan(other) == 1
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Movement direction on a 4-connected grid.
///
/// Discriminants are the action indices used by the grid games, so a
/// `Discrete(5)` action maps onto this enum with [`Direction::from_index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    /// One row up (`y - 1`).
    North = 0,
    /// One row down (`y + 1`).
    South = 1,
    /// One column right (`x + 1`).
    East = 2,
    /// One column left (`x - 1`).
    West = 3,
    /// Stay in place.
    None = 4,
}

impl Direction {
    /// All directions in discriminant order.
    pub const ALL: [Direction; 5] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::None,
    ];

    /// The four moving directions, in discriminant order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Returns the `(dx, dy)` unit offset for this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::None => (0, 0),
        }
    }

    /// The direction pointing the other way. `None` is its own opposite.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::None => Direction::None,
        }
    }

    /// Action index of this direction.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Map an action index back to a direction.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
            Direction::None => "0",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn deltas_match_screen_axes() {
        let c = Coord::new(2, 2);
        assert_eq!(c.step(Direction::North), Coord::new(2, 1));
        assert_eq!(c.step(Direction::South), Coord::new(2, 3));
        assert_eq!(c.step(Direction::East), Coord::new(3, 2));
        assert_eq!(c.step(Direction::West), Coord::new(1, 2));
        assert_eq!(c.step(Direction::None), c);
    }

    #[test]
    fn index_round_trip_covers_all() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(5), None);
    }

    #[test]
    fn order_is_row_major() {
        let mut cs = vec![Coord::new(1, 1), Coord::new(0, 1), Coord::new(3, 0)];
        cs.sort();
        assert_eq!(cs, vec![Coord::new(3, 0), Coord::new(0, 1), Coord::new(1, 1)]);
    }

    #[test]
    fn distances() {
        let a = Coord::new(0, 0);
        let b = Coord::new(3, 4);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(a.chebyshev(b), 4);
        assert!((a.euclidean(b) - 5.0).abs() < 1e-12);
        assert!(a.is_adjacent(Coord::new(0, 1)));
        assert!(!a.is_adjacent(Coord::new(1, 1)));
    }

    proptest! {
        #[test]
        fn opposite_cancels(x in -50i32..50, y in -50i32..50, i in 0usize..5) {
            let d = Direction::ALL[i];
            let c = Coord::new(x, y);
            prop_assert_eq!(c.step(d).step(d.opposite()), c);
        }

        #[test]
        fn manhattan_is_symmetric(ax in -20i32..20, ay in -20i32..20, bx in -20i32..20, by in -20i32..20) {
            let a = Coord::new(ax, ay);
            let b = Coord::new(bx, by);
            prop_assert_eq!(a.manhattan(b), b.manhattan(a));
            prop_assert!(a.chebyshev(b) <= a.manhattan(b));
        }
    }
}
