//! The static grid map.

use std::collections::{HashSet, VecDeque};
use std::fmt::Write as _;

use indexmap::IndexMap;
use posgrid_core::{Coord, Direction, NoFreeCellError, SimRng};
use rand::Rng;
use smallvec::SmallVec;

use crate::error::GridError;

/// Rejection-sampling attempts before `sample_free_coord` falls back to
/// an exhaustive scan of the grid.
const MAX_REJECTION_TRIES: usize = 64;

/// Distance metric selector for [`Grid::distance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// L1 distance, used for movement.
    Manhattan,
    /// Straight-line distance, used for visibility.
    Euclidean,
}

/// A rectangular map of free and blocked cells.
///
/// Cells are addressed by [`Coord`] with `0 <= x < width` and
/// `0 <= y < height`. The grid index of `(x, y)` is `y * width + x`, so
/// ascending index is the row-major [`Coord`] order.
///
/// A grid is immutable after construction and may carry named lists of
/// start cells. Layouts parsed with [`Grid::from_layout`] name those lists
/// by the character that marks them.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    blocked: Vec<bool>,
    starts: IndexMap<char, Vec<Coord>>,
}

impl Grid {
    /// Maximum width or height. Keeps `width * height` and every
    /// coordinate comfortably inside `i32`.
    pub const MAX_DIM: u32 = 1 << 15;

    /// Create a grid with the given blocked cells.
    ///
    /// # Examples
    ///
    /// ```
    /// use posgrid_core::Coord;
    /// use posgrid_grid::Grid;
    ///
    /// let grid = Grid::new(3, 2, [Coord::new(1, 0)]).unwrap();
    /// assert!(grid.is_blocked(Coord::new(1, 0)));
    /// assert_eq!(grid.free_cell_count(), 5);
    /// ```
    pub fn new(
        width: u32,
        height: u32,
        blocked: impl IntoIterator<Item = Coord>,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        for (name, value) in [("width", width), ("height", height)] {
            if value > Self::MAX_DIM {
                return Err(GridError::DimensionTooLarge {
                    name,
                    value,
                    max: Self::MAX_DIM,
                });
            }
        }
        let mut grid = Self {
            width,
            height,
            blocked: vec![false; width as usize * height as usize],
            starts: IndexMap::new(),
        };
        for coord in blocked {
            let idx = grid.checked_index(coord)?;
            grid.blocked[idx] = true;
        }
        Ok(grid)
    }

    /// Create a grid with no blocked cells.
    pub fn open(width: u32, height: u32) -> Result<Self, GridError> {
        Self::new(width, height, std::iter::empty())
    }

    /// Parse an ASCII map.
    ///
    /// `#` marks a blocked cell and `.` a free one. Any other
    /// non-whitespace character marks a free cell and appends it to the
    /// start list named by that character. Blank lines and surrounding
    /// whitespace are ignored.
    ///
    /// ```
    /// use posgrid_core::Coord;
    /// use posgrid_grid::Grid;
    ///
    /// let grid = Grid::from_layout("
    ///     a.#
    ///     ..b
    /// ").unwrap();
    /// assert_eq!((grid.width(), grid.height()), (3, 2));
    /// assert_eq!(grid.start_positions('b'), &[Coord::new(2, 1)]);
    /// ```
    pub fn from_layout(layout: &str) -> Result<Self, GridError> {
        let rows: Vec<Vec<char>> = layout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.chars().collect())
            .collect();
        let expected = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(GridError::RaggedLayout {
                row,
                expected,
                found: r.len(),
            });
        }
        let width = u32::try_from(expected).unwrap_or(u32::MAX);
        let height = u32::try_from(rows.len()).unwrap_or(u32::MAX);

        let mut blocked = Vec::new();
        let mut starts: IndexMap<char, Vec<Coord>> = IndexMap::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, &ch) in row.iter().enumerate() {
                let coord = Coord::new(x as i32, y as i32);
                match ch {
                    '#' => blocked.push(coord),
                    '.' => {}
                    other => starts.entry(other).or_default().push(coord),
                }
            }
        }
        let mut grid = Self::new(width, height, blocked)?;
        grid.starts = starts;
        Ok(grid)
    }

    /// Attach (or replace) the start list named `name`.
    pub fn with_start_positions(
        mut self,
        name: char,
        coords: Vec<Coord>,
    ) -> Result<Self, GridError> {
        for &c in &coords {
            self.checked_index(c)?;
        }
        self.starts.insert(name, coords);
        Ok(self)
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells, blocked or not.
    pub fn cell_count(&self) -> usize {
        self.blocked.len()
    }

    /// Whether `coord` lies inside the grid.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    /// Grid index of `coord`, or `None` when out of bounds.
    pub fn index(&self, coord: Coord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    fn checked_index(&self, coord: Coord) -> Result<usize, GridError> {
        self.index(coord).ok_or(GridError::CoordOutOfBounds {
            coord,
            width: self.width,
            height: self.height,
        })
    }

    /// Coordinate of grid index `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= cell_count()`.
    pub fn coord_at(&self, idx: usize) -> Coord {
        assert!(idx < self.cell_count(), "grid index {idx} out of range");
        let w = self.width as usize;
        Coord::new((idx % w) as i32, (idx / w) as i32)
    }

    /// Whether `coord` is an obstacle.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is out of bounds. Callers check
    /// [`contains`](Self::contains) first.
    pub fn is_blocked(&self, coord: Coord) -> bool {
        match self.index(coord) {
            Some(idx) => self.blocked[idx],
            None => panic!(
                "is_blocked({coord}) outside {}x{} grid",
                self.width, self.height
            ),
        }
    }

    /// Whether `coord` is in bounds and not blocked.
    pub fn is_free(&self, coord: Coord) -> bool {
        self.index(coord).is_some_and(|idx| !self.blocked[idx])
    }

    /// `coord` shifted one cell in `direction`. May be out of bounds.
    pub fn neighbor(&self, coord: Coord, direction: Direction) -> Coord {
        coord.step(direction)
    }

    /// Free 4-connected neighbours of `coord`, in [`Direction::CARDINAL`] order.
    pub fn neighbours(&self, coord: Coord) -> SmallVec<[Coord; 4]> {
        Direction::CARDINAL
            .iter()
            .map(|&d| coord.step(d))
            .filter(|&c| self.is_free(c))
            .collect()
    }

    /// L1 distance between two cells.
    pub fn manhattan_distance(&self, a: Coord, b: Coord) -> u32 {
        a.manhattan(b)
    }

    /// Euclidean distance between two cell centres.
    pub fn euclidean_distance(&self, a: Coord, b: Coord) -> f64 {
        a.euclidean(b)
    }

    /// Distance under `metric`.
    pub fn distance(&self, a: Coord, b: Coord, metric: Metric) -> f64 {
        match metric {
            Metric::Manhattan => f64::from(self.manhattan_distance(a, b)),
            Metric::Euclidean => self.euclidean_distance(a, b),
        }
    }

    /// Whether no blocked cell lies strictly between `a` and `b` on the
    /// Bresenham line joining them. Endpoints are not checked.
    pub fn line_of_sight(&self, a: Coord, b: Coord) -> bool {
        let dx = (b.x - a.x).abs();
        let dy = -(b.y - a.y).abs();
        let sx = if a.x < b.x { 1 } else { -1 };
        let sy = if a.y < b.y { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (a.x, a.y);
        loop {
            if x == b.x && y == b.y {
                return true;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            if x == b.x && y == b.y {
                return true;
            }
            if !self.is_free(Coord::new(x, y)) {
                return false;
            }
        }
    }

    /// All unblocked cells in ascending grid index.
    pub fn free_coords(&self) -> Vec<Coord> {
        (0..self.cell_count())
            .filter(|&i| !self.blocked[i])
            .map(|i| self.coord_at(i))
            .collect()
    }

    /// Number of unblocked cells.
    pub fn free_cell_count(&self) -> usize {
        self.blocked.iter().filter(|b| !**b).count()
    }

    /// Start list named `name`, or an empty slice.
    pub fn start_positions(&self, name: char) -> &[Coord] {
        self.starts.get(&name).map_or(&[], Vec::as_slice)
    }

    /// Names of all start lists, in layout order.
    pub fn start_names(&self) -> impl Iterator<Item = char> + '_ {
        self.starts.keys().copied()
    }

    /// Uniformly sample an unblocked cell not in `exclude`.
    ///
    /// Tries bounded rejection sampling first, then scans the whole grid,
    /// so the call fails only when no such cell exists.
    pub fn sample_free_coord(
        &self,
        exclude: &HashSet<Coord>,
        rng: &mut SimRng,
    ) -> Result<Coord, NoFreeCellError> {
        for _ in 0..MAX_REJECTION_TRIES {
            let coord = self.coord_at(rng.random_range(0..self.cell_count()));
            if !self.is_blocked(coord) && !exclude.contains(&coord) {
                return Ok(coord);
            }
        }
        tracing::trace!(
            excluded = exclude.len(),
            "rejection sampling exhausted; scanning free cells"
        );
        let candidates: Vec<Coord> = self
            .free_coords()
            .into_iter()
            .filter(|c| !exclude.contains(c))
            .collect();
        self.pick(&candidates, exclude, rng)
    }

    /// Uniformly sample a cell from the start list `name` that is not in
    /// `exclude`.
    pub fn sample_start_coord(
        &self,
        name: char,
        exclude: &HashSet<Coord>,
        rng: &mut SimRng,
    ) -> Result<Coord, NoFreeCellError> {
        let candidates: Vec<Coord> = self
            .start_positions(name)
            .iter()
            .copied()
            .filter(|c| !exclude.contains(c))
            .collect();
        self.pick(&candidates, exclude, rng)
    }

    fn pick(
        &self,
        candidates: &[Coord],
        exclude: &HashSet<Coord>,
        rng: &mut SimRng,
    ) -> Result<Coord, NoFreeCellError> {
        if candidates.is_empty() {
            return Err(NoFreeCellError {
                excluded: exclude.len(),
                free_cells: self.free_cell_count(),
            });
        }
        Ok(candidates[rng.random_range(0..candidates.len())])
    }

    /// Shortest-path move counts from `from` to every cell, indexed by
    /// grid index. Blocked and unreachable cells are `None`.
    pub fn bfs_distances(&self, from: Coord) -> Vec<Option<u32>> {
        let mut dist = vec![None; self.cell_count()];
        let Some(start) = self.index(from) else {
            return dist;
        };
        dist[start] = Some(0);
        let mut queue = VecDeque::from([(from, 0u32)]);
        while let Some((cur, d)) = queue.pop_front() {
            for next in self.neighbours(cur) {
                if let Some(idx) = self.index(next) {
                    if dist[idx].is_none() {
                        dist[idx] = Some(d + 1);
                        queue.push_back((next, d + 1));
                    }
                }
            }
        }
        dist
    }

    /// ASCII picture of the grid with `overlay` characters drawn on top.
    /// Later overlay entries win over earlier ones on the same cell.
    pub fn render(&self, overlay: &[(Coord, char)]) -> String {
        let mut cells: Vec<char> = self
            .blocked
            .iter()
            .map(|&b| if b { '#' } else { '.' })
            .collect();
        for &(coord, ch) in overlay {
            if let Some(idx) = self.index(coord) {
                cells[idx] = ch;
            }
        }
        let mut out = String::with_capacity(cells.len() + self.height as usize);
        for row in cells.chunks(self.width as usize) {
            let line: String = row.iter().collect();
            let _ = writeln!(out, "{line}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgrid_core::seeded_rng;
    use proptest::prelude::*;

    fn walled() -> Grid {
        Grid::from_layout(
            "
            .....
            .###.
            ..#..
            .....
            ",
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_empty_and_out_of_bounds() {
        assert_eq!(Grid::open(0, 3).unwrap_err(), GridError::EmptyGrid);
        assert!(matches!(
            Grid::new(3, 3, [Coord::new(3, 0)]),
            Err(GridError::CoordOutOfBounds { .. })
        ));
        assert!(matches!(
            Grid::open(Grid::MAX_DIM + 1, 1),
            Err(GridError::DimensionTooLarge { name: "width", .. })
        ));
    }

    #[test]
    fn layout_parses_blocks_and_starts() {
        let g = Grid::from_layout("a#\n.b\nab").unwrap();
        assert_eq!((g.width(), g.height()), (2, 3));
        assert!(g.is_blocked(Coord::new(1, 0)));
        assert_eq!(
            g.start_positions('a'),
            &[Coord::new(0, 0), Coord::new(0, 2)]
        );
        assert!(g.start_positions('z').is_empty());
        assert_eq!(g.start_names().collect::<Vec<_>>(), vec!['a', 'b']);
    }

    #[test]
    fn layout_rejects_ragged_rows() {
        assert_eq!(
            Grid::from_layout("...\n..").unwrap_err(),
            GridError::RaggedLayout {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn index_is_row_major() {
        let g = Grid::open(4, 3).unwrap();
        assert_eq!(g.index(Coord::new(1, 2)), Some(9));
        assert_eq!(g.coord_at(9), Coord::new(1, 2));
        assert_eq!(g.index(Coord::new(4, 0)), None);
        assert_eq!(g.index(Coord::new(-1, 0)), None);
    }

    #[test]
    #[should_panic(expected = "outside 4x3 grid")]
    fn is_blocked_panics_out_of_bounds() {
        let g = Grid::open(4, 3).unwrap();
        g.is_blocked(Coord::new(0, 3));
    }

    #[test]
    fn neighbor_does_not_clip() {
        let g = Grid::open(2, 2).unwrap();
        assert_eq!(
            g.neighbor(Coord::new(0, 0), Direction::North),
            Coord::new(0, -1)
        );
        assert_eq!(
            g.neighbor(Coord::new(0, 0), Direction::None),
            Coord::new(0, 0)
        );
    }

    #[test]
    fn neighbours_skip_walls_and_edges() {
        let g = walled();
        let n = g.neighbours(Coord::new(0, 0));
        assert_eq!(n.as_slice(), &[Coord::new(0, 1), Coord::new(1, 0)]);
        let n = g.neighbours(Coord::new(1, 0));
        assert_eq!(n.as_slice(), &[Coord::new(2, 0), Coord::new(0, 0)]);
    }

    #[test]
    fn distances() {
        let g = Grid::open(5, 5).unwrap();
        let a = Coord::new(0, 0);
        let b = Coord::new(3, 4);
        assert_eq!(g.manhattan_distance(a, b), 7);
        assert_eq!(g.euclidean_distance(a, b), 5.0);
        assert_eq!(g.distance(a, b, Metric::Manhattan), 7.0);
    }

    #[test]
    fn line_of_sight_blocked_by_wall() {
        let g = walled();
        assert!(!g.line_of_sight(Coord::new(2, 0), Coord::new(2, 3)));
        assert!(g.line_of_sight(Coord::new(0, 0), Coord::new(4, 0)));
        assert!(g.line_of_sight(Coord::new(0, 0), Coord::new(0, 3)));
        // Adjacent cells see each other even next to walls.
        assert!(g.line_of_sight(Coord::new(1, 2), Coord::new(1, 3)));
    }

    #[test]
    fn line_of_sight_ignores_endpoints() {
        let g = walled();
        assert!(g.line_of_sight(Coord::new(1, 0), Coord::new(1, 1)));
    }

    #[test]
    fn sample_free_coord_respects_exclusions() {
        let g = Grid::new(2, 2, [Coord::new(0, 0)]).unwrap();
        let exclude: HashSet<Coord> = [Coord::new(1, 0), Coord::new(0, 1)].into();
        let mut rng = seeded_rng(3);
        for _ in 0..20 {
            assert_eq!(g.sample_free_coord(&exclude, &mut rng), Ok(Coord::new(1, 1)));
        }
    }

    #[test]
    fn sample_free_coord_fails_when_full() {
        let g = Grid::new(2, 1, [Coord::new(0, 0)]).unwrap();
        let exclude: HashSet<Coord> = [Coord::new(1, 0)].into();
        let err = g.sample_free_coord(&exclude, &mut seeded_rng(0)).unwrap_err();
        assert_eq!(
            err,
            NoFreeCellError {
                excluded: 1,
                free_cells: 1
            }
        );
    }

    #[test]
    fn sample_free_coord_finds_needle_in_large_grid() {
        // One free cell among 10 000 defeats rejection sampling.
        let blocked = (0..100)
            .flat_map(|y| (0..100).map(move |x| Coord::new(x, y)))
            .filter(|&c| c != Coord::new(57, 31));
        let g = Grid::new(100, 100, blocked).unwrap();
        let c = g.sample_free_coord(&HashSet::new(), &mut seeded_rng(9)).unwrap();
        assert_eq!(c, Coord::new(57, 31));
    }

    #[test]
    fn sample_start_coord_uses_named_list() {
        let g = Grid::from_layout("s.s\n...").unwrap();
        let mut rng = seeded_rng(1);
        let exclude: HashSet<Coord> = [Coord::new(0, 0)].into();
        assert_eq!(
            g.sample_start_coord('s', &exclude, &mut rng),
            Ok(Coord::new(2, 0))
        );
        assert!(g.sample_start_coord('q', &exclude, &mut rng).is_err());
    }

    #[test]
    fn bfs_routes_around_walls() {
        let g = walled();
        let d = g.bfs_distances(Coord::new(2, 0));
        assert_eq!(d[g.index(Coord::new(2, 3)).unwrap()], Some(7));
        assert_eq!(d[g.index(Coord::new(1, 2)).unwrap()], Some(5));
        assert_eq!(d[g.index(Coord::new(2, 1)).unwrap()], None);
        assert_eq!(d[g.index(Coord::new(2, 0)).unwrap()], Some(0));
    }

    #[test]
    fn render_draws_overlay() {
        let g = Grid::from_layout("..\n#.").unwrap();
        let s = g.render(&[(Coord::new(1, 1), 'A'), (Coord::new(0, 0), 'B')]);
        assert_eq!(s, "B.\n#A\n");
    }

    proptest! {
        #[test]
        fn sampled_coords_are_free(seed in any::<u64>(), w in 1u32..12, h in 1u32..12) {
            let g = Grid::new(w, h, (0..w as i32).map(|x| Coord::new(x, 0)).step_by(2)).unwrap();
            let mut rng = seeded_rng(seed);
            match g.sample_free_coord(&HashSet::new(), &mut rng) {
                Ok(c) => prop_assert!(g.is_free(c)),
                Err(_) => prop_assert_eq!(g.free_cell_count(), 0),
            }
        }

        #[test]
        fn line_of_sight_is_true_on_open_grid(
            ax in 0i32..8, ay in 0i32..8, bx in 0i32..8, by in 0i32..8
        ) {
            let g = Grid::open(8, 8).unwrap();
            prop_assert!(g.line_of_sight(Coord::new(ax, ay), Coord::new(bx, by)));
        }
    }
}
