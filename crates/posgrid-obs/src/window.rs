//! Viewer-centred observation windows.
//!
//! # Encoding
//!
//! The local frame maps a global cell to `global - viewer + radius`, so
//! everything the viewer can see lands in `[0, 2 * radius]` on both axes
//! and [`SENTINEL`] never collides with a real coordinate.
//!
//! Vector and tuple modes share one record layout:
//!
//! | record | values |
//! |---|---|
//! | self | `[radius, radius, self_attrs...]` |
//! | each class slot | `[x, y, attrs...]` or `[-1, -1, 0...]` when empty |
//! | terrain rows (optional) | `side` values, 1 where blocked or unseen |
//!
//! Grid mode emits `2 + classes` channels of `side * side` cells: the
//! viewer, one per class, and a final channel that is 1 wherever a cell is
//! blocked, off the grid, or not visible. An occupied cell holds the
//! first attribute of its entity, raised to at least 1 so that it never
//! reads as empty.

use posgrid_core::Coord;
use posgrid_grid::Grid;
use smallvec::SmallVec;

use crate::observation::{Observation, ObservationMode, Record};
use crate::space::ObservationSpace;

/// Coordinate value used for empty entity slots.
pub const SENTINEL: i32 = -1;

/// Which cells a viewer can see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Square window: Chebyshev distance at most `radius`.
    Square {
        /// Half-width of the window.
        radius: u32,
    },
    /// Euclidean disk of radius `max`, optionally requiring an
    /// unobstructed line of sight.
    Distance {
        /// Maximum observation distance.
        max: u32,
        /// Whether walls between viewer and target hide the target.
        line_of_sight: bool,
    },
}

impl Visibility {
    /// Half-extent of the local frame.
    pub fn radius(&self) -> u32 {
        match *self {
            Self::Square { radius } => radius,
            Self::Distance { max, .. } => max,
        }
    }

    /// Whether a viewer at `viewer` can see `target`.
    pub fn can_see(&self, grid: &Grid, viewer: Coord, target: Coord) -> bool {
        match *self {
            Self::Square { radius } => viewer.chebyshev(target) <= radius,
            Self::Distance { max, line_of_sight } => {
                grid.euclidean_distance(viewer, target) <= f64::from(max)
                    && (!line_of_sight || grid.line_of_sight(viewer, target))
            }
        }
    }
}

/// A kind of entity the window reports, with a fixed number of slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityClass {
    /// Name, used in rendering and debugging only.
    pub name: &'static str,
    /// Number of slots. Visible entities beyond this are dropped.
    pub capacity: usize,
    /// Upper bound of each attribute. Attributes are non-negative.
    pub attr_high: SmallVec<[i32; 2]>,
}

impl EntityClass {
    /// A class with `capacity` slots and no attributes.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            attr_high: SmallVec::new(),
        }
    }

    /// Add an attribute with values in `[0, high]`.
    pub fn with_attr(mut self, high: i32) -> Self {
        self.attr_high.push(high);
        self
    }

    /// Number of attributes per entity.
    pub fn n_attrs(&self) -> usize {
        self.attr_high.len()
    }
}

/// An entity in global coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    /// Global cell.
    pub coord: Coord,
    /// Attribute values, one per class attribute.
    pub attrs: SmallVec<[i32; 2]>,
}

impl Entity {
    /// An entity without attributes.
    pub fn at(coord: Coord) -> Self {
        Self {
            coord,
            attrs: SmallVec::new(),
        }
    }

    /// An entity with attributes.
    pub fn with_attrs(coord: Coord, attrs: &[i32]) -> Self {
        Self {
            coord,
            attrs: SmallVec::from_slice(attrs),
        }
    }
}

/// Derives fixed-shape partial observations from global positions.
///
/// Pure: the same grid, viewer and entities always give the same
/// observation. Within a class, visible entities are ordered by squared
/// Euclidean distance to the viewer, then by grid index.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationWindow {
    visibility: Visibility,
    mode: ObservationMode,
    self_attr_high: SmallVec<[i32; 2]>,
    classes: Vec<EntityClass>,
    terrain: bool,
}

impl ObservationWindow {
    /// A window with no entity classes.
    pub fn new(visibility: Visibility, mode: ObservationMode) -> Self {
        Self {
            visibility,
            mode,
            self_attr_high: SmallVec::new(),
            classes: Vec::new(),
            terrain: false,
        }
    }

    /// Report one of the viewer's own attributes, in `[0, high]`.
    pub fn with_self_attr(mut self, high: i32) -> Self {
        self.self_attr_high.push(high);
        self
    }

    /// Add an entity class. Classes are encoded in insertion order.
    pub fn with_class(mut self, class: EntityClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Append the local blocked-cell mask in vector and tuple modes.
    /// Grid mode always carries it.
    pub fn with_terrain(mut self, terrain: bool) -> Self {
        self.terrain = terrain;
        self
    }

    /// Visibility rule.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Serialisation mode.
    pub fn mode(&self) -> ObservationMode {
        self.mode
    }

    /// Entity classes in encoding order.
    pub fn classes(&self) -> &[EntityClass] {
        &self.classes
    }

    /// Side length of the local frame.
    pub fn side(&self) -> usize {
        2 * self.visibility.radius() as usize + 1
    }

    /// `coord` in the local frame of a viewer at `viewer`.
    pub fn to_local(&self, viewer: Coord, coord: Coord) -> Coord {
        let r = self.visibility.radius() as i32;
        Coord::new(coord.x - viewer.x + r, coord.y - viewer.y + r)
    }

    /// Entities visible from `viewer`, in slot order, not yet truncated
    /// to any capacity.
    pub fn visible_entities<'e>(
        &self,
        grid: &Grid,
        viewer: Coord,
        entities: &'e [Entity],
    ) -> Vec<&'e Entity> {
        let mut visible: Vec<&Entity> = entities
            .iter()
            .filter(|e| self.visibility.can_see(grid, viewer, e.coord))
            .collect();
        visible.sort_by_key(|e| {
            let dx = i64::from(e.coord.x - viewer.x);
            let dy = i64::from(e.coord.y - viewer.y);
            (dx * dx + dy * dy, e.coord)
        });
        visible
    }

    /// Observe from `viewer`.
    ///
    /// `self_attrs` holds one value per [`with_self_attr`](Self::with_self_attr)
    /// and `entities` one slice per class, in class order. The viewer
    /// should not appear in its own entity lists.
    ///
    /// # Panics
    ///
    /// Panics if `self_attrs` or `entities` do not match the configured
    /// attribute and class counts.
    pub fn observe(
        &self,
        grid: &Grid,
        viewer: Coord,
        self_attrs: &[i32],
        entities: &[&[Entity]],
    ) -> Observation {
        assert_eq!(
            self_attrs.len(),
            self.self_attr_high.len(),
            "self attribute count mismatch"
        );
        assert_eq!(entities.len(), self.classes.len(), "entity class count mismatch");

        let seen: Vec<Vec<&Entity>> = self
            .classes
            .iter()
            .zip(entities)
            .map(|(class, list)| {
                let mut v = self.visible_entities(grid, viewer, list);
                v.truncate(class.capacity);
                v
            })
            .collect();

        match self.mode {
            ObservationMode::Grid => self.encode_grid(grid, viewer, self_attrs, &seen),
            ObservationMode::Tuple => {
                Observation::Tuple(self.encode_records(grid, viewer, self_attrs, &seen))
            }
            ObservationMode::Vector => Observation::Vector(
                self.encode_records(grid, viewer, self_attrs, &seen)
                    .into_iter()
                    .flatten()
                    .collect(),
            ),
        }
    }

    fn encode_records(
        &self,
        grid: &Grid,
        viewer: Coord,
        self_attrs: &[i32],
        seen: &[Vec<&Entity>],
    ) -> Vec<Record> {
        let r = self.visibility.radius() as i32;
        let mut records = Vec::new();

        let mut own: Record = SmallVec::from_slice(&[r, r]);
        own.extend_from_slice(self_attrs);
        records.push(own);

        for (class, visible) in self.classes.iter().zip(seen) {
            for slot in 0..class.capacity {
                let mut rec = Record::new();
                match visible.get(slot) {
                    Some(e) => {
                        let local = self.to_local(viewer, e.coord);
                        rec.extend_from_slice(&[local.x, local.y]);
                        rec.extend((0..class.n_attrs()).map(|k| e.attrs.get(k).copied().unwrap_or(0)));
                    }
                    None => {
                        rec.extend_from_slice(&[SENTINEL, SENTINEL]);
                        rec.extend(std::iter::repeat_n(0, class.n_attrs()));
                    }
                }
                records.push(rec);
            }
        }

        if self.terrain {
            let side = self.side() as i32;
            for ly in 0..side {
                records.push(
                    (0..side)
                        .map(|lx| self.opaque(grid, viewer, Coord::new(lx, ly)))
                        .collect(),
                );
            }
        }
        records
    }

    fn encode_grid(
        &self,
        grid: &Grid,
        viewer: Coord,
        self_attrs: &[i32],
        seen: &[Vec<&Entity>],
    ) -> Observation {
        let side = self.side();
        let channels = self.classes.len() + 2;
        let plane = side * side;
        let mut data = vec![0; channels * plane];

        let centre = self.visibility.radius() as usize;
        data[centre * side + centre] = presence(self_attrs.first().copied());

        for (c, visible) in seen.iter().enumerate() {
            let offset = (c + 1) * plane;
            for e in visible {
                let local = self.to_local(viewer, e.coord);
                let idx = offset + local.y as usize * side + local.x as usize;
                data[idx] = data[idx].max(presence(e.attrs.first().copied()));
            }
        }

        let offset = (channels - 1) * plane;
        for ly in 0..side {
            for lx in 0..side {
                data[offset + ly * side + lx] =
                    self.opaque(grid, viewer, Coord::new(lx as i32, ly as i32));
            }
        }

        Observation::Grid {
            channels,
            height: side,
            width: side,
            data,
        }
    }

    /// 1 if the local cell is off-grid, blocked, or outside visibility.
    fn opaque(&self, grid: &Grid, viewer: Coord, local: Coord) -> i32 {
        let r = self.visibility.radius() as i32;
        let global = Coord::new(local.x + viewer.x - r, local.y + viewer.y - r);
        let hidden = !grid.contains(global)
            || grid.is_blocked(global)
            || !self.visibility.can_see(grid, viewer, global);
        i32::from(hidden)
    }

    /// The space every observation from this window belongs to.
    pub fn space(&self) -> ObservationSpace {
        let side = self.side();
        if self.mode == ObservationMode::Grid {
            let mut low = Vec::new();
            let mut high = Vec::new();
            let mut push_plane = |h: i32| {
                low.extend(std::iter::repeat_n(0, side * side));
                high.extend(std::iter::repeat_n(h, side * side));
            };
            push_plane(self.self_attr_high.first().copied().unwrap_or(1).max(1));
            for class in &self.classes {
                push_plane(class.attr_high.first().copied().unwrap_or(1).max(1));
            }
            push_plane(1);
            let channels = self.classes.len() + 2;
            return ObservationSpace::new(self.mode, vec![channels, side, side], low, high);
        }

        let r = self.visibility.radius() as i32;
        let mut records: Vec<Vec<(i32, i32)>> = Vec::new();
        let mut own = vec![(r, r), (r, r)];
        own.extend(self.self_attr_high.iter().map(|&h| (0, h)));
        records.push(own);
        for class in &self.classes {
            for _ in 0..class.capacity {
                let mut rec = vec![(SENTINEL, 2 * r), (SENTINEL, 2 * r)];
                rec.extend(class.attr_high.iter().map(|&h| (0, h)));
                records.push(rec);
            }
        }
        if self.terrain {
            for _ in 0..side {
                records.push(vec![(0, 1); side]);
            }
        }

        let shape = match self.mode {
            ObservationMode::Vector => vec![records.iter().map(Vec::len).sum()],
            _ => records.iter().map(Vec::len).collect(),
        };
        let (low, high) = records.into_iter().flatten().unzip();
        ObservationSpace::new(self.mode, shape, low, high)
    }
}

/// Grid-mode cell value of an entity: its first attribute, at least 1.
fn presence(attr: Option<i32>) -> i32 {
    attr.unwrap_or(1).max(1)
}
