//! Bounded, fixed-shape observation spaces.

use std::fmt;

use posgrid_core::{SimRng, Space};
use rand::Rng;

use crate::observation::{Observation, ObservationMode, Record};

/// Every [`Observation`] of one mode and shape whose values lie within
/// per-element bounds.
///
/// Bounds are stored flat, in [`Observation::flatten`] order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationSpace {
    mode: ObservationMode,
    shape: Vec<usize>,
    low: Vec<i32>,
    high: Vec<i32>,
}

impl ObservationSpace {
    /// Create a space.
    ///
    /// For [`ObservationMode::Grid`] the shape is `[channels, height, width]`;
    /// for tuples it lists the record lengths; for vectors it is `[len]`.
    ///
    /// # Panics
    ///
    /// Panics if `low` and `high` differ in length, do not match the number
    /// of elements implied by `shape`, or if any `low > high`.
    pub fn new(mode: ObservationMode, shape: Vec<usize>, low: Vec<i32>, high: Vec<i32>) -> Self {
        let size = match mode {
            ObservationMode::Grid => shape.iter().product(),
            ObservationMode::Vector | ObservationMode::Tuple => shape.iter().sum(),
        };
        assert_eq!(low.len(), size, "low bound length does not match shape");
        assert_eq!(high.len(), size, "high bound length does not match shape");
        assert!(
            low.iter().zip(&high).all(|(l, h)| l <= h),
            "low bound exceeds high bound"
        );
        Self {
            mode,
            shape,
            low,
            high,
        }
    }

    /// Encoding mode of member observations.
    pub fn mode(&self) -> ObservationMode {
        self.mode
    }

    /// Shape of member observations, as reported by [`Observation::shape`].
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Per-element lower bounds.
    pub fn low(&self) -> &[i32] {
        &self.low
    }

    /// Per-element upper bounds.
    pub fn high(&self) -> &[i32] {
        &self.high
    }

    /// Total number of values in a member observation.
    pub fn size(&self) -> usize {
        self.low.len()
    }
}

impl Space<Observation> for ObservationSpace {
    fn sample(&self, rng: &mut SimRng) -> Observation {
        let mut flat = self
            .low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| rng.random_range(l..=h));
        match self.mode {
            ObservationMode::Vector => Observation::Vector(flat.collect()),
            ObservationMode::Tuple => Observation::Tuple(
                self.shape
                    .iter()
                    .map(|&n| flat.by_ref().take(n).collect::<Record>())
                    .collect(),
            ),
            ObservationMode::Grid => Observation::Grid {
                channels: self.shape[0],
                height: self.shape[1],
                width: self.shape[2],
                data: flat.collect(),
            },
        }
    }

    fn contains(&self, value: &Observation) -> bool {
        value.mode() == self.mode
            && value.shape() == self.shape
            && value
                .flatten()
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| l <= v && v <= h)
    }
}

impl fmt::Display for ObservationSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservationSpace({}, {:?})", self.mode, self.shape)
    }
}
