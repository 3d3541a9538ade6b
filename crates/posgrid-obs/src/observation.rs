//! Observation values and serialisation modes.

use std::fmt;
use std::str::FromStr;

use posgrid_core::ConfigError;
use smallvec::SmallVec;

/// One fixed-length record: `[x, y, attrs...]` for an entity slot.
pub type Record = SmallVec<[i32; 4]>;

/// How an [`ObservationWindow`](crate::ObservationWindow) serialises what
/// it sees. Modes never change visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ObservationMode {
    /// All records concatenated into one flat vector.
    Vector,
    /// One record per slot.
    #[default]
    Tuple,
    /// Channel-major local grid centred on the viewer.
    Grid,
}

impl fmt::Display for ObservationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vector => "vector",
            Self::Tuple => "tuple",
            Self::Grid => "grid",
        })
    }
}

impl FromStr for ObservationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector" => Ok(Self::Vector),
            "tuple" => Ok(Self::Tuple),
            "grid" => Ok(Self::Grid),
            other => Err(ConfigError::invalid(
                "observation_mode",
                format!("expected vector, tuple or grid, got '{other}'"),
            )),
        }
    }
}

/// A single agent's observation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Observation {
    /// Flat integer vector.
    Vector(Vec<i32>),
    /// Sequence of records.
    Tuple(Vec<Record>),
    /// Channel-major grid: `data[(c * height + y) * width + x]`.
    Grid {
        /// Number of channels.
        channels: usize,
        /// Rows per channel.
        height: usize,
        /// Columns per channel.
        width: usize,
        /// Cell values.
        data: Vec<i32>,
    },
}

impl Observation {
    /// The mode this observation was encoded in.
    pub fn mode(&self) -> ObservationMode {
        match self {
            Self::Vector(_) => ObservationMode::Vector,
            Self::Tuple(_) => ObservationMode::Tuple,
            Self::Grid { .. } => ObservationMode::Grid,
        }
    }

    /// Shape of the observation.
    ///
    /// `[len]` for vectors, the record lengths for tuples, and
    /// `[channels, height, width]` for grids.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Vector(v) => vec![v.len()],
            Self::Tuple(records) => records.iter().map(|r| r.len()).collect(),
            Self::Grid {
                channels,
                height,
                width,
                ..
            } => vec![*channels, *height, *width],
        }
    }

    /// Every value in encoding order.
    pub fn flatten(&self) -> Vec<i32> {
        match self {
            Self::Vector(v) => v.clone(),
            Self::Tuple(records) => records.iter().flatten().copied().collect(),
            Self::Grid { data, .. } => data.clone(),
        }
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Vector(v) => v.len(),
            Self::Tuple(records) => records.iter().map(|r| r.len()).sum(),
            Self::Grid { data, .. } => data.len(),
        }
    }

    /// Whether the observation holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at channel `c`, local cell `(x, y)` of a grid observation.
    /// `None` for other modes or out-of-range indices.
    pub fn grid_value(&self, c: usize, x: usize, y: usize) -> Option<i32> {
        match self {
            Self::Grid {
                channels,
                height,
                width,
                data,
            } if c < *channels && y < *height && x < *width => {
                Some(data[(c * height + y) * width + x])
            }
            _ => None,
        }
    }
}
