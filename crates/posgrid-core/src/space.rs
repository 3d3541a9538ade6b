//! Action and observation spaces.
//!
//! A space is a capability object: the engine only ever asks it to
//! [`sample`](Space::sample) a value or to check whether a value is
//! [`contained`](Space::contains). Models declare one space per agent;
//! the driver uses `contains` to reject out-of-space actions before any
//! state is touched.

use std::any::Any;
use std::fmt;

use rand::Rng;

use crate::rng::SimRng;

/// A set of values of type `T` that can be sampled and tested.
///
/// Object safe: models hand out `&dyn Space<T>`. Callers that need more
/// than membership, e.g. bounds, recover the concrete space with
/// `downcast_ref`.
pub trait Space<T>: Any + fmt::Debug + Send + Sync + 'static {
    /// Draw a uniformly random member of the space.
    fn sample(&self, rng: &mut SimRng) -> T;

    /// Whether `value` is a member of the space.
    fn contains(&self, value: &T) -> bool;
}

impl<T: 'static> dyn Space<T> {
    /// Attempt to downcast a trait object to a concrete space type.
    pub fn downcast_ref<S: Space<T>>(&self) -> Option<&S> {
        (self as &dyn Any).downcast_ref::<S>()
    }
}

/// The integers `{0, 1, ..., n - 1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Discrete {
    n: usize,
}

impl Discrete {
    /// Create a space with `n` values.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`: an empty action set is a model construction bug.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Discrete space must have at least one element");
        Self { n }
    }

    /// Number of values in the space.
    pub fn n(&self) -> usize {
        self.n
    }
}

impl Space<usize> for Discrete {
    fn sample(&self, rng: &mut SimRng) -> usize {
        rng.random_range(0..self.n)
    }

    fn contains(&self, value: &usize) -> bool {
        *value < self.n
    }
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discrete({})", self.n)
    }
}
