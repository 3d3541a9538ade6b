//! Discrete grid maps and simultaneous movement for posgrid games.
//!
//! - [`Grid`]: static free/blocked map with distance, line-of-sight,
//!   path-length and free-cell sampling queries.
//! - [`layout`]: the named maps used by the bundled games.
//! - [`CollisionResolver`]: turns independently chosen moves into a
//!   consistent set of next positions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collision;
pub mod error;
pub mod grid;
pub mod layout;

pub use collision::{perturb_action, CollisionResolver, MoveOutcome, MovementRules, Resolution};
pub use error::GridError;
pub use grid::{Grid, Metric};
