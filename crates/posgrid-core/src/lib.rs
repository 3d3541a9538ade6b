//! Core types and traits for posgrid multi-agent environments.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by every other posgrid crate: agent identifiers,
//! grid coordinates and directions, error types, action/observation
//! spaces, joint step types, the simulation RNG, and the [`PosgModel`]
//! contract that concrete games implement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coord;
pub mod error;
pub mod id;
pub mod model;
pub mod rng;
pub mod space;
pub mod timestep;

pub use coord::{Coord, Direction};
pub use error::{ConfigError, EnvError, NoFreeCellError};
pub use id::{AgentId, EnvStatus, StepId};
pub use model::PosgModel;
pub use rng::{seeded_rng, SimRng};
pub use space::{Discrete, Space};
pub use timestep::{
    AgentFlags, AgentInfo, JointAction, JointObservation, JointReward, JointTimestep, Outcome,
    RewardRange,
};
