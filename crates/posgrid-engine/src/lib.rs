//! Environment driver for posgrid games.
//!
//! [`Env`] owns the current state and RNG of one episode and drives a
//! [`PosgModel`](posgrid_core::PosgModel) through the
//! `Uninitialized -> Ready -> Terminal` lifecycle. Everything callers
//! interact with goes through the object-safe [`Environment`] trait, which
//! the wrappers in [`wrappers`] also implement.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod env;
pub mod environment;
pub mod stats;
pub mod wrappers;

pub use config::EnvConfig;
pub use env::Env;
pub use environment::{Environment, RenderMode, StepOutput};
pub use stats::EpisodeStats;
pub use wrappers::{
    ActionTransform, ActionWrapper, DirectionActions, DirectionSpace, FlattenObservation,
    ObservationTransform, ObservationWrapper, RewardTransform, RewardWrapper, ScaleReward,
};
