//! Bundled games for posgrid.
//!
//! Grid games share one shape: `usize` actions and
//! [`Observation`](posgrid_obs::Observation)s. TwoPaths, PredatorPrey
//! and PursuitEvasion number their moves like
//! [`Direction`](posgrid_core::Direction); LBF and Driving define their
//! own action constants.
//!
//! | Game | Agents | Ends when |
//! |---|---|---|
//! | [`TwoPaths`] | runner, chaser | capture or goal reached |
//! | [`PredatorPrey`] | N predators | every prey caught |
//! | [`LevelBasedForaging`] | N foragers | every food collected |
//! | [`PursuitEvasion`] | evader, pursuer | capture or goal reached |
//! | [`Driving`] | N cars | every car crashed or arrived |
//! | [`Mabc`] | N channel nodes | never |
//!
//! Each game is a pure [`PosgModel`](posgrid_core::PosgModel) built from a
//! validated config. [`Registry`] maps string ids to ready-made
//! environments.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod common;
pub mod driving;
pub mod lbf;
pub mod mabc;
pub mod predator_prey;
pub mod pursuit_evasion;
pub mod registry;
pub mod two_paths;

pub use driving::{Driving, DrivingConfig, DrivingState, Speed, Vehicle};
pub use lbf::{LbfConfig, LbfState, LevelBasedForaging};
pub use mabc::{Buffer, Mabc, MabcConfig, MabcState};
pub use predator_prey::{PredatorPrey, PredatorPreyConfig, PredatorPreyState};
pub use pursuit_evasion::{PursuitEvasion, PursuitEvasionConfig, PursuitEvasionState};
pub use registry::{classic_registry, grid_world_registry, BoxedEnv, Registry, RegistryError};
pub use two_paths::{TwoPaths, TwoPathsConfig, TwoPathsState};
