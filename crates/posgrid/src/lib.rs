//! posgrid: multi-agent partially observable grid-world environments.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all posgrid sub-crates. For most users, adding `posgrid` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use posgrid::prelude::*;
//!
//! let registry = grid_world_registry().unwrap();
//! let mut env = registry.make("TwoPaths7x7-v0").unwrap();
//! let obs = env.reset(Some(42)).unwrap();
//! assert_eq!(obs.len(), 2);
//!
//! // Both agents head north.
//! let actions: JointAction<usize> = env
//!     .agents()
//!     .into_iter()
//!     .map(|agent| (agent, Direction::North.index()))
//!     .collect();
//! let out = env.step(actions).unwrap();
//! assert!(!out.all_done);
//! assert_eq!(env.status(), EnvStatus::Ready);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `posgrid-core` | ids, coordinates, errors, spaces, joint types, `PosgModel` |
//! | [`grid`] | `posgrid-grid` | `Grid`, named layouts, collision resolution |
//! | [`obs`] | `posgrid-obs` | observation windows and spaces |
//! | [`engine`] | `posgrid-engine` | the `Env` driver, `Environment` trait, wrappers |
//! | [`envs`] | `posgrid-envs` | bundled games and registries |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and ids (`posgrid-core`).
///
/// Contains [`types::PosgModel`], the [`types::Space`] capability trait,
/// joint action/observation maps and the error types.
pub use posgrid_core as types;

/// Grids, layouts, and simultaneous-move resolution (`posgrid-grid`).
pub use posgrid_grid as grid;

/// Observation windows, encodings, and spaces (`posgrid-obs`).
pub use posgrid_obs as obs;

/// Environment driver and wrappers (`posgrid-engine`).
///
/// [`engine::Env`] runs any [`types::PosgModel`] through the
/// reset/step lifecycle.
pub use posgrid_engine as engine;

/// Bundled games and id registries (`posgrid-envs`).
pub use posgrid_envs as envs;

/// Common imports for typical posgrid usage.
///
/// ```rust
/// use posgrid::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use posgrid_core::{
        seeded_rng, AgentId, Coord, Direction, Discrete, EnvStatus, JointAction,
        JointObservation, JointReward, Outcome, PosgModel, RewardRange, SimRng, Space, StepId,
    };

    // Errors
    pub use posgrid_core::{ConfigError, EnvError};

    // Grid
    pub use posgrid_grid::{CollisionResolver, Grid, MovementRules};

    // Observation
    pub use posgrid_obs::{Observation, ObservationMode, ObservationSpace, ObservationWindow};

    // Engine
    pub use posgrid_engine::{Env, EnvConfig, Environment, RenderMode, StepOutput};

    // Games
    pub use posgrid_envs::{classic_registry, grid_world_registry, Registry, RegistryError};
}
