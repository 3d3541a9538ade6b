//! String ids for ready-made environments.
//!
//! A [`Registry`] is a plain value the host owns; nothing is global.
//! Each entry is a constructor closure with its game and driver config
//! captured, so [`Registry::make`] always builds a fresh environment.
//!
//! Ids follow the established naming, e.g. `TwoPaths7x7-v0`,
//! `PredatorPrey10x10-P2-p3-s2-coop-v0`, `LBFVector5x5-n2-f1-static-v2`,
//! `Driving7x7-n4HardInfinite-v0`.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use posgrid_core::{ConfigError, PosgModel};
use posgrid_engine::{Env, EnvConfig, Environment};
use posgrid_grid::layout::{DRIVING, PREDATOR_PREY, PURSUIT_EVASION, TWO_PATHS};
use posgrid_obs::{Observation, ObservationMode};

use crate::driving::{Driving, DrivingConfig};
use crate::lbf::{border_starts, food_lattice, LbfConfig, LevelBasedForaging};
use crate::mabc::{Mabc, MabcConfig};
use crate::predator_prey::{PredatorPrey, PredatorPreyConfig};
use crate::pursuit_evasion::{PursuitEvasion, PursuitEvasionConfig};
use crate::two_paths::{TwoPaths, TwoPathsConfig};

/// A type-erased environment handed out by a [`Registry`].
pub type BoxedEnv<A, O> = Box<dyn Environment<Action = A, Obs = O> + Send>;

type Constructor<A, O> = Box<dyn Fn() -> Result<BoxedEnv<A, O>, ConfigError> + Send + Sync>;

/// Errors from [`Registry`] lookups and registration.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryError {
    /// No environment is registered under this id.
    UnknownId {
        /// The requested id.
        id: String,
    },
    /// An environment is already registered under this id.
    DuplicateId {
        /// The contested id.
        id: String,
    },
    /// The registered configuration failed validation.
    Config(ConfigError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownId { id } => write!(f, "no environment registered as '{id}'"),
            Self::DuplicateId { id } => write!(f, "'{id}' is already registered"),
            Self::Config(e) => write!(f, "registered config rejected: {e}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RegistryError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Maps ids to environment constructors. Registration order is kept.
pub struct Registry<A, O> {
    entries: IndexMap<String, Constructor<A, O>>,
}

impl<A, O> Default for Registry<A, O> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<A, O> fmt::Debug for Registry<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<A, O> Registry<A, O>
where
    A: Clone + fmt::Debug + 'static,
    O: Clone + fmt::Debug + 'static,
{
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, make: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<BoxedEnv<A, O>, ConfigError> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(RegistryError::DuplicateId { id });
        }
        self.entries.insert(id, Box::new(make));
        Ok(())
    }

    /// Register a model constructor driven by an [`Env`] with `config`.
    pub fn register_model<M, F>(
        &mut self,
        id: impl Into<String>,
        config: EnvConfig,
        model: F,
    ) -> Result<(), RegistryError>
    where
        M: PosgModel<Action = A, Obs = O> + Send + 'static,
        M::State: Send,
        A: Send,
        F: Fn() -> Result<M, ConfigError> + Send + Sync + 'static,
    {
        self.register(id, move || {
            let env = Env::new(model()?, config.clone())?;
            Ok(Box::new(env) as BoxedEnv<A, O>)
        })
    }

    /// Build a fresh environment registered as `id`.
    pub fn make(&self, id: &str) -> Result<BoxedEnv<A, O>, RegistryError> {
        let make = self.entries.get(id).ok_or_else(|| RegistryError::UnknownId {
            id: id.to_string(),
        })?;
        tracing::debug!(id, "making environment");
        Ok(make()?)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every bundled grid game under its standard ids.
pub fn grid_world_registry() -> Result<Registry<usize, Observation>, RegistryError> {
    let mut reg = Registry::new();
    register_two_paths(&mut reg)?;
    register_pursuit_evasion(&mut reg)?;
    register_predator_prey(&mut reg)?;
    register_lbf(&mut reg)?;
    register_driving(&mut reg)?;
    tracing::debug!(ids = reg.len(), "grid world registry built");
    Ok(reg)
}

fn register_two_paths(reg: &mut Registry<usize, Observation>) -> Result<(), RegistryError> {
    for layout in TWO_PATHS {
        let name = layout.name;
        let steps = EnvConfig::with_max_episode_steps(layout.max_episode_steps);
        for (suffix, action_probs, infinite_horizon) in [
            ("", 1.0, false),
            ("Stochastic", 0.9, false),
            ("Infinite", 1.0, true),
            ("InfiniteStochastic", 0.9, true),
        ] {
            let env = if infinite_horizon {
                EnvConfig::default()
            } else {
                steps.clone()
            };
            reg.register_model(format!("TwoPaths{name}{suffix}-v0"), env, move || {
                TwoPaths::new(TwoPathsConfig {
                    grid_name: name.into(),
                    action_probs,
                    infinite_horizon,
                    ..TwoPathsConfig::default()
                })
            })?;
        }
    }
    Ok(())
}

fn register_pursuit_evasion(reg: &mut Registry<usize, Observation>) -> Result<(), RegistryError> {
    for layout in PURSUIT_EVASION {
        let name = layout.name;
        let env = EnvConfig::with_max_episode_steps(layout.max_episode_steps);
        for (suffix, action_probs) in [("", 1.0), ("Stochastic", 0.9)] {
            reg.register_model(
                format!("PursuitEvasion{name}{suffix}-v0"),
                env.clone(),
                move || {
                    PursuitEvasion::new(PursuitEvasionConfig {
                        grid_name: name.into(),
                        action_probs,
                        ..PursuitEvasionConfig::default()
                    })
                },
            )?;
        }
    }
    Ok(())
}

fn register_predator_prey(reg: &mut Registry<usize, Observation>) -> Result<(), RegistryError> {
    for layout in PREDATOR_PREY {
        let name = layout.name;
        let env = EnvConfig::with_max_episode_steps(layout.max_episode_steps);
        for cooperative in [true, false] {
            for prey_strength in 1..=4 {
                for num_prey in 1..=4 {
                    for num_predators in 2..=4 {
                        if prey_strength > num_predators {
                            continue;
                        }
                        let coop = if cooperative { "-coop" } else { "" };
                        let id = format!(
                            "PredatorPrey{name}-P{num_predators}-p{num_prey}-s{prey_strength}{coop}-v0"
                        );
                        reg.register_model(id, env.clone(), move || {
                            PredatorPrey::new(PredatorPreyConfig {
                                grid_name: name.into(),
                                num_predators,
                                num_prey,
                                cooperative,
                                prey_strength,
                                obs_dim: 2,
                                ..PredatorPreyConfig::default()
                            })
                        })?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn register_lbf(reg: &mut Registry<usize, Observation>) -> Result<(), RegistryError> {
    let env = EnvConfig::with_max_episode_steps(50);
    for size in [5u32, 10, 20] {
        for num_agents in [2usize, 4] {
            for max_food in [1usize, 3, 5, 7, 10] {
                for force_coop in [true, false] {
                    for static_layout in [true, false] {
                        if (static_layout && max_food > food_lattice(size).len())
                            || num_agents > border_starts(size).len()
                        {
                            continue;
                        }
                        let coop = if force_coop { "-coop" } else { "" };
                        let fixed = if static_layout { "-static" } else { "" };
                        let suffix = format!("{size}x{size}-n{num_agents}-f{max_food}{coop}{fixed}-v2");
                        for (prefix, observation_mode) in [
                            ("", ObservationMode::Tuple),
                            ("Vector", ObservationMode::Vector),
                            ("Grid", ObservationMode::Grid),
                        ] {
                            reg.register_model(
                                format!("LBF{prefix}{suffix}"),
                                env.clone(),
                                move || {
                                    LevelBasedForaging::new(LbfConfig {
                                        num_agents,
                                        max_agent_level: 3,
                                        field_size: size,
                                        max_food,
                                        sight: 2,
                                        force_coop,
                                        static_layout,
                                        normalize_reward: true,
                                        observation_mode,
                                        penalty: 0.0,
                                    })
                                },
                            )?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn register_driving(reg: &mut Registry<usize, Observation>) -> Result<(), RegistryError> {
    for layout in DRIVING {
        let name = layout.name;
        let steps = EnvConfig::with_max_episode_steps(layout.max_episode_steps);
        for num_agents in 2..=Driving::supported_num_agents(name)? {
            for (suffix, obstacle_collisions, infinite_horizon) in [
                ("", false, false),
                ("Infinite", false, true),
                ("Hard", true, false),
                ("HardInfinite", true, true),
            ] {
                let env = if infinite_horizon {
                    EnvConfig::default()
                } else {
                    steps.clone()
                };
                reg.register_model(format!("Driving{name}-n{num_agents}{suffix}-v0"), env, move || {
                    Driving::new(DrivingConfig {
                        grid_name: name.into(),
                        num_agents,
                        obs_dim: (3, 1, 1),
                        obstacle_collisions,
                        infinite_horizon,
                        ..DrivingConfig::default()
                    })
                })?;
            }
        }
    }
    Ok(())
}

/// Games without a grid.
pub fn classic_registry() -> Result<Registry<usize, usize>, RegistryError> {
    let mut reg = Registry::new();
    register_mabc(&mut reg)?;
    Ok(reg)
}

fn register_mabc(reg: &mut Registry<usize, usize>) -> Result<(), RegistryError> {
    reg.register_model("MABC-v0", EnvConfig::default(), || {
        Mabc::new(MabcConfig::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_duplicate_ids_are_errors() {
        let mut reg = classic_registry().unwrap();
        assert!(matches!(
            reg.make("MABC-v9"),
            Err(RegistryError::UnknownId { id }) if id == "MABC-v9"
        ));
        let again = reg.register_model("MABC-v0", EnvConfig::default(), || {
            Mabc::new(MabcConfig::default())
        });
        assert!(matches!(again, Err(RegistryError::DuplicateId { .. })));
    }

    #[test]
    fn bad_registered_config_surfaces_on_make() {
        let mut reg: Registry<usize, usize> = Registry::new();
        reg.register_model("MABC-1node-v0", EnvConfig::default(), || {
            Mabc::new(MabcConfig::with_nodes(1))
        })
        .unwrap();
        let Err(err) = reg.make("MABC-1node-v0") else {
            panic!("invalid config accepted");
        };
        assert!(matches!(err, RegistryError::Config(ConfigError::InvalidParameter { .. })));
        assert!(err.source().is_some());
    }

    #[test]
    fn two_paths_variants() {
        let reg = grid_world_registry().unwrap();
        for id in [
            "TwoPaths3x3-v0",
            "TwoPaths7x7-v0",
            "TwoPaths7x7Stochastic-v0",
            "TwoPaths7x7Infinite-v0",
            "TwoPaths7x7InfiniteStochastic-v0",
        ] {
            assert!(reg.contains(id), "{id}");
        }
    }

    #[test]
    fn predator_prey_strength_never_exceeds_predators() {
        let reg = grid_world_registry().unwrap();
        assert!(reg.contains("PredatorPrey10x10-P2-p3-s2-coop-v0"));
        assert!(reg.contains("PredatorPrey5x5-P4-p1-s4-v0"));
        assert!(!reg.contains("PredatorPrey10x10-P2-p3-s3-coop-v0"));
        let pp = reg.ids().filter(|id| id.starts_with("PredatorPrey")).count();
        // Per grid: (s1: 3 + s2: 3 + s3: 2 + s4: 1) strengths x 4 prey x 2 modes.
        assert_eq!(pp, 2 * 9 * 4 * 2);
    }

    #[test]
    fn lbf_skips_layouts_that_cannot_fit() {
        let reg = grid_world_registry().unwrap();
        assert!(reg.contains("LBF5x5-n2-f1-v2"));
        assert!(reg.contains("LBFVector10x10-n4-f10-coop-static-v2"));
        assert!(reg.contains("LBFGrid20x20-n2-f7-static-v2"));
        // A 5x5 static lattice holds 4 food.
        assert!(reg.contains("LBF5x5-n2-f5-v2"));
        assert!(!reg.contains("LBF5x5-n2-f5-static-v2"));
    }

    #[test]
    fn registration_conflicts_are_returned() {
        let mut reg = Registry::new();
        register_mabc(&mut reg).unwrap();
        assert_eq!(
            register_mabc(&mut reg),
            Err(RegistryError::DuplicateId {
                id: "MABC-v0".into()
            })
        );
        let mut grid = grid_world_registry().unwrap();
        assert!(matches!(
            register_driving(&mut grid),
            Err(RegistryError::DuplicateId { id }) if id == "Driving3x3-n2-v0"
        ));
    }

    #[test]
    fn driving_variants_per_car_count() {
        let reg = grid_world_registry().unwrap();
        for id in [
            "Driving3x3-n2-v0",
            "Driving3x3-n2Infinite-v0",
            "Driving3x3-n2Hard-v0",
            "Driving3x3-n2HardInfinite-v0",
            "Driving7x7-n4HardInfinite-v0",
        ] {
            assert!(reg.contains(id), "{id}");
        }
        assert!(!reg.contains("Driving3x3-n3-v0"));
        let driving = reg.ids().filter(|id| id.starts_with("Driving")).count();
        // 3x3: n2; 7x7: n2..=n4; four variants each.
        assert_eq!(driving, (1 + 3) * 4);
    }

    #[test]
    fn ids_keep_registration_order() {
        let reg = grid_world_registry().unwrap();
        assert_eq!(reg.ids().next(), Some("TwoPaths3x3-v0"));
        assert_eq!(reg.len(), reg.ids().count());
        assert!(!reg.is_empty());
    }
}
