//! PredatorPrey: a team of predators hunts prey that flee.
//!
//! Predators are the agents and move with [`Direction`] actions. Prey are
//! scripted entities. A prey is caught when at least `prey_strength`
//! predators stand orthogonally adjacent to it right after the predators
//! move. Surviving prey then each step to a random free neighbouring cell
//! (or stay), and while a predator is within sight they only pick cells
//! that do not bring them closer to the nearest predator.
//!
//! Each catch is worth `1 / num_prey`: shared by every predator in
//! cooperative mode, split among the adjacent predators otherwise. The
//! episode ends when every prey is caught.

use std::collections::HashSet;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, ConfigError, Coord, Direction, Discrete, EnvError, JointAction, JointObservation,
    JointReward, JointTimestep, PosgModel, RewardRange, SimRng, Space,
};
use posgrid_grid::layout::{self, PREDATOR_PREY};
use posgrid_grid::{CollisionResolver, Grid, MovementRules};
use posgrid_obs::{
    Entity, EntityClass, Observation, ObservationMode, ObservationSpace, ObservationWindow,
    Visibility,
};
use rand::Rng;
use smallvec::SmallVec;

use crate::common::{agent_ids, direction_of, flags, place_free};

/// Most predators the bundled maps accommodate.
pub const MAX_PREDATORS: usize = 8;

/// Configuration for [`PredatorPrey`].
#[derive(Clone, Debug, PartialEq)]
pub struct PredatorPreyConfig {
    /// Map name in [`PREDATOR_PREY`]. Default: `"10x10"`.
    pub grid_name: String,
    /// Number of predators (agents). Default: 2.
    pub num_predators: usize,
    /// Number of prey. Default: 3.
    pub num_prey: usize,
    /// Share every catch among all predators. Default: `true`.
    pub cooperative: bool,
    /// Adjacent predators needed for a catch, 1 to 4. Default: 1.
    pub prey_strength: usize,
    /// Sight radius of predators and prey. Default: 2.
    pub obs_dim: u32,
    /// Observation serialisation. Default: tuple.
    pub observation_mode: ObservationMode,
    /// Probability that a chosen action is executed. Default: 1.0.
    pub action_probs: f64,
}

impl Default for PredatorPreyConfig {
    fn default() -> Self {
        Self {
            grid_name: "10x10".into(),
            num_predators: 2,
            num_prey: 3,
            cooperative: true,
            prey_strength: 1,
            obs_dim: 2,
            observation_mode: ObservationMode::Tuple,
            action_probs: 1.0,
        }
    }
}

impl PredatorPreyConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        layout::lookup(PREDATOR_PREY, &self.grid_name)?;
        if !(1..=MAX_PREDATORS).contains(&self.num_predators) {
            return Err(ConfigError::invalid(
                "num_predators",
                format!("must be in 1..={MAX_PREDATORS}, got {}", self.num_predators),
            ));
        }
        if self.num_prey == 0 {
            return Err(ConfigError::invalid("num_prey", "must be at least 1"));
        }
        let max_strength = self.num_predators.min(4);
        if !(1..=max_strength).contains(&self.prey_strength) {
            return Err(ConfigError::invalid(
                "prey_strength",
                format!("must be in 1..={max_strength}, got {}", self.prey_strength),
            ));
        }
        if self.obs_dim == 0 {
            return Err(ConfigError::invalid("obs_dim", "must be at least 1"));
        }
        self.rules().validate()
    }

    fn rules(&self) -> MovementRules {
        MovementRules {
            action_probs: self.action_probs,
            ..MovementRules::default()
        }
    }
}

/// Positions of predators and prey.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredatorPreyState {
    /// Predator cells, in agent order.
    pub predators: Vec<Coord>,
    /// Predator cells before the last step.
    pub prev_predators: Vec<Coord>,
    /// Prey cells. A caught prey keeps its last cell.
    pub prey: Vec<Coord>,
    /// Which prey have been caught.
    pub caught: Vec<bool>,
}

impl PredatorPreyState {
    /// Cells of prey still at large.
    pub fn free_prey(&self) -> impl Iterator<Item = Coord> + '_ {
        self.prey
            .iter()
            .zip(&self.caught)
            .filter(|(_, &c)| !c)
            .map(|(&p, _)| p)
    }
}

/// The PredatorPrey game.
#[derive(Debug)]
pub struct PredatorPrey {
    config: PredatorPreyConfig,
    grid: Grid,
    horizon: u64,
    resolver: CollisionResolver,
    window: ObservationWindow,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl PredatorPrey {
    /// Build the game after validating `config`.
    pub fn new(config: PredatorPreyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let named = layout::lookup(PREDATOR_PREY, &config.grid_name)?;
        let grid = named.grid()?;
        let entities = config.num_predators + config.num_prey;
        if entities > grid.free_cell_count() {
            return Err(ConfigError::invalid(
                "num_prey",
                format!(
                    "{entities} entities do not fit on {} free cells",
                    grid.free_cell_count()
                ),
            ));
        }
        let window = ObservationWindow::new(
            Visibility::Square {
                radius: config.obs_dim,
            },
            config.observation_mode,
        )
        .with_class(EntityClass::new("predator", config.num_predators - 1))
        .with_class(EntityClass::new("prey", config.num_prey))
        .with_terrain(true);
        let obs_space = window.space();
        Ok(Self {
            horizon: named.max_episode_steps,
            resolver: CollisionResolver::new(config.rules())?,
            grid,
            window,
            agents: agent_ids(config.num_predators),
            actions: Discrete::new(Direction::ALL.len()),
            obs_space,
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &PredatorPreyConfig {
        &self.config
    }

    /// The map.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Episode length the map was tuned for.
    pub fn default_max_episode_steps(&self) -> u64 {
        self.horizon
    }

    /// Prey indices caught by `predators` this step, with the predators
    /// adjacent to each.
    fn catches(&self, predators: &[Coord], state: &PredatorPreyState) -> Vec<(usize, Vec<usize>)> {
        let mut out = Vec::new();
        for (i, &prey) in state.prey.iter().enumerate() {
            if state.caught[i] {
                continue;
            }
            let adjacent: Vec<usize> = predators
                .iter()
                .enumerate()
                .filter(|(_, p)| p.manhattan(prey) == 1)
                .map(|(j, _)| j)
                .collect();
            if adjacent.len() >= self.config.prey_strength {
                out.push((i, adjacent));
            }
        }
        out
    }

    /// Move every surviving prey in index order.
    fn move_prey(
        &self,
        predators: &[Coord],
        prey: &[Coord],
        caught: &[bool],
        rng: &mut SimRng,
    ) -> Vec<Coord> {
        let mut occupied: HashSet<Coord> = predators.iter().copied().collect();
        occupied.extend(
            prey.iter()
                .zip(caught)
                .filter(|(_, &c)| !c)
                .map(|(&p, _)| p),
        );
        let mut next = prey.to_vec();
        for (i, &here) in prey.iter().enumerate() {
            if caught[i] {
                continue;
            }
            occupied.remove(&here);
            let mut options: SmallVec<[Coord; 5]> = self
                .grid
                .neighbours(here)
                .into_iter()
                .filter(|c| !occupied.contains(c))
                .collect();
            options.push(here);

            let nearest = |c: Coord| predators.iter().map(|p| p.manhattan(c)).min();
            if let Some(d) = nearest(here).filter(|&d| d <= self.config.obs_dim) {
                options.retain(|c| nearest(*c).is_none_or(|n| n >= d));
            }
            let pick = options[rng.random_range(0..options.len())];
            occupied.insert(pick);
            next[i] = pick;
        }
        next
    }

    fn observe(&self, state: &PredatorPreyState) -> JointObservation<Observation> {
        let prey: Vec<Entity> = state.free_prey().map(Entity::at).collect();
        self.agents
            .iter()
            .map(|&agent| {
                let me = state.predators[agent.index()];
                let others: Vec<Entity> = state
                    .predators
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != agent.index())
                    .map(|(_, &c)| Entity::at(c))
                    .collect();
                let obs = self
                    .window
                    .observe(&self.grid, me, &[], &[&others[..], &prey[..]]);
                (agent, obs)
            })
            .collect()
    }
}

impl PosgModel for PredatorPrey {
    type State = PredatorPreyState;
    type Action = usize;
    type Obs = Observation;

    fn possible_agents(&self) -> &[AgentId] {
        &self.agents
    }

    fn action_space(&self, _agent: AgentId) -> &dyn Space<usize> {
        &self.actions
    }

    fn observation_space(&self, _agent: AgentId) -> &dyn Space<Observation> {
        &self.obs_space
    }

    fn reward_range(&self, _agent: AgentId) -> RewardRange {
        RewardRange::new(0.0, 1.0)
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<PredatorPreyState, EnvError> {
        let mut taken = HashSet::new();
        let predators = place_free(&self.grid, self.config.num_predators, &mut taken, rng)?;
        let prey = place_free(&self.grid, self.config.num_prey, &mut taken, rng)?;
        Ok(PredatorPreyState {
            prev_predators: predators.clone(),
            predators,
            caught: vec![false; prey.len()],
            prey,
        })
    }

    fn sample_initial_obs(&self, state: &PredatorPreyState) -> JointObservation<Observation> {
        self.observe(state)
    }

    fn step(
        &self,
        state: &PredatorPreyState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<PredatorPreyState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let mut chosen: Vec<usize> = self.agents.iter().map(|a| actions[a]).collect();
        self.resolver
            .perturb_actions(&mut chosen, self.actions.n(), rng);

        // Surviving prey hold their cells against predators.
        let mut current = state.predators.clone();
        let mut dirs: Vec<Direction> = chosen.into_iter().map(direction_of).collect();
        for p in state.free_prey() {
            current.push(p);
            dirs.push(Direction::None);
        }
        let mut predators = self.resolver.resolve(&self.grid, &current, &dirs).positions;
        predators.truncate(self.config.num_predators);

        let per_prey = 1.0 / self.config.num_prey as f64;
        let mut rewards: JointReward = self.agents.iter().map(|&a| (a, 0.0)).collect();
        let mut caught = state.caught.clone();
        for (i, adjacent) in self.catches(&predators, state) {
            caught[i] = true;
            tracing::trace!(prey = i, predators = ?adjacent, "prey caught");
            if self.config.cooperative {
                for r in rewards.values_mut() {
                    *r += per_prey;
                }
            } else {
                let share = per_prey / adjacent.len() as f64;
                for j in adjacent {
                    rewards[j] += share;
                }
            }
        }
        let prey = self.move_prey(&predators, &state.prey, &caught, rng);

        let done = caught.iter().all(|&c| c);
        let next = PredatorPreyState {
            prev_predators: state.predators.clone(),
            predators,
            prey,
            caught,
        };
        Ok(JointTimestep {
            observations: self.observe(&next),
            state: next,
            rewards,
            terminated: flags(&self.agents, done),
            truncated: flags(&self.agents, false),
            all_done: done,
            info: IndexMap::new(),
        })
    }

    fn render_ansi(&self, state: &PredatorPreyState) -> Option<String> {
        let mut overlay: Vec<(Coord, char)> = state.free_prey().map(|p| (p, 'p')).collect();
        overlay.extend(state.predators.iter().enumerate().map(|(i, &c)| {
            (c, char::from_digit(i as u32, 10).unwrap_or('P'))
        }));
        Some(self.grid.render(&overlay))
    }
}
