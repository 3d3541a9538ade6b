//! Level-based foraging.
//!
//! Agents with skill levels collect food items with levels on an open
//! square field. Food is collected when the agents standing orthogonally
//! next to it and choosing [`LOAD`] have a summed level at least the
//! food's level. Each of them earns `own_level * food_level`, divided by
//! `loading_levels * spawned_food_levels` when rewards are normalised, so
//! a whole episode is worth 1 in total. Loaders around food they could
//! not lift pay `penalty`.
//!
//! Actions are [`NOOP`], [`NORTH`], [`SOUTH`], [`WEST`], [`EAST`] and
//! [`LOAD`], in that order. Food cells are impassable.
//!
//! Placement:
//! - agent levels are uniform in `1..=max_agent_level`;
//! - food levels are uniform between 1 (or the maximum, with
//!   `force_coop`) and the summed level of the three strongest agents;
//! - food sits on the interior of the field, never next to other food,
//!   and is spawned until `max_food` is reached or no cell is left;
//! - with `static_layout`, food fills the odd-coordinate lattice in order
//!   and agents start on even-coordinate border cells.

use std::collections::HashSet;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, ConfigError, Coord, Direction, Discrete, EnvError, JointAction, JointObservation,
    JointReward, JointTimestep, NoFreeCellError, PosgModel, RewardRange, SimRng, Space,
};
use posgrid_grid::{CollisionResolver, Grid};
use posgrid_obs::{
    Entity, EntityClass, Observation, ObservationMode, ObservationSpace, ObservationWindow,
    Visibility,
};
use rand::Rng;

use crate::common::{agent_ids, flags};

/// Stay put.
pub const NOOP: usize = 0;
/// Move up.
pub const NORTH: usize = 1;
/// Move down.
pub const SOUTH: usize = 2;
/// Move left.
pub const WEST: usize = 3;
/// Move right.
pub const EAST: usize = 4;
/// Pick up adjacent food.
pub const LOAD: usize = 5;

/// Movement of an LBF action. [`LOAD`] does not move.
pub fn action_direction(action: usize) -> Direction {
    match action {
        NORTH => Direction::North,
        SOUTH => Direction::South,
        WEST => Direction::West,
        EAST => Direction::East,
        _ => Direction::None,
    }
}

/// Agents counted towards the highest possible food level.
const STRONGEST_AGENTS: usize = 3;

/// Configuration for [`LevelBasedForaging`].
#[derive(Clone, Debug, PartialEq)]
pub struct LbfConfig {
    /// Number of agents. Default: 2.
    pub num_agents: usize,
    /// Highest agent level. Default: 3.
    pub max_agent_level: u32,
    /// Side length of the square field. Default: 10.
    pub field_size: u32,
    /// Most food items spawned per episode. Default: 3.
    pub max_food: usize,
    /// Square sight radius. Default: 2.
    pub sight: u32,
    /// Every food needs the strongest agents together. Default: `false`.
    pub force_coop: bool,
    /// Fixed food lattice and border starts. Default: `false`.
    pub static_layout: bool,
    /// Scale rewards so an episode sums to 1. Default: `true`.
    pub normalize_reward: bool,
    /// Observation serialisation. Default: tuple.
    pub observation_mode: ObservationMode,
    /// Paid by each loader around food it fails to lift. Default: 0.
    pub penalty: f64,
}

impl Default for LbfConfig {
    fn default() -> Self {
        Self {
            num_agents: 2,
            max_agent_level: 3,
            field_size: 10,
            max_food: 3,
            sight: 2,
            force_coop: false,
            static_layout: false,
            normalize_reward: true,
            observation_mode: ObservationMode::Tuple,
            penalty: 0.0,
        }
    }
}

impl LbfConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(ConfigError::invalid("num_agents", "must be at least 1"));
        }
        if self.max_agent_level == 0 {
            return Err(ConfigError::invalid("max_agent_level", "must be at least 1"));
        }
        if self.field_size < 3 {
            return Err(ConfigError::invalid(
                "field_size",
                format!("must be at least 3, got {}", self.field_size),
            ));
        }
        if self.max_food == 0 {
            return Err(ConfigError::invalid("max_food", "must be at least 1"));
        }
        if self.sight == 0 {
            return Err(ConfigError::invalid("sight", "must be at least 1"));
        }
        if self.penalty.is_nan() || self.penalty < 0.0 {
            return Err(ConfigError::invalid(
                "penalty",
                format!("must be non-negative, got {}", self.penalty),
            ));
        }
        if self.static_layout {
            let slots = food_lattice(self.field_size).len();
            if self.max_food > slots {
                return Err(ConfigError::invalid(
                    "max_food",
                    format!("static layout has {slots} food cells, got {}", self.max_food),
                ));
            }
            let starts = border_starts(self.field_size).len();
            if self.num_agents > starts {
                return Err(ConfigError::invalid(
                    "num_agents",
                    format!("static layout has {starts} start cells, got {}", self.num_agents),
                ));
            }
        } else {
            let cells = (self.field_size * self.field_size) as usize;
            if self.num_agents + self.max_food > cells {
                return Err(ConfigError::invalid(
                    "num_agents",
                    format!("agents and food do not fit on {cells} cells"),
                ));
            }
        }
        Ok(())
    }

    /// Highest level a food item can have.
    pub fn max_food_level(&self) -> u32 {
        self.max_agent_level * self.num_agents.min(STRONGEST_AGENTS) as u32
    }
}

/// Odd-coordinate interior cells, row-major.
pub(crate) fn food_lattice(size: u32) -> Vec<Coord> {
    let odd: Vec<i32> = (1..size as i32 - 1).step_by(2).collect();
    odd.iter()
        .flat_map(|&y| odd.iter().map(move |&x| Coord::new(x, y)))
        .collect()
}

/// Even-coordinate border cells, row-major.
pub(crate) fn border_starts(size: u32) -> Vec<Coord> {
    let last = size as i32 - 1;
    (0..size as i32)
        .flat_map(|y| (0..size as i32).map(move |x| Coord::new(x, y)))
        .filter(|c| c.x % 2 == 0 && c.y % 2 == 0)
        .filter(|c| c.x == 0 || c.y == 0 || c.x == last || c.y == last)
        .collect()
}

/// Agents and food on the field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LbfState {
    /// Agent cells, in agent order.
    pub agents: Vec<Coord>,
    /// Agent cells before the last step.
    pub prev_agents: Vec<Coord>,
    /// Agent levels.
    pub agent_levels: Vec<u32>,
    /// Food cells.
    pub food: Vec<Coord>,
    /// Food levels.
    pub food_levels: Vec<u32>,
    /// Which food items have been collected.
    pub eaten: Vec<bool>,
    /// Summed level of all food spawned this episode.
    pub food_spawned: u32,
}

impl LbfState {
    /// Food still on the field, with levels.
    pub fn remaining_food(&self) -> impl Iterator<Item = (Coord, u32)> + '_ {
        self.food
            .iter()
            .zip(&self.food_levels)
            .zip(&self.eaten)
            .filter(|(_, &e)| !e)
            .map(|((&c, &l), _)| (c, l))
    }
}

/// The level-based foraging game.
#[derive(Debug)]
pub struct LevelBasedForaging {
    config: LbfConfig,
    grid: Grid,
    resolver: CollisionResolver,
    window: ObservationWindow,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl LevelBasedForaging {
    /// Build the game after validating `config`.
    pub fn new(config: LbfConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::open(config.field_size, config.field_size)?;
        let level = config.max_agent_level as i32;
        let window = ObservationWindow::new(
            Visibility::Square {
                radius: config.sight,
            },
            config.observation_mode,
        )
        .with_self_attr(level)
        .with_class(
            EntityClass::new("food", config.max_food).with_attr(config.max_food_level() as i32),
        )
        .with_class(EntityClass::new("agent", config.num_agents - 1).with_attr(level));
        let obs_space = window.space();
        Ok(Self {
            grid,
            resolver: CollisionResolver::default(),
            window,
            agents: agent_ids(config.num_agents),
            actions: Discrete::new(LOAD + 1),
            obs_space,
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &LbfConfig {
        &self.config
    }

    /// The field.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn spawn_food(&self, rng: &mut SimRng) -> Vec<Coord> {
        if self.config.static_layout {
            let mut lattice = food_lattice(self.config.field_size);
            lattice.truncate(self.config.max_food);
            return lattice;
        }
        let last = self.config.field_size as i32 - 1;
        let mut food: Vec<Coord> = Vec::with_capacity(self.config.max_food);
        while food.len() < self.config.max_food {
            let candidates: Vec<Coord> = self
                .grid
                .free_coords()
                .into_iter()
                .filter(|c| c.x > 0 && c.y > 0 && c.x < last && c.y < last)
                .filter(|c| food.iter().all(|f| f.chebyshev(*c) > 1))
                .collect();
            if candidates.is_empty() {
                tracing::debug!(
                    spawned = food.len(),
                    requested = self.config.max_food,
                    "no room for more food"
                );
                break;
            }
            food.push(candidates[rng.random_range(0..candidates.len())]);
        }
        food
    }

    fn spawn_agents(&self, food: &[Coord], rng: &mut SimRng) -> Result<Vec<Coord>, EnvError> {
        let mut taken: HashSet<Coord> = food.iter().copied().collect();
        let mut agents = Vec::with_capacity(self.config.num_agents);
        if self.config.static_layout {
            let starts = border_starts(self.config.field_size);
            for _ in 0..self.config.num_agents {
                let open: Vec<Coord> = starts.iter().copied().filter(|c| !taken.contains(c)).collect();
                if open.is_empty() {
                    return Err(NoFreeCellError {
                        excluded: taken.len(),
                        free_cells: starts.len(),
                    }
                    .into());
                }
                let c = open[rng.random_range(0..open.len())];
                taken.insert(c);
                agents.push(c);
            }
        } else {
            for _ in 0..self.config.num_agents {
                let c = self.grid.sample_free_coord(&taken, rng)?;
                taken.insert(c);
                agents.push(c);
            }
        }
        Ok(agents)
    }

    fn observe(&self, state: &LbfState) -> JointObservation<Observation> {
        let food: Vec<Entity> = state
            .remaining_food()
            .map(|(c, l)| Entity::with_attrs(c, &[l as i32]))
            .collect();
        self.agents
            .iter()
            .map(|&agent| {
                let i = agent.index();
                let others: Vec<Entity> = state
                    .agents
                    .iter()
                    .zip(&state.agent_levels)
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, (&c, &l))| Entity::with_attrs(c, &[l as i32]))
                    .collect();
                let obs = self.window.observe(
                    &self.grid,
                    state.agents[i],
                    &[state.agent_levels[i] as i32],
                    &[&food[..], &others[..]],
                );
                (agent, obs)
            })
            .collect()
    }
}

impl PosgModel for LevelBasedForaging {
    type State = LbfState;
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
        // At most four food items border one agent.
        let low = -4.0 * self.config.penalty;
        if self.config.normalize_reward {
            RewardRange::new(low, 1.0)
        } else {
            let high = 4 * self.config.max_agent_level * self.config.max_food_level();
            RewardRange::new(low, f64::from(high))
        }
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<LbfState, EnvError> {
        let agent_levels: Vec<u32> = (0..self.config.num_agents)
            .map(|_| rng.random_range(1..=self.config.max_agent_level))
            .collect();
        let mut strongest = agent_levels.clone();
        strongest.sort_unstable_by(|a, b| b.cmp(a));
        let max_level: u32 = strongest.iter().take(STRONGEST_AGENTS).sum();
        let min_level = if self.config.force_coop { max_level } else { 1 };

        let food = self.spawn_food(rng);
        let food_levels: Vec<u32> = food
            .iter()
            .map(|_| rng.random_range(min_level..=max_level))
            .collect();
        let agents = self.spawn_agents(&food, rng)?;
        Ok(LbfState {
            prev_agents: agents.clone(),
            agents,
            agent_levels,
            eaten: vec![false; food.len()],
            food_spawned: food_levels.iter().sum(),
            food,
            food_levels,
        })
    }

    fn sample_initial_obs(&self, state: &LbfState) -> JointObservation<Observation> {
        self.observe(state)
    }

    fn step(
        &self,
        state: &LbfState,
        actions: &JointAction<usize>,
        _rng: &mut SimRng,
    ) -> Result<JointTimestep<LbfState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let chosen: Vec<usize> = self.agents.iter().map(|a| actions[a]).collect();

        let mut current = state.agents.clone();
        let mut dirs: Vec<Direction> = chosen.iter().map(|&a| action_direction(a)).collect();
        for (c, _) in state.remaining_food() {
            current.push(c);
            dirs.push(Direction::None);
        }
        let mut agents = self.resolver.resolve(&self.grid, &current, &dirs).positions;
        agents.truncate(self.config.num_agents);

        let mut rewards: JointReward = self.agents.iter().map(|&a| (a, 0.0)).collect();
        let mut eaten = state.eaten.clone();
        for (f, (&coord, &level)) in state.food.iter().zip(&state.food_levels).enumerate() {
            if eaten[f] {
                continue;
            }
            let loaders: Vec<usize> = (0..agents.len())
                .filter(|&i| chosen[i] == LOAD && agents[i].manhattan(coord) == 1)
                .collect();
            if loaders.is_empty() {
                continue;
            }
            let loading_level: u32 = loaders.iter().map(|&i| state.agent_levels[i]).sum();
            if loading_level < level {
                for &i in &loaders {
                    rewards[i] -= self.config.penalty;
                }
                continue;
            }
            eaten[f] = true;
            tracing::trace!(food = f, level, ?loaders, "food collected");
            for &i in &loaders {
                let mut r = f64::from(state.agent_levels[i] * level);
                if self.config.normalize_reward {
                    r /= f64::from(loading_level * state.food_spawned);
                }
                rewards[i] += r;
            }
        }

        let done = eaten.iter().all(|&e| e);
        let next = LbfState {
            prev_agents: state.agents.clone(),
            agents,
            eaten,
            ..state.clone()
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

    fn render_ansi(&self, state: &LbfState) -> Option<String> {
        let mut overlay: Vec<(Coord, char)> = state
            .remaining_food()
            .map(|(c, l)| (c, char::from_digit(l, 10).unwrap_or('*')))
            .collect();
        overlay.extend(
            state
                .agents
                .iter()
                .enumerate()
                .map(|(i, &c)| (c, char::from(b'A' + (i % 26) as u8))),
        );
        Some(self.grid.render(&overlay))
    }
}
