//! PursuitEvasion: an evader crosses the map to its goal while a pursuer
//! tries to intercept it.
//!
//! Sight is Euclidean up to `max_obs_distance` and blocked by walls. The
//! evader observes the pursuer and its goal; the pursuer observes the
//! evader and the evader's start cell. The evader's goal is the goal cell
//! farthest from its start by path length.
//!
//! The pursuer catches the evader by sharing or trading cells with it
//! (+1 pursuer, -1 evader); the evader wins by reaching its goal (+1
//! evader, -1 pursuer). Capture is checked first. With
//! `use_progress_reward` the evader also earns [`R_PROGRESS`] each time
//! it gets closer to the goal than ever before in the episode, and
//! `normalize_reward` rescales its rewards back into `[-1, 1]`.

use std::collections::HashSet;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, AgentInfo, ConfigError, Coord, Direction, Discrete, EnvError, JointAction,
    JointObservation, JointReward, JointTimestep, NoFreeCellError, Outcome, PosgModel,
    RewardRange, SimRng, Space,
};
use posgrid_grid::layout::{self, EVADER_START, GOAL, PURSUER_START, PURSUIT_EVASION};
use posgrid_grid::{CollisionResolver, Grid, MovementRules};
use posgrid_obs::{
    Entity, EntityClass, Observation, ObservationMode, ObservationSpace, ObservationWindow,
    Visibility,
};
use rand::Rng;

use crate::common::{agent_ids, direction_of, flags, met, mirror};

/// Agent id of the evader.
pub const EVADER: AgentId = AgentId(0);
/// Agent id of the pursuer.
pub const PURSUER: AgentId = AgentId(1);

/// Terminal reward magnitude.
pub const R_END: f64 = 1.0;
/// Evader reward for a new closest approach to its goal.
pub const R_PROGRESS: f64 = 0.01;

/// Configuration for [`PursuitEvasion`].
#[derive(Clone, Debug, PartialEq)]
pub struct PursuitEvasionConfig {
    /// Map name in [`PURSUIT_EVASION`]. Default: `"8x8"`.
    pub grid_name: String,
    /// Probability that a chosen action is executed. Default: 1.0.
    pub action_probs: f64,
    /// Euclidean sight radius. Default: 12.
    pub max_obs_distance: u32,
    /// Keep evader rewards within `[-1, 1]`. Default: `true`.
    pub normalize_reward: bool,
    /// Reward the evader for approaching its goal. Default: `true`.
    pub use_progress_reward: bool,
    /// Observation serialisation. Default: tuple.
    pub observation_mode: ObservationMode,
}

impl Default for PursuitEvasionConfig {
    fn default() -> Self {
        Self {
            grid_name: "8x8".into(),
            action_probs: 1.0,
            max_obs_distance: 12,
            normalize_reward: true,
            use_progress_reward: true,
            observation_mode: ObservationMode::Tuple,
        }
    }
}

impl PursuitEvasionConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        layout::lookup(PURSUIT_EVASION, &self.grid_name)?;
        if self.max_obs_distance == 0 {
            return Err(ConfigError::invalid("max_obs_distance", "must be at least 1"));
        }
        self.rules().validate()
    }

    fn rules(&self) -> MovementRules {
        MovementRules {
            action_probs: self.action_probs,
            obstacle_collisions: true,
            agent_collisions: false,
            block_swaps: false,
        }
    }

    /// Divisor applied to evader rewards.
    fn reward_scale(&self) -> f64 {
        if self.normalize_reward && self.use_progress_reward {
            R_END + R_PROGRESS
        } else {
            1.0
        }
    }
}

/// Positions, goal and progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PursuitEvasionState {
    /// Evader's cell.
    pub evader: Coord,
    /// Pursuer's cell.
    pub pursuer: Coord,
    /// Evader's cell before the last step.
    pub prev_evader: Coord,
    /// Pursuer's cell before the last step.
    pub prev_pursuer: Coord,
    /// Where the evader started.
    pub evader_start: Coord,
    /// Cell the evader must reach.
    pub evader_goal: Coord,
    /// Smallest path length from the evader to its goal so far.
    pub min_goal_dist: u32,
}

/// The PursuitEvasion game.
#[derive(Debug)]
pub struct PursuitEvasion {
    config: PursuitEvasionConfig,
    grid: Grid,
    horizon: u64,
    /// Path lengths to each goal cell, indexed by grid index.
    goal_dists: IndexMap<Coord, Vec<Option<u32>>>,
    resolver: CollisionResolver,
    window: ObservationWindow,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl PursuitEvasion {
    /// Build the game after validating `config`.
    pub fn new(config: PursuitEvasionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let named = layout::lookup(PURSUIT_EVASION, &config.grid_name)?;
        let grid = named.grid()?;
        for marker in [EVADER_START, PURSUER_START, GOAL] {
            if grid.start_positions(marker).is_empty() {
                return Err(ConfigError::InvalidGrid {
                    reason: format!("layout {} has no '{marker}' cell", named.name),
                });
            }
        }
        let goal_dists = grid
            .start_positions(GOAL)
            .iter()
            .map(|&g| (g, grid.bfs_distances(g)))
            .collect();
        let window = ObservationWindow::new(
            Visibility::Distance {
                max: config.max_obs_distance,
                line_of_sight: true,
            },
            config.observation_mode,
        )
        .with_class(EntityClass::new("opponent", 1))
        .with_class(EntityClass::new("target", 1));
        let obs_space = window.space();
        Ok(Self {
            horizon: named.max_episode_steps,
            goal_dists,
            resolver: CollisionResolver::new(config.rules())?,
            grid,
            window,
            agents: agent_ids(2),
            actions: Discrete::new(Direction::ALL.len()),
            obs_space,
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &PursuitEvasionConfig {
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

    /// Path length from `from` to `goal`. Unreachable cells count as
    /// infinitely far.
    pub fn goal_distance(&self, goal: Coord, from: Coord) -> u32 {
        self.grid
            .index(from)
            .and_then(|i| self.goal_dists.get(&goal).and_then(|d| d[i]))
            .unwrap_or(u32::MAX)
    }

    fn observe(&self, state: &PursuitEvasionState) -> JointObservation<Observation> {
        let view = |me: Coord, other: Coord, target: Coord| {
            let opponent = [Entity::at(other)];
            let target = [Entity::at(target)];
            self.window
                .observe(&self.grid, me, &[], &[&opponent[..], &target[..]])
        };
        let mut obs = JointObservation::new();
        obs.insert(EVADER, view(state.evader, state.pursuer, state.evader_goal));
        obs.insert(PURSUER, view(state.pursuer, state.evader, state.evader_start));
        obs
    }
}

impl PosgModel for PursuitEvasion {
    type State = PursuitEvasionState;
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

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        if agent == EVADER {
            let scale = self.config.reward_scale();
            let high = if self.config.use_progress_reward {
                R_END + R_PROGRESS
            } else {
                R_END
            };
            RewardRange::new(-R_END / scale, high / scale)
        } else {
            RewardRange::new(-R_END, R_END)
        }
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<PursuitEvasionState, EnvError> {
        let mut taken = HashSet::new();
        let evader = self.grid.sample_start_coord(EVADER_START, &taken, rng)?;
        taken.insert(evader);
        let pursuer = self.grid.sample_start_coord(PURSUER_START, &taken, rng)?;

        let farthest = self
            .goal_dists
            .keys()
            .map(|&g| self.goal_distance(g, evader))
            .max()
            .unwrap_or(0);
        let goals: Vec<Coord> = self
            .goal_dists
            .keys()
            .copied()
            .filter(|&g| g != evader && self.goal_distance(g, evader) == farthest)
            .collect();
        if goals.is_empty() {
            return Err(NoFreeCellError {
                excluded: 1,
                free_cells: self.goal_dists.len(),
            }
            .into());
        }
        let evader_goal = goals[rng.random_range(0..goals.len())];
        Ok(PursuitEvasionState {
            evader,
            pursuer,
            prev_evader: evader,
            prev_pursuer: pursuer,
            evader_start: evader,
            evader_goal,
            min_goal_dist: farthest,
        })
    }

    fn sample_initial_obs(&self, state: &PursuitEvasionState) -> JointObservation<Observation> {
        self.observe(state)
    }

    fn step(
        &self,
        state: &PursuitEvasionState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<PursuitEvasionState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let mut chosen = [actions[&EVADER], actions[&PURSUER]];
        self.resolver
            .perturb_actions(&mut chosen, self.actions.n(), rng);
        let dirs = chosen.map(direction_of);
        let current = [state.evader, state.pursuer];
        let res = self.resolver.resolve(&self.grid, &current, &dirs);
        let (evader, pursuer) = (res.positions[0], res.positions[1]);

        let captured = met(state.evader, evader, state.pursuer, pursuer);
        let evaded = !captured && evader == state.evader_goal;

        let dist = self.goal_distance(state.evader_goal, evader);
        let mut r_evader = 0.0;
        if self.config.use_progress_reward && dist < state.min_goal_dist {
            r_evader += R_PROGRESS;
        }
        let outcome = if captured {
            r_evader = -R_END;
            Some(Outcome::Loss)
        } else if evaded {
            r_evader += R_END;
            Some(Outcome::Win)
        } else {
            None
        };
        let r_pursuer = match outcome {
            Some(Outcome::Loss) => R_END,
            Some(Outcome::Win) => -R_END,
            _ => 0.0,
        };
        let mut rewards = JointReward::new();
        rewards.insert(EVADER, r_evader / self.config.reward_scale());
        rewards.insert(PURSUER, r_pursuer);

        let done = outcome.is_some();
        let mut info = IndexMap::new();
        if let Some(o) = outcome {
            info.insert(EVADER, AgentInfo { outcome: Some(o) });
            info.insert(
                PURSUER,
                AgentInfo {
                    outcome: Some(mirror(o)),
                },
            );
        }

        let next = PursuitEvasionState {
            evader,
            pursuer,
            prev_evader: state.evader,
            prev_pursuer: state.pursuer,
            min_goal_dist: state.min_goal_dist.min(dist),
            ..state.clone()
        };
        Ok(JointTimestep {
            observations: self.observe(&next),
            state: next,
            rewards,
            terminated: flags(&self.agents, done),
            truncated: flags(&self.agents, false),
            all_done: done,
            info,
        })
    }

    fn render_ansi(&self, state: &PursuitEvasionState) -> Option<String> {
        Some(self.grid.render(&[
            (state.evader_goal, 'G'),
            (state.evader, 'E'),
            (state.pursuer, 'P'),
        ]))
    }
}
