//! TwoPaths: a runner heads for one of two goals while a chaser guards
//! them.
//!
//! Both agents act simultaneously with actions N, S, E, W (indices 0-3).
//! The chaser catches the runner by entering its cell or trading cells
//! with it, so the resolver runs with agent collisions and swap blocking
//! off and the meeting itself is the event.
//!
//! | Event | Runner | Chaser |
//! |---|---|---|
//! | capture | -1 | +1 |
//! | runner on a goal | +1 | -1 |
//! | otherwise | 0 | 0 |
//!
//! Capture is checked before the goal. With `infinite_horizon` neither
//! event ends the episode: both agents return to their start cells.

use std::collections::HashSet;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, AgentInfo, ConfigError, Coord, Direction, Discrete, EnvError, JointAction,
    JointObservation, JointReward, JointTimestep, Outcome, PosgModel, RewardRange, SimRng, Space,
};
use posgrid_grid::layout::{self, CHASER_START, GOAL, RUNNER_START, TWO_PATHS};
use posgrid_grid::{CollisionResolver, Grid, MovementRules};
use posgrid_obs::{
    Entity, EntityClass, Observation, ObservationMode, ObservationSpace, ObservationWindow,
    Visibility,
};

use crate::common::{agent_ids, direction_of, flags, met, mirror};

/// Agent id of the runner.
pub const RUNNER: AgentId = AgentId(0);
/// Agent id of the chaser.
pub const CHASER: AgentId = AgentId(1);

const R_CAPTURE: f64 = -1.0;
const R_SAFE: f64 = 1.0;

/// Configuration for [`TwoPaths`].
#[derive(Clone, Debug, PartialEq)]
pub struct TwoPathsConfig {
    /// Map name in [`TWO_PATHS`]. Default: `"7x7"`.
    pub grid_name: String,
    /// Probability that a chosen action is executed. Default: 1.0.
    pub action_probs: f64,
    /// Reset positions instead of ending the episode. Default: `false`.
    pub infinite_horizon: bool,
    /// Observation serialisation. Default: tuple.
    pub observation_mode: ObservationMode,
}

impl Default for TwoPathsConfig {
    fn default() -> Self {
        Self {
            grid_name: "7x7".into(),
            action_probs: 1.0,
            infinite_horizon: false,
            observation_mode: ObservationMode::Tuple,
        }
    }
}

impl TwoPathsConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        layout::lookup(TWO_PATHS, &self.grid_name)?;
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
}

/// Positions of both agents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwoPathsState {
    /// Runner's cell.
    pub runner: Coord,
    /// Chaser's cell.
    pub chaser: Coord,
    /// Runner's cell before the last step.
    pub prev_runner: Coord,
    /// Chaser's cell before the last step.
    pub prev_chaser: Coord,
}

/// The TwoPaths game.
#[derive(Debug)]
pub struct TwoPaths {
    config: TwoPathsConfig,
    grid: Grid,
    goals: Vec<Coord>,
    horizon: u64,
    resolver: CollisionResolver,
    window: ObservationWindow,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl TwoPaths {
    /// Build the game after validating `config`.
    pub fn new(config: TwoPathsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let named = layout::lookup(TWO_PATHS, &config.grid_name)?;
        let grid = named.grid()?;
        for marker in [RUNNER_START, CHASER_START, GOAL] {
            if grid.start_positions(marker).is_empty() {
                return Err(ConfigError::InvalidGrid {
                    reason: format!("layout {} has no '{marker}' cell", named.name),
                });
            }
        }
        let window = ObservationWindow::new(
            Visibility::Square { radius: 1 },
            config.observation_mode,
        )
        .with_class(EntityClass::new("opponent", 1))
        .with_class(EntityClass::new("goal", 2))
        .with_terrain(true);
        let obs_space = window.space();
        Ok(Self {
            goals: grid.start_positions(GOAL).to_vec(),
            horizon: named.max_episode_steps,
            resolver: CollisionResolver::new(config.rules())?,
            grid,
            window,
            agents: agent_ids(2),
            actions: Discrete::new(Direction::CARDINAL.len()),
            obs_space,
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &TwoPathsConfig {
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

    fn start_state(&self, rng: &mut SimRng) -> Result<TwoPathsState, EnvError> {
        let mut taken = HashSet::new();
        let runner = self.grid.sample_start_coord(RUNNER_START, &taken, rng)?;
        taken.insert(runner);
        let chaser = self.grid.sample_start_coord(CHASER_START, &taken, rng)?;
        Ok(TwoPathsState {
            runner,
            chaser,
            prev_runner: runner,
            prev_chaser: chaser,
        })
    }

    fn observe(&self, state: &TwoPathsState) -> JointObservation<Observation> {
        let goals: Vec<Entity> = self.goals.iter().map(|&g| Entity::at(g)).collect();
        let view = |me: Coord, other: Coord| {
            let opponent = [Entity::at(other)];
            self.window
                .observe(&self.grid, me, &[], &[&opponent[..], &goals[..]])
        };
        let mut obs = JointObservation::new();
        obs.insert(RUNNER, view(state.runner, state.chaser));
        obs.insert(CHASER, view(state.chaser, state.runner));
        obs
    }
}

impl PosgModel for TwoPaths {
    type State = TwoPathsState;
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
        RewardRange::new(R_CAPTURE, R_SAFE)
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<TwoPathsState, EnvError> {
        self.start_state(rng)
    }

    fn sample_initial_obs(&self, state: &TwoPathsState) -> JointObservation<Observation> {
        self.observe(state)
    }

    fn step(
        &self,
        state: &TwoPathsState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<TwoPathsState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let mut chosen = [actions[&RUNNER], actions[&CHASER]];
        self.resolver
            .perturb_actions(&mut chosen, self.actions.n(), rng);
        let dirs = chosen.map(direction_of);
        let current = [state.runner, state.chaser];
        let res = self.resolver.resolve(&self.grid, &current, &dirs);
        let (runner, chaser) = (res.positions[0], res.positions[1]);

        let captured = met(state.runner, runner, state.chaser, chaser);
        let safe = !captured && self.goals.contains(&runner);
        let (r_runner, outcome) = if captured {
            (R_CAPTURE, Some(Outcome::Loss))
        } else if safe {
            (R_SAFE, Some(Outcome::Win))
        } else {
            (0.0, None)
        };
        let mut rewards = JointReward::new();
        rewards.insert(RUNNER, r_runner);
        rewards.insert(CHASER, -r_runner);

        let event = captured || safe;
        let done = event && !self.config.infinite_horizon;
        let next = if event && self.config.infinite_horizon {
            tracing::trace!(captured, "episode event; agents return to start");
            let fresh = self.start_state(rng)?;
            TwoPathsState {
                prev_runner: runner,
                prev_chaser: chaser,
                ..fresh
            }
        } else {
            TwoPathsState {
                runner,
                chaser,
                prev_runner: state.runner,
                prev_chaser: state.chaser,
            }
        };

        let mut info = IndexMap::new();
        if done {
            info.insert(RUNNER, AgentInfo { outcome });
            info.insert(
                CHASER,
                AgentInfo {
                    outcome: outcome.map(mirror),
                },
            );
        }

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

    fn render_ansi(&self, state: &TwoPathsState) -> Option<String> {
        let mut overlay: Vec<(Coord, char)> = self.goals.iter().map(|&g| (g, 'G')).collect();
        overlay.push((state.runner, 'R'));
        overlay.push((state.chaser, 'C'));
        Some(self.grid.render(&overlay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgrid_core::seeded_rng;

    fn game(name: &str, infinite: bool) -> TwoPaths {
        TwoPaths::new(TwoPathsConfig {
            grid_name: name.into(),
            infinite_horizon: infinite,
            ..TwoPathsConfig::default()
        })
        .unwrap()
    }

    fn act(runner: Direction, chaser: Direction) -> JointAction<usize> {
        [(RUNNER, runner.index()), (CHASER, chaser.index())]
            .into_iter()
            .collect()
    }

    #[test]
    fn unknown_grid_is_rejected() {
        let err = TwoPaths::new(TwoPathsConfig {
            grid_name: "9x9".into(),
            ..TwoPathsConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownGrid { name: "9x9".into() });
    }

    #[test]
    fn starts_on_marked_cells() {
        let g = game("3x3", false);
        let s = g.sample_initial_state(&mut seeded_rng(0)).unwrap();
        assert_eq!(s.runner, Coord::new(1, 2));
        assert_eq!(s.chaser, Coord::new(1, 0));
        assert_eq!(g.default_max_episode_steps(), 20);
    }

    #[test]
    fn runner_reaching_goal_wins() {
        let g = game("3x3", false);
        let mut rng = seeded_rng(0);
        let s0 = g.sample_initial_state(&mut rng).unwrap();
        // Runner (1,2) -> (0,2) -> (0,1) -> (0,0); chaser holds still by walking into the top wall.
        let ts = g.step(&s0, &act(Direction::West, Direction::North), &mut rng).unwrap();
        let ts = g.step(&ts.state, &act(Direction::North, Direction::North), &mut rng).unwrap();
        assert!(!ts.all_done);
        let ts = g.step(&ts.state, &act(Direction::North, Direction::North), &mut rng).unwrap();
        assert!(ts.all_done);
        assert_eq!(ts.rewards[&RUNNER], 1.0);
        assert_eq!(ts.rewards[&CHASER], -1.0);
        assert_eq!(ts.info[&RUNNER].outcome, Some(Outcome::Win));
        assert_eq!(ts.info[&CHASER].outcome, Some(Outcome::Loss));
    }

    #[test]
    fn swapping_cells_is_a_capture() {
        let g = game("3x3", false);
        let mut rng = seeded_rng(0);
        let s = TwoPathsState {
            runner: Coord::new(0, 1),
            chaser: Coord::new(0, 0),
            prev_runner: Coord::new(0, 1),
            prev_chaser: Coord::new(0, 0),
        };
        let ts = g.step(&s, &act(Direction::North, Direction::South), &mut rng).unwrap();
        assert_eq!(ts.state.runner, Coord::new(0, 0));
        assert_eq!(ts.state.chaser, Coord::new(0, 1));
        assert!(ts.all_done);
        assert_eq!(ts.rewards[&RUNNER], -1.0);
        assert_eq!(ts.rewards[&CHASER], 1.0);
    }

    #[test]
    fn capture_beats_goal() {
        let g = game("3x3", false);
        let mut rng = seeded_rng(0);
        let s = TwoPathsState {
            runner: Coord::new(0, 1),
            chaser: Coord::new(1, 0),
            prev_runner: Coord::new(0, 1),
            prev_chaser: Coord::new(1, 0),
        };
        let ts = g.step(&s, &act(Direction::North, Direction::West), &mut rng).unwrap();
        assert_eq!(ts.state.runner, ts.state.chaser);
        assert_eq!(ts.rewards[&RUNNER], -1.0);
    }

    #[test]
    fn infinite_horizon_respawns_instead_of_ending() {
        let g = game("3x3", true);
        let mut rng = seeded_rng(0);
        let s = TwoPathsState {
            runner: Coord::new(0, 1),
            chaser: Coord::new(2, 0),
            prev_runner: Coord::new(0, 1),
            prev_chaser: Coord::new(2, 0),
        };
        let ts = g.step(&s, &act(Direction::North, Direction::North), &mut rng).unwrap();
        assert!(!ts.all_done);
        assert_eq!(ts.rewards[&RUNNER], 1.0);
        assert_eq!(ts.state.runner, Coord::new(1, 2));
        assert_eq!(ts.state.chaser, Coord::new(1, 0));
        assert!(ts.info.is_empty());
    }

    #[test]
    fn observations_fit_the_space_in_every_mode() {
        for mode in [ObservationMode::Vector, ObservationMode::Tuple, ObservationMode::Grid] {
            let g = TwoPaths::new(TwoPathsConfig {
                observation_mode: mode,
                ..TwoPathsConfig::default()
            })
            .unwrap();
            let s = g.sample_initial_state(&mut seeded_rng(0)).unwrap();
            for (agent, obs) in g.sample_initial_obs(&s) {
                assert!(g.observation_space(agent).contains(&obs), "{mode}");
            }
        }
    }

    #[test]
    fn render_marks_both_agents() {
        let g = game("3x3", false);
        let s = g.sample_initial_state(&mut seeded_rng(0)).unwrap();
        assert_eq!(g.render_ansi(&s).unwrap(), "GCG\n.#.\n.R.\n");
    }
}
