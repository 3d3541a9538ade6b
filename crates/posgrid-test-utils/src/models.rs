//! Mock models for engine and wrapper tests.
//!
//! - [`CountingModel`]: two agents, no grid, one random bit per step.
//!   Optional termination after a fixed number of steps.
//! - [`GridWalkModel`]: agents walking an arbitrary grid under a
//!   [`CollisionResolver`], observed through an [`ObservationWindow`].

use indexmap::IndexMap;
use posgrid_core::{
    AgentFlags, AgentId, AgentInfo, Coord, Direction, Discrete, EnvError, JointAction,
    JointObservation, JointReward, JointTimestep, PosgModel, RewardRange, SimRng, Space,
};
use posgrid_grid::{CollisionResolver, Grid, MovementRules};
use posgrid_obs::{
    Entity, EntityClass, Observation, ObservationMode, ObservationSpace, ObservationWindow,
    Visibility,
};
use rand::Rng;

fn flags(agents: &[AgentId], value: bool) -> AgentFlags {
    agents.iter().map(|&a| (a, value)).collect()
}

// ── CountingModel ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountingState {
    /// Steps since reset.
    pub t: u64,
    /// Random bit drawn on each step, oldest first.
    pub bits: Vec<bool>,
}

/// Two agents with actions {0, 1}.
///
/// Each step draws one random bit `b`; agent `i` observes
/// `other_action XOR b` and is rewarded with its own action.
#[derive(Debug)]
pub struct CountingModel {
    agents: Vec<AgentId>,
    space: Discrete,
    pub terminate_at: Option<u64>,
    pub horizon: Option<u64>,
}

impl CountingModel {
    pub fn new() -> Self {
        Self {
            agents: vec![AgentId(0), AgentId(1)],
            space: Discrete::new(2),
            terminate_at: None,
            horizon: None,
        }
    }

    /// Terminate (not truncate) once `t` reaches `steps`.
    pub fn terminating_at(steps: u64) -> Self {
        Self {
            terminate_at: Some(steps),
            ..Self::new()
        }
    }

    pub fn with_horizon(mut self, horizon: u64) -> Self {
        self.horizon = Some(horizon);
        self
    }
}

impl Default for CountingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PosgModel for CountingModel {
    type State = CountingState;
    type Action = usize;
    type Obs = usize;

    fn possible_agents(&self) -> &[AgentId] {
        &self.agents
    }

    fn action_space(&self, _agent: AgentId) -> &dyn Space<usize> {
        &self.space
    }

    fn observation_space(&self, _agent: AgentId) -> &dyn Space<usize> {
        &self.space
    }

    fn reward_range(&self, _agent: AgentId) -> RewardRange {
        RewardRange::new(0.0, 1.0)
    }

    fn horizon(&self) -> Option<u64> {
        self.horizon
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<CountingState, EnvError> {
        Ok(CountingState {
            t: 0,
            bits: vec![rng.random()],
        })
    }

    fn sample_initial_obs(&self, state: &CountingState) -> JointObservation<usize> {
        let bit = usize::from(state.bits[0]);
        self.agents.iter().map(|&a| (a, bit)).collect()
    }

    fn step(
        &self,
        state: &CountingState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<CountingState, usize>, EnvError> {
        self.validate_actions(state, actions)?;
        let bit: bool = rng.random();
        let mut bits = state.bits.clone();
        bits.push(bit);
        let next = CountingState {
            t: state.t + 1,
            bits,
        };

        let a0 = actions[&AgentId(0)];
        let a1 = actions[&AgentId(1)];
        let b = usize::from(bit);
        let mut observations = JointObservation::new();
        observations.insert(AgentId(0), a1 ^ b);
        observations.insert(AgentId(1), a0 ^ b);
        let rewards: JointReward = actions.iter().map(|(&a, &u)| (a, u as f64)).collect();

        let done = self.terminate_at.is_some_and(|n| next.t >= n);
        Ok(JointTimestep {
            state: next,
            observations,
            rewards,
            terminated: flags(&self.agents, done),
            truncated: flags(&self.agents, false),
            all_done: done,
            info: IndexMap::<AgentId, AgentInfo>::new(),
        })
    }

    fn render_ansi(&self, state: &CountingState) -> Option<String> {
        Some(format!("t={} bits={:?}\n", state.t, state.bits))
    }
}

// ── GridWalkModel ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridWalkState {
    pub positions: Vec<Coord>,
    pub prev: Vec<Coord>,
}

/// Agents walking a grid from fixed starts.
///
/// Actions are [`Direction`] indices. Reward is 1 for a completed move and
/// 0 otherwise. Each agent sees the others as one entity class through a
/// square window. Never terminates.
#[derive(Debug)]
pub struct GridWalkModel {
    pub grid: Grid,
    pub starts: Vec<Coord>,
    pub resolver: CollisionResolver,
    pub window: ObservationWindow,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl GridWalkModel {
    /// Collision rules default, square sight 1, tuple observations.
    pub fn new(grid: Grid, starts: Vec<Coord>) -> Self {
        Self::with_rules(grid, starts, MovementRules::default(), ObservationMode::Tuple, 1)
    }

    pub fn with_rules(
        grid: Grid,
        starts: Vec<Coord>,
        rules: MovementRules,
        mode: ObservationMode,
        sight: u32,
    ) -> Self {
        let n = starts.len();
        let window = ObservationWindow::new(Visibility::Square { radius: sight }, mode)
            .with_class(EntityClass::new("agent", n.saturating_sub(1)))
            .with_terrain(true);
        let obs_space = window.space();
        Self {
            grid,
            resolver: CollisionResolver::new(rules).expect("test rules are valid"),
            window,
            agents: (0..n as u32).map(AgentId).collect(),
            actions: Discrete::new(Direction::ALL.len()),
            obs_space,
            starts,
        }
    }

    fn observe(&self, positions: &[Coord]) -> JointObservation<Observation> {
        self.agents
            .iter()
            .map(|&agent| {
                let me = positions[agent.index()];
                let others: Vec<Entity> = positions
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != agent.index())
                    .map(|(_, &c)| Entity::at(c))
                    .collect();
                (agent, self.window.observe(&self.grid, me, &[], &[&others]))
            })
            .collect()
    }
}

impl PosgModel for GridWalkModel {
    type State = GridWalkState;
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

    fn sample_initial_state(&self, _rng: &mut SimRng) -> Result<GridWalkState, EnvError> {
        Ok(GridWalkState {
            positions: self.starts.clone(),
            prev: self.starts.clone(),
        })
    }

    fn sample_initial_obs(&self, state: &GridWalkState) -> JointObservation<Observation> {
        self.observe(&state.positions)
    }

    fn step(
        &self,
        state: &GridWalkState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<GridWalkState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let mut chosen: Vec<usize> = self.agents.iter().map(|a| actions[a]).collect();
        self.resolver
            .perturb_actions(&mut chosen, self.actions.n(), rng);
        let dirs: Vec<Direction> = chosen
            .iter()
            .map(|&i| Direction::from_index(i).unwrap_or(Direction::None))
            .collect();
        let res = self.resolver.resolve(&self.grid, &state.positions, &dirs);

        let rewards: JointReward = self
            .agents
            .iter()
            .map(|&a| {
                let moved = res.positions[a.index()] != state.positions[a.index()];
                (a, if moved { 1.0 } else { 0.0 })
            })
            .collect();
        let observations = self.observe(&res.positions);
        Ok(JointTimestep {
            state: GridWalkState {
                positions: res.positions,
                prev: state.positions.clone(),
            },
            observations,
            rewards,
            terminated: flags(&self.agents, false),
            truncated: flags(&self.agents, false),
            all_done: false,
            info: IndexMap::new(),
        })
    }

    fn render_ansi(&self, state: &GridWalkState) -> Option<String> {
        let overlay: Vec<(Coord, char)> = state
            .positions
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, char::from_digit(i as u32 % 10, 10).unwrap_or('?')))
            .collect();
        Some(self.grid.render(&overlay))
    }
}
