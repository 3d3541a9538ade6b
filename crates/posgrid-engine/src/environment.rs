//! The public simulation-loop interface.

use std::fmt;

use indexmap::IndexMap;
use posgrid_core::{
    AgentFlags, AgentId, AgentInfo, EnvError, EnvStatus, JointAction, JointObservation,
    JointReward, JointTimestep, RewardRange, Space,
};

/// How [`Environment::render`] presents the current state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Return a plain-text picture.
    #[default]
    Ansi,
    /// Print the plain-text picture to stdout and return nothing.
    Human,
}

/// Everything a caller receives from one [`Environment::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput<O> {
    /// Next observation of every agent.
    pub observations: JointObservation<O>,
    /// Reward of every agent for this step.
    pub rewards: JointReward,
    /// Game-defined termination per agent.
    pub terminated: AgentFlags,
    /// Horizon truncation per agent.
    pub truncated: AgentFlags,
    /// Whether the episode is over.
    pub all_done: bool,
    /// Auxiliary information per agent.
    pub info: IndexMap<AgentId, AgentInfo>,
}

impl<O> StepOutput<O> {
    /// Split a model timestep into successor state and caller-facing output.
    pub fn from_timestep<S>(ts: JointTimestep<S, O>) -> (S, Self) {
        (
            ts.state,
            Self {
                observations: ts.observations,
                rewards: ts.rewards,
                terminated: ts.terminated,
                truncated: ts.truncated,
                all_done: ts.all_done,
                info: ts.info,
            },
        )
    }

    /// Replace every observation with `f(agent, obs)`.
    pub fn map_observations<P>(self, mut f: impl FnMut(AgentId, O) -> P) -> StepOutput<P> {
        StepOutput {
            observations: self
                .observations
                .into_iter()
                .map(|(agent, obs)| (agent, f(agent, obs)))
                .collect(),
            rewards: self.rewards,
            terminated: self.terminated,
            truncated: self.truncated,
            all_done: self.all_done,
            info: self.info,
        }
    }
}

/// A multi-agent environment with the reset/step lifecycle.
///
/// `step` is valid only while [`status`](Self::status) is
/// [`EnvStatus::Ready`]; `reset` is valid at any time. Object safe, so
/// registries hand out `Box<dyn Environment<Action = A, Obs = O>>`.
pub trait Environment {
    /// Per-agent action.
    type Action: Clone + fmt::Debug + 'static;
    /// Per-agent observation.
    type Obs: Clone + fmt::Debug + 'static;

    /// Start a new episode. Reseeds the RNG only when `seed` is given.
    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<Self::Obs>, EnvError>;

    /// Advance one step under `actions`. On error nothing changes.
    fn step(
        &mut self,
        actions: JointAction<Self::Action>,
    ) -> Result<StepOutput<Self::Obs>, EnvError>;

    /// Render the current state, if supported.
    fn render(&self, mode: RenderMode) -> Option<String>;

    /// Release resources. The environment must be reset before reuse.
    fn close(&mut self);

    /// Current lifecycle status.
    fn status(&self) -> EnvStatus;

    /// Every agent that can take part.
    fn possible_agents(&self) -> &[AgentId];

    /// Agents expected to act in the next step.
    fn agents(&self) -> Vec<AgentId>;

    /// Action space of `agent`.
    fn action_space(&self, agent: AgentId) -> &dyn Space<Self::Action>;

    /// Observation space of `agent`.
    fn observation_space(&self, agent: AgentId) -> &dyn Space<Self::Obs>;

    /// Per-step reward bounds of `agent`.
    fn reward_range(&self, agent: AgentId) -> RewardRange;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Action = E::Action;
    type Obs = E::Obs;

    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<Self::Obs>, EnvError> {
        (**self).reset(seed)
    }

    fn step(
        &mut self,
        actions: JointAction<Self::Action>,
    ) -> Result<StepOutput<Self::Obs>, EnvError> {
        (**self).step(actions)
    }

    fn render(&self, mode: RenderMode) -> Option<String> {
        (**self).render(mode)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn status(&self) -> EnvStatus {
        (**self).status()
    }

    fn possible_agents(&self) -> &[AgentId] {
        (**self).possible_agents()
    }

    fn agents(&self) -> Vec<AgentId> {
        (**self).agents()
    }

    fn action_space(&self, agent: AgentId) -> &dyn Space<Self::Action> {
        (**self).action_space(agent)
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<Self::Obs> {
        (**self).observation_space(agent)
    }

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        (**self).reward_range(agent)
    }
}
