//! Joint (all-agent) values exchanged on every step.
//!
//! All joint mappings are [`IndexMap`]s keyed by [`AgentId`], so iteration
//! follows insertion order. Models insert agents in `possible_agents()`
//! order, which keeps every derived sequence deterministic.

use indexmap::IndexMap;

use crate::id::AgentId;

/// One action per active agent.
pub type JointAction<A> = IndexMap<AgentId, A>;

/// One private observation per agent.
pub type JointObservation<O> = IndexMap<AgentId, O>;

/// One scalar reward per agent.
pub type JointReward = IndexMap<AgentId, f64>;

/// One boolean per agent (terminated or truncated).
pub type AgentFlags = IndexMap<AgentId, bool>;

/// Inclusive bounds on the reward an agent can receive in a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardRange {
    /// Smallest possible reward.
    pub min: f64,
    /// Largest possible reward.
    pub max: f64,
}

impl RewardRange {
    /// Create a range `[min, max]`.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `reward` lies within the range (inclusive).
    pub fn contains(&self, reward: f64) -> bool {
        reward >= self.min && reward <= self.max
    }
}

/// Result of an episode from one agent's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The agent won.
    Win,
    /// The agent lost.
    Loss,
    /// Nobody won.
    Draw,
}

/// Auxiliary per-agent step information.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentInfo {
    /// Set on the step an episode ends, for games with winners.
    pub outcome: Option<Outcome>,
}

/// Everything a model produces for one transition.
///
/// Built fresh by [`PosgModel::step`](crate::PosgModel::step) and owned by
/// the caller afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct JointTimestep<S, O> {
    /// The successor state.
    pub state: S,
    /// Observations derived from `state`.
    pub observations: JointObservation<O>,
    /// Per-agent rewards for this transition.
    pub rewards: JointReward,
    /// Per-agent game-defined termination.
    pub terminated: AgentFlags,
    /// Per-agent horizon truncation.
    pub truncated: AgentFlags,
    /// Whether the episode as a whole is over.
    pub all_done: bool,
    /// Per-agent auxiliary information.
    pub info: IndexMap<AgentId, AgentInfo>,
}
