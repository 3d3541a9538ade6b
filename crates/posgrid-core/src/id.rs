//! Strongly-typed identifiers and the environment lifecycle status.

use std::fmt;

/// Identifies an agent within an environment.
///
/// Agents are numbered at model construction: `AgentId(n)` is the n-th
/// entry of the model's `possible_agents()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl AgentId {
    /// The agent's position in the model's agent list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter within an episode.
///
/// Zero after `reset`, incremented by every successful `step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Lifecycle state of an environment driver.
///
/// `Uninitialized → Ready` on reset, `Ready → Ready` on each step that
/// does not end the episode, `Ready → Terminal` when it does. `reset`
/// is accepted from every status and always lands in `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvStatus {
    /// Constructed but never reset.
    Uninitialized,
    /// An episode is in progress and `step` is accepted.
    Ready,
    /// The episode has ended; `reset` is required before stepping again.
    Terminal,
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_display_and_index() {
        let a = AgentId::from(3);
        assert_eq!(a.to_string(), "3");
        assert_eq!(a.index(), 3);
    }

    #[test]
    fn agent_ids_order_by_number() {
        let mut ids = vec![AgentId(2), AgentId(0), AgentId(1)];
        ids.sort();
        assert_eq!(ids, vec![AgentId(0), AgentId(1), AgentId(2)]);
    }

    #[test]
    fn status_display() {
        assert_eq!(EnvStatus::Uninitialized.to_string(), "uninitialized");
        assert_eq!(EnvStatus::Terminal.to_string(), "terminal");
    }
}
