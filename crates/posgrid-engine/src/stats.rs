//! Per-episode statistics.

use indexmap::IndexMap;
use posgrid_core::{AgentId, JointReward};

/// Running totals for the current episode.
///
/// Reset by every successful `reset`, updated by every successful `step`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeStats {
    /// Steps taken so far.
    pub length: u64,
    /// Undiscounted return per agent.
    pub returns: IndexMap<AgentId, f64>,
}

impl EpisodeStats {
    /// Zeroed stats for `agents`.
    pub fn new(agents: &[AgentId]) -> Self {
        Self {
            length: 0,
            returns: agents.iter().map(|&a| (a, 0.0)).collect(),
        }
    }

    /// Account for one step.
    pub fn record(&mut self, rewards: &JointReward) {
        self.length += 1;
        for (&agent, &r) in rewards {
            *self.returns.entry(agent).or_insert(0.0) += r;
        }
    }

    /// Return of `agent`, zero if it has not been rewarded.
    pub fn episode_return(&self, agent: AgentId) -> f64 {
        self.returns.get(&agent).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_per_agent() {
        let mut s = EpisodeStats::new(&[AgentId(0), AgentId(1)]);
        let mut r = JointReward::new();
        r.insert(AgentId(0), 1.0);
        r.insert(AgentId(1), -0.5);
        s.record(&r);
        s.record(&r);
        assert_eq!(s.length, 2);
        assert_eq!(s.episode_return(AgentId(0)), 2.0);
        assert_eq!(s.episode_return(AgentId(1)), -1.0);
        assert_eq!(s.episode_return(AgentId(7)), 0.0);
    }
}
