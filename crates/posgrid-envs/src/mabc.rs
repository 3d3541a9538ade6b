//! MABC: the multi-access broadcast channel.
//!
//! Each agent controls a node with a one-message buffer. Nodes share one
//! channel: a message goes through only when exactly one node transmits.
//! Every node then receives a noisy report of whether the channel saw a
//! collision. All nodes share the reward, 1 per successful broadcast.
//!
//! Buffer transitions per node `i`:
//!
//! | Buffer | Action | Channel | Next buffer |
//! |---|---|---|---|
//! | EMPTY | any | any | FULL w.p. `fill_probs[i]` |
//! | FULL | NOSEND | any | FULL |
//! | FULL | SEND | clear | FULL w.p. `fill_probs[i]`, else EMPTY |
//! | FULL | SEND | collision | FULL |
//!
//! The game has no grid and never terminates.

use std::fmt;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, ConfigError, Discrete, EnvError, JointAction, JointObservation, JointReward,
    JointTimestep, PosgModel, RewardRange, SimRng, Space,
};
use rand::Rng;

use crate::common::{agent_ids, flags};

/// Hold the buffered message.
pub const NOSEND: usize = 0;
/// Try to transmit the buffered message.
pub const SEND: usize = 1;

/// More than one node transmitted.
pub const COLLISION: usize = 0;
/// At most one node transmitted.
pub const NOCOLLISION: usize = 1;

/// A node's message buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Buffer {
    /// Nothing to send.
    Empty,
    /// One message waiting.
    Full,
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "EMPTY",
            Self::Full => "FULL",
        })
    }
}

/// Configuration for [`Mabc`].
#[derive(Clone, Debug, PartialEq)]
pub struct MabcConfig {
    /// Number of nodes. Default: 2.
    pub num_nodes: usize,
    /// Per-node probability that a buffer refills on a step.
    /// Default: 0.9 for node 0, 0.1 for the rest.
    pub fill_probs: Vec<f64>,
    /// Probability that a node observes the true channel outcome.
    /// Default: 0.9.
    pub observation_prob: f64,
    /// Per-node probability that a buffer starts FULL. Default: all 1.0.
    pub init_buffer_dist: Vec<f64>,
}

impl Default for MabcConfig {
    fn default() -> Self {
        Self::with_nodes(2)
    }
}

impl MabcConfig {
    /// Default probabilities for `num_nodes` nodes.
    pub fn with_nodes(num_nodes: usize) -> Self {
        let fill_probs = (0..num_nodes)
            .map(|i| if i == 0 { 0.9 } else { 0.1 })
            .collect();
        Self {
            num_nodes,
            fill_probs,
            observation_prob: 0.9,
            init_buffer_dist: vec![1.0; num_nodes],
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes < 2 {
            return Err(ConfigError::invalid("num_nodes", "must be at least 2"));
        }
        if self.fill_probs.len() != self.num_nodes {
            return Err(ConfigError::invalid(
                "fill_probs",
                format!("expected {} entries, got {}", self.num_nodes, self.fill_probs.len()),
            ));
        }
        if self.init_buffer_dist.len() != self.num_nodes {
            return Err(ConfigError::invalid(
                "init_buffer_dist",
                format!(
                    "expected {} entries, got {}",
                    self.num_nodes,
                    self.init_buffer_dist.len()
                ),
            ));
        }
        let probs = self
            .fill_probs
            .iter()
            .chain(&self.init_buffer_dist)
            .chain(std::iter::once(&self.observation_prob));
        for &p in probs {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::invalid(
                    "probability",
                    format!("{p} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }
}

/// Buffer of every node, in agent order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MabcState {
    /// One buffer per node.
    pub buffers: Vec<Buffer>,
}

impl fmt::Display for MabcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (i, b) in self.buffers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str(">")
    }
}

/// The MABC game.
#[derive(Debug)]
pub struct Mabc {
    config: MabcConfig,
    agents: Vec<AgentId>,
    space: Discrete,
}

impl Mabc {
    /// Build the game after validating `config`.
    pub fn new(config: MabcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            agents: agent_ids(config.num_nodes),
            space: Discrete::new(2),
            config,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &MabcConfig {
        &self.config
    }

    fn refill(&self, node: usize, rng: &mut SimRng) -> Buffer {
        if rng.random::<f64>() < self.config.fill_probs[node] {
            Buffer::Full
        } else {
            Buffer::Empty
        }
    }
}

impl PosgModel for Mabc {
    type State = MabcState;
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

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<MabcState, EnvError> {
        let buffers = self
            .config
            .init_buffer_dist
            .iter()
            .map(|&p| {
                if rng.random::<f64>() < p {
                    Buffer::Full
                } else {
                    Buffer::Empty
                }
            })
            .collect();
        Ok(MabcState { buffers })
    }

    fn sample_initial_obs(&self, _state: &MabcState) -> JointObservation<usize> {
        self.agents.iter().map(|&a| (a, NOCOLLISION)).collect()
    }

    fn step(
        &self,
        state: &MabcState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<MabcState, usize>, EnvError> {
        self.validate_actions(state, actions)?;
        let transmitting: Vec<bool> = self
            .agents
            .iter()
            .map(|a| actions[a] == SEND && state.buffers[a.index()] == Buffer::Full)
            .collect();
        let senders = transmitting.iter().filter(|&&t| t).count();
        let collision = senders > 1;

        let buffers = state
            .buffers
            .iter()
            .zip(&transmitting)
            .enumerate()
            .map(|(i, (&buffer, &sent))| match buffer {
                Buffer::Empty => self.refill(i, rng),
                Buffer::Full if sent && !collision => self.refill(i, rng),
                Buffer::Full => Buffer::Full,
            })
            .collect();

        let truth = if collision { COLLISION } else { NOCOLLISION };
        let observations = self
            .agents
            .iter()
            .map(|&a| {
                let seen = if rng.random::<f64>() < self.config.observation_prob {
                    truth
                } else {
                    1 - truth
                };
                (a, seen)
            })
            .collect();

        let reward = if senders == 1 { 1.0 } else { 0.0 };
        let rewards: JointReward = self.agents.iter().map(|&a| (a, reward)).collect();
        tracing::trace!(senders, collision, "mabc step");

        Ok(JointTimestep {
            state: MabcState { buffers },
            observations,
            rewards,
            terminated: flags(&self.agents, false),
            truncated: flags(&self.agents, false),
            all_done: false,
            info: IndexMap::new(),
        })
    }

    fn render_ansi(&self, state: &MabcState) -> Option<String> {
        Some(format!("State: {state}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgrid_core::seeded_rng;

    fn joint(actions: &[usize]) -> JointAction<usize> {
        actions
            .iter()
            .enumerate()
            .map(|(i, &a)| (AgentId(i as u32), a))
            .collect()
    }

    fn exact(fill: f64) -> Mabc {
        Mabc::new(MabcConfig {
            fill_probs: vec![fill; 2],
            observation_prob: 1.0,
            ..MabcConfig::default()
        })
        .unwrap()
    }

    fn full() -> MabcState {
        MabcState {
            buffers: vec![Buffer::Full; 2],
        }
    }

    #[test]
    fn defaults_match_the_classic_setup() {
        let c = MabcConfig::default();
        assert_eq!(c.fill_probs, vec![0.9, 0.1]);
        assert_eq!(c.init_buffer_dist, vec![1.0, 1.0]);
        assert!(c.validate().is_ok());
        assert_eq!(MabcConfig::with_nodes(4).fill_probs, vec![0.9, 0.1, 0.1, 0.1]);
    }

    #[test]
    fn rejects_mismatched_or_bad_probabilities() {
        let short = MabcConfig {
            fill_probs: vec![0.5],
            ..MabcConfig::default()
        };
        assert!(matches!(
            short.validate(),
            Err(ConfigError::InvalidParameter { name: "fill_probs", .. })
        ));
        let bad = MabcConfig {
            observation_prob: 1.5,
            ..MabcConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(MabcConfig::with_nodes(1).validate().is_err());
    }

    #[test]
    fn initial_buffers_follow_the_distribution() {
        let m = Mabc::new(MabcConfig {
            init_buffer_dist: vec![1.0, 0.0],
            ..MabcConfig::default()
        })
        .unwrap();
        let s = m.sample_initial_state(&mut seeded_rng(3)).unwrap();
        assert_eq!(s.buffers, vec![Buffer::Full, Buffer::Empty]);
        let obs = m.sample_initial_obs(&s);
        assert!(obs.values().all(|&o| o == NOCOLLISION));
    }

    #[test]
    fn a_lone_sender_broadcasts() {
        let m = exact(0.0);
        let ts = m.step(&full(), &joint(&[SEND, NOSEND]), &mut seeded_rng(0)).unwrap();
        assert_eq!(ts.state.buffers, vec![Buffer::Empty, Buffer::Full]);
        assert!(ts.rewards.values().all(|&r| r == 1.0));
        assert!(ts.observations.values().all(|&o| o == NOCOLLISION));
        assert!(!ts.all_done);
    }

    #[test]
    fn two_senders_collide_and_keep_their_messages() {
        let m = exact(0.0);
        let ts = m.step(&full(), &joint(&[SEND, SEND]), &mut seeded_rng(0)).unwrap();
        assert_eq!(ts.state.buffers, full().buffers);
        assert!(ts.rewards.values().all(|&r| r == 0.0));
        assert!(ts.observations.values().all(|&o| o == COLLISION));
    }

    #[test]
    fn sending_from_an_empty_buffer_transmits_nothing() {
        let m = exact(1.0);
        let s = MabcState {
            buffers: vec![Buffer::Empty, Buffer::Full],
        };
        let ts = m.step(&s, &joint(&[SEND, SEND]), &mut seeded_rng(0)).unwrap();
        assert!(ts.rewards.values().all(|&r| r == 1.0));
        // Node 0 refilled; node 1 sent and refilled.
        assert_eq!(ts.state.buffers, full().buffers);
    }

    #[test]
    fn observations_flip_when_unreliable() {
        let m = Mabc::new(MabcConfig {
            observation_prob: 0.0,
            ..MabcConfig::default()
        })
        .unwrap();
        let ts = m.step(&full(), &joint(&[SEND, SEND]), &mut seeded_rng(0)).unwrap();
        assert!(ts.observations.values().all(|&o| o == NOCOLLISION));
    }

    #[test]
    fn renders_buffers() {
        let m = exact(0.5);
        let s = MabcState {
            buffers: vec![Buffer::Full, Buffer::Empty],
        };
        assert_eq!(m.render_ansi(&s).unwrap(), "State: <FULL, EMPTY>\n");
    }
}
