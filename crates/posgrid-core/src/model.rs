//! The POSG model contract.
//!
//! A [`PosgModel`] is a pure description of a game: it never holds the
//! current state. The driver owns state and RNG and hands both in on
//! every call, which keeps models shareable and transitions reproducible.

use std::fmt;

use crate::error::EnvError;
use crate::id::AgentId;
use crate::rng::SimRng;
use crate::space::Space;
use crate::timestep::{JointAction, JointObservation, JointTimestep, RewardRange};

/// Transition, observation, and reward system of one game.
///
/// Implementors must keep `step` free of side effects other than RNG
/// consumption: the input state is borrowed and a fresh successor state is
/// returned inside the [`JointTimestep`].
pub trait PosgModel {
    /// Complete game state. Replaced, never mutated, on each step.
    type State: Clone + fmt::Debug + 'static;
    /// Per-agent action.
    type Action: Clone + fmt::Debug + 'static;
    /// Per-agent observation.
    type Obs: Clone + fmt::Debug + 'static;

    /// Every agent that can ever take part, in canonical order.
    fn possible_agents(&self) -> &[AgentId];

    /// Number of possible agents.
    fn n_agents(&self) -> usize {
        self.possible_agents().len()
    }

    /// Agents expected to act in `state`. Defaults to all possible agents.
    fn active_agents(&self, _state: &Self::State) -> Vec<AgentId> {
        self.possible_agents().to_vec()
    }

    /// Action space of `agent`.
    ///
    /// # Panics
    ///
    /// May panic if `agent` is not one of `possible_agents()`.
    fn action_space(&self, agent: AgentId) -> &dyn Space<Self::Action>;

    /// Observation space of `agent`.
    ///
    /// # Panics
    ///
    /// May panic if `agent` is not one of `possible_agents()`.
    fn observation_space(&self, agent: AgentId) -> &dyn Space<Self::Obs>;

    /// Per-step reward bounds of `agent`.
    fn reward_range(&self, agent: AgentId) -> RewardRange;

    /// Step count at which episodes are truncated, if the game has one.
    fn horizon(&self) -> Option<u64> {
        None
    }

    /// Sample a start state. Entities are placed on unblocked,
    /// mutually-exclusive cells.
    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<Self::State, EnvError>;

    /// Observations for a freshly sampled start state.
    fn sample_initial_obs(&self, state: &Self::State) -> JointObservation<Self::Obs>;

    /// Advance `state` under `actions`.
    ///
    /// Implementations call [`validate_actions`](Self::validate_actions)
    /// before touching the RNG so that a rejected joint action has no
    /// observable effect.
    fn step(
        &self,
        state: &Self::State,
        actions: &JointAction<Self::Action>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<Self::State, Self::Obs>, EnvError>;

    /// Check that `actions` has exactly one in-space action per active agent.
    fn validate_actions(
        &self,
        state: &Self::State,
        actions: &JointAction<Self::Action>,
    ) -> Result<(), EnvError> {
        let active = self.active_agents(state);
        for &agent in &active {
            let action = actions.get(&agent).ok_or_else(|| EnvError::InvalidAction {
                agent,
                reason: "no action supplied".into(),
            })?;
            let space = self.action_space(agent);
            if !space.contains(action) {
                return Err(EnvError::InvalidAction {
                    agent,
                    reason: format!("{action:?} is not in {space:?}"),
                });
            }
        }
        if let Some(&agent) = actions.keys().find(|a| !active.contains(a)) {
            return Err(EnvError::InvalidAction {
                agent,
                reason: "agent is not active".into(),
            });
        }
        Ok(())
    }

    /// Plain-text picture of `state`, if the game supports one.
    fn render_ansi(&self, _state: &Self::State) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Discrete;
    use crate::timestep::{AgentFlags, AgentInfo, JointReward};
    use indexmap::IndexMap;

    /// Two agents; agent 1 drops out once the counter reaches 1.
    #[derive(Debug)]
    struct Dropout {
        agents: Vec<AgentId>,
        actions: Discrete,
    }

    impl Dropout {
        fn new() -> Self {
            Self {
                agents: vec![AgentId(0), AgentId(1)],
                actions: Discrete::new(3),
            }
        }
    }

    impl PosgModel for Dropout {
        type State = u32;
        type Action = usize;
        type Obs = usize;

        fn possible_agents(&self) -> &[AgentId] {
            &self.agents
        }

        fn active_agents(&self, state: &u32) -> Vec<AgentId> {
            if *state == 0 {
                self.agents.clone()
            } else {
                vec![AgentId(0)]
            }
        }

        fn action_space(&self, _agent: AgentId) -> &dyn Space<usize> {
            &self.actions
        }

        fn observation_space(&self, _agent: AgentId) -> &dyn Space<usize> {
            &self.actions
        }

        fn reward_range(&self, _agent: AgentId) -> RewardRange {
            RewardRange::new(0.0, 0.0)
        }

        fn sample_initial_state(&self, _rng: &mut SimRng) -> Result<u32, EnvError> {
            Ok(0)
        }

        fn sample_initial_obs(&self, _state: &u32) -> JointObservation<usize> {
            self.agents.iter().map(|&a| (a, 0)).collect()
        }

        fn step(
            &self,
            state: &u32,
            actions: &JointAction<usize>,
            _rng: &mut SimRng,
        ) -> Result<JointTimestep<u32, usize>, EnvError> {
            self.validate_actions(state, actions)?;
            let next = state + 1;
            let observations = actions.iter().map(|(&a, &u)| (a, u)).collect();
            let rewards: JointReward = actions.keys().map(|&a| (a, 0.0)).collect();
            let flags: AgentFlags = actions.keys().map(|&a| (a, false)).collect();
            Ok(JointTimestep {
                state: next,
                observations,
                rewards,
                terminated: flags.clone(),
                truncated: flags,
                all_done: false,
                info: IndexMap::<AgentId, AgentInfo>::new(),
            })
        }
    }

    fn joint(pairs: &[(u32, usize)]) -> JointAction<usize> {
        pairs.iter().map(|&(a, u)| (AgentId(a), u)).collect()
    }

    #[test]
    fn defaults_cover_all_agents() {
        let m = Dropout::new();
        assert_eq!(m.n_agents(), 2);
        assert_eq!(m.horizon(), None);
        assert!(m.render_ansi(&0).is_none());
    }

    #[test]
    fn accepts_complete_in_space_actions() {
        let m = Dropout::new();
        assert!(m.validate_actions(&0, &joint(&[(0, 2), (1, 0)])).is_ok());
    }

    #[test]
    fn rejects_missing_action() {
        let m = Dropout::new();
        let err = m.validate_actions(&0, &joint(&[(0, 1)])).unwrap_err();
        assert!(matches!(err, EnvError::InvalidAction { agent: AgentId(1), .. }));
    }

    #[test]
    fn rejects_out_of_space_action() {
        let m = Dropout::new();
        let err = m.validate_actions(&0, &joint(&[(0, 3), (1, 0)])).unwrap_err();
        assert!(matches!(err, EnvError::InvalidAction { agent: AgentId(0), .. }));
    }

    #[test]
    fn rejects_action_for_inactive_agent() {
        let m = Dropout::new();
        let err = m.validate_actions(&1, &joint(&[(0, 0), (1, 0)])).unwrap_err();
        assert_eq!(
            err,
            EnvError::InvalidAction {
                agent: AgentId(1),
                reason: "agent is not active".into(),
            }
        );
    }

    #[test]
    fn step_rejects_before_producing_state() {
        let m = Dropout::new();
        let mut rng = crate::rng::seeded_rng(0);
        assert!(m.step(&0, &joint(&[(0, 9), (1, 0)]), &mut rng).is_err());
        let ts = m.step(&0, &joint(&[(0, 1), (1, 2)]), &mut rng).unwrap();
        assert_eq!(ts.state, 1);
        assert_eq!(ts.observations[&AgentId(1)], 2);
    }
}
