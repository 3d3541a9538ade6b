//! The stateful environment driver.
//!
//! [`Env`] is the only place mutable episode state lives. The model is a
//! pure description of the game; `Env` keeps the current state, the RNG
//! stream and the step counter, and enforces the lifecycle:
//!
//! ```text
//! Uninitialized --reset--> Ready --step--> Ready ... --step (done)--> Terminal
//!       ^                    ^                                         |
//!       +------ close -------+------------------ reset ----------------+
//! ```
//!
//! # Ownership model
//!
//! `Env` is [`Send`] whenever the model and its state are, so it can be
//! moved to a worker thread. It is never shared: every operation takes
//! `&mut self`, and parallel rollouts use one `Env` per thread.

use std::fmt;

use posgrid_core::{
    seeded_rng, AgentId, ConfigError, EnvError, EnvStatus, JointAction, JointObservation,
    JointReward, PosgModel, RewardRange, SimRng, Space, StepId,
};

use crate::config::EnvConfig;
use crate::environment::{Environment, RenderMode, StepOutput};
use crate::stats::EpisodeStats;

/// Drives a [`PosgModel`] through reset/step episodes.
pub struct Env<M: PosgModel> {
    model: M,
    config: EnvConfig,
    rng: SimRng,
    horizon: Option<u64>,
    state: Option<M::State>,
    status: EnvStatus,
    step: StepId,
    last_actions: Option<JointAction<M::Action>>,
    last_rewards: Option<JointReward>,
    stats: EpisodeStats,
}

impl<M: PosgModel> Env<M> {
    /// Wrap `model` after validating `config`.
    ///
    /// The effective horizon is the smaller of `config.max_episode_steps`
    /// and the model's own horizon.
    pub fn new(model: M, config: EnvConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let horizon = match (config.max_episode_steps, model.horizon()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let stats = EpisodeStats::new(model.possible_agents());
        tracing::debug!(
            agents = model.n_agents(),
            seed = config.seed,
            ?horizon,
            "environment created"
        );
        Ok(Self {
            rng: seeded_rng(config.seed),
            model,
            config,
            horizon,
            state: None,
            status: EnvStatus::Uninitialized,
            step: StepId::default(),
            last_actions: None,
            last_rewards: None,
            stats,
        })
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The driver configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Current state, once reset.
    pub fn state(&self) -> Option<&M::State> {
        self.state.as_ref()
    }

    /// Steps taken in the current episode.
    pub fn step_count(&self) -> StepId {
        self.step
    }

    /// Step at which episodes are truncated, if any.
    pub fn horizon(&self) -> Option<u64> {
        self.horizon
    }

    /// Joint action of the last successful step.
    pub fn last_actions(&self) -> Option<&JointAction<M::Action>> {
        self.last_actions.as_ref()
    }

    /// Rewards of the last successful step.
    pub fn last_rewards(&self) -> Option<&JointReward> {
        self.last_rewards.as_ref()
    }

    /// Totals for the current episode.
    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// Mark every agent not already terminated as truncated.
    fn truncate(&self, output: &mut StepOutput<M::Obs>) {
        for &agent in self.model.possible_agents() {
            let terminated = output.terminated.get(&agent).copied().unwrap_or(false);
            output.truncated.insert(agent, !terminated);
        }
        output.all_done = true;
    }
}

impl<M: PosgModel> Environment for Env<M> {
    type Action = M::Action;
    type Obs = M::Obs;

    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<M::Obs>, EnvError> {
        if let Some(seed) = seed {
            self.rng = seeded_rng(seed);
        }
        let state = self.model.sample_initial_state(&mut self.rng)?;
        let observations = self.model.sample_initial_obs(&state);
        self.state = Some(state);
        self.status = EnvStatus::Ready;
        self.step = StepId::default();
        self.last_actions = None;
        self.last_rewards = None;
        self.stats = EpisodeStats::new(self.model.possible_agents());
        tracing::debug!(?seed, "episode reset");
        Ok(observations)
    }

    fn step(&mut self, actions: JointAction<M::Action>) -> Result<StepOutput<M::Obs>, EnvError> {
        let state = match (&self.state, self.status) {
            (Some(state), EnvStatus::Ready) => state,
            (_, status) => {
                tracing::debug!(%status, "step rejected");
                return Err(EnvError::InvalidState { status });
            }
        };
        if let Err(e) = self.model.validate_actions(state, &actions) {
            tracing::debug!(error = %e, step = self.step.0, "step rejected");
            return Err(e);
        }
        let ts = self.model.step(state, &actions, &mut self.rng)?;
        let (next, mut output) = StepOutput::from_timestep(ts);

        self.step = StepId(self.step.0 + 1);
        if self.horizon.is_some_and(|h| self.step.0 >= h) && !output.all_done {
            self.truncate(&mut output);
        }
        self.stats.record(&output.rewards);
        self.state = Some(next);
        self.last_actions = Some(actions);
        self.last_rewards = Some(output.rewards.clone());

        if output.all_done {
            self.status = EnvStatus::Terminal;
            tracing::debug!(
                steps = self.stats.length,
                returns = ?self.stats.returns,
                "episode finished"
            );
        } else {
            tracing::trace!(step = self.step.0, "step");
        }
        Ok(output)
    }

    fn render(&self, mode: RenderMode) -> Option<String> {
        let text = self.model.render_ansi(self.state.as_ref()?)?;
        match mode {
            RenderMode::Ansi => Some(text),
            RenderMode::Human => {
                println!("{text}");
                None
            }
        }
    }

    fn close(&mut self) {
        self.state = None;
        self.status = EnvStatus::Uninitialized;
        tracing::debug!("environment closed");
    }

    fn status(&self) -> EnvStatus {
        self.status
    }

    fn possible_agents(&self) -> &[AgentId] {
        self.model.possible_agents()
    }

    fn agents(&self) -> Vec<AgentId> {
        match &self.state {
            Some(state) => self.model.active_agents(state),
            None => self.model.possible_agents().to_vec(),
        }
    }

    fn action_space(&self, agent: AgentId) -> &dyn Space<M::Action> {
        self.model.action_space(agent)
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<M::Obs> {
        self.model.observation_space(agent)
    }

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        self.model.reward_range(agent)
    }
}

impl<M: PosgModel> fmt::Debug for Env<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("status", &self.status)
            .field("step", &self.step)
            .field("horizon", &self.horizon)
            .field("seed", &self.config.seed)
            .finish()
    }
}
