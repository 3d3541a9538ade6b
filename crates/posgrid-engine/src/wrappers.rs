//! Composable environment wrappers.
//!
//! Each wrapper holds the inner environment by value, implements
//! [`Environment`] itself, and forwards every operation it does not
//! rewrite. What gets rewritten is supplied as a transform:
//!
//! - [`ObservationWrapper`] + [`ObservationTransform`]
//! - [`RewardWrapper`] + [`RewardTransform`]
//! - [`ActionWrapper`] + [`ActionTransform`], which maps actions both ways
//!
//! Wrappers never touch the lifecycle, so a wrapped environment follows
//! the same `reset`/`step` state machine as the inner one.

use std::fmt;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, ConfigError, Direction, EnvError, EnvStatus, JointAction, JointObservation,
    RewardRange, SimRng, Space,
};
use posgrid_obs::{Observation, ObservationMode, ObservationSpace};
use rand::Rng;

use crate::environment::{Environment, RenderMode, StepOutput};

// ── Transforms ─────────────────────────────────────────────────

/// Rewrites observations from `In` to [`Out`](Self::Out).
pub trait ObservationTransform<In> {
    /// Transformed observation type.
    type Out: Clone + fmt::Debug + 'static;

    /// Transform one agent's observation.
    fn observation(&self, agent: AgentId, obs: In) -> Self::Out;

    /// Space of transformed observations for `agent`.
    fn observation_space(&self, agent: AgentId) -> &dyn Space<Self::Out>;
}

/// Rewrites scalar rewards.
pub trait RewardTransform {
    /// Transform one agent's reward.
    fn reward(&self, agent: AgentId, reward: f64) -> f64;

    /// Bounds of transformed rewards, given the inner bounds.
    fn reward_range(&self, agent: AgentId, inner: RewardRange) -> RewardRange;
}

/// Maps caller-facing actions to the inner environment's actions and back.
pub trait ActionTransform<Inner> {
    /// Caller-facing action type.
    type Outer: Clone + fmt::Debug + 'static;

    /// Outer action to inner action.
    fn action(&self, agent: AgentId, action: Self::Outer) -> Inner;

    /// Inner action to outer action.
    fn reverse_action(&self, agent: AgentId, action: Inner) -> Self::Outer;

    /// Space of outer actions for `agent`.
    fn action_space(&self, agent: AgentId) -> &dyn Space<Self::Outer>;
}

// ── Delegation ─────────────────────────────────────────────────

/// Forwards the `Environment` methods a wrapper leaves untouched.
macro_rules! delegate_lifecycle {
    () => {
        fn render(&self, mode: RenderMode) -> Option<String> {
            self.env.render(mode)
        }

        fn close(&mut self) {
            self.env.close()
        }

        fn status(&self) -> EnvStatus {
            self.env.status()
        }

        fn possible_agents(&self) -> &[AgentId] {
            self.env.possible_agents()
        }

        fn agents(&self) -> Vec<AgentId> {
            self.env.agents()
        }
    };
}

macro_rules! wrapper_accessors {
    ($name:ident) => {
        impl<E, T> $name<E, T> {
            /// Wrap `env`, rewriting through `transform`.
            pub fn new(env: E, transform: T) -> Self {
                Self { env, transform }
            }

            /// The wrapped environment.
            pub fn inner(&self) -> &E {
                &self.env
            }

            /// The wrapped environment, mutably.
            pub fn inner_mut(&mut self) -> &mut E {
                &mut self.env
            }

            /// Unwrap, discarding the transform.
            pub fn into_inner(self) -> E {
                self.env
            }

            /// The transform in use.
            pub fn transform(&self) -> &T {
                &self.transform
            }
        }
    };
}

// ── ObservationWrapper ─────────────────────────────────────────

/// Rewrites every observation leaving `reset` and `step`.
#[derive(Debug)]
pub struct ObservationWrapper<E, T> {
    env: E,
    transform: T,
}

wrapper_accessors!(ObservationWrapper);

impl<E, T> Environment for ObservationWrapper<E, T>
where
    E: Environment,
    T: ObservationTransform<E::Obs>,
{
    type Action = E::Action;
    type Obs = T::Out;

    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<T::Out>, EnvError> {
        let obs = self.env.reset(seed)?;
        Ok(obs
            .into_iter()
            .map(|(agent, o)| (agent, self.transform.observation(agent, o)))
            .collect())
    }

    fn step(&mut self, actions: JointAction<E::Action>) -> Result<StepOutput<T::Out>, EnvError> {
        let output = self.env.step(actions)?;
        let transform = &self.transform;
        Ok(output.map_observations(|agent, o| transform.observation(agent, o)))
    }

    delegate_lifecycle!();

    fn action_space(&self, agent: AgentId) -> &dyn Space<E::Action> {
        self.env.action_space(agent)
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<T::Out> {
        self.transform.observation_space(agent)
    }

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        self.env.reward_range(agent)
    }
}

// ── RewardWrapper ──────────────────────────────────────────────

/// Rewrites every reward leaving `step`.
#[derive(Debug)]
pub struct RewardWrapper<E, T> {
    env: E,
    transform: T,
}

wrapper_accessors!(RewardWrapper);

impl<E, T> Environment for RewardWrapper<E, T>
where
    E: Environment,
    T: RewardTransform,
{
    type Action = E::Action;
    type Obs = E::Obs;

    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<E::Obs>, EnvError> {
        self.env.reset(seed)
    }

    fn step(&mut self, actions: JointAction<E::Action>) -> Result<StepOutput<E::Obs>, EnvError> {
        let mut output = self.env.step(actions)?;
        for (&agent, r) in output.rewards.iter_mut() {
            *r = self.transform.reward(agent, *r);
        }
        Ok(output)
    }

    delegate_lifecycle!();

    fn action_space(&self, agent: AgentId) -> &dyn Space<E::Action> {
        self.env.action_space(agent)
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<E::Obs> {
        self.env.observation_space(agent)
    }

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        self.transform
            .reward_range(agent, self.env.reward_range(agent))
    }
}

// ── ActionWrapper ──────────────────────────────────────────────

/// Accepts outer actions and maps them to the inner environment's actions.
#[derive(Debug)]
pub struct ActionWrapper<E, T> {
    env: E,
    transform: T,
}

wrapper_accessors!(ActionWrapper);

impl<E, T> ActionWrapper<E, T>
where
    E: Environment,
    T: ActionTransform<E::Action>,
{
    /// Map native actions back to the outer action type.
    pub fn reverse_actions(&self, actions: JointAction<E::Action>) -> JointAction<T::Outer> {
        actions
            .into_iter()
            .map(|(agent, a)| (agent, self.transform.reverse_action(agent, a)))
            .collect()
    }
}

impl<E, T> Environment for ActionWrapper<E, T>
where
    E: Environment,
    T: ActionTransform<E::Action>,
{
    type Action = T::Outer;
    type Obs = E::Obs;

    fn reset(&mut self, seed: Option<u64>) -> Result<JointObservation<E::Obs>, EnvError> {
        self.env.reset(seed)
    }

    fn step(&mut self, actions: JointAction<T::Outer>) -> Result<StepOutput<E::Obs>, EnvError> {
        let inner = actions
            .into_iter()
            .map(|(agent, a)| (agent, self.transform.action(agent, a)))
            .collect();
        self.env.step(inner)
    }

    delegate_lifecycle!();

    fn action_space(&self, agent: AgentId) -> &dyn Space<T::Outer> {
        self.transform.action_space(agent)
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<E::Obs> {
        self.env.observation_space(agent)
    }

    fn reward_range(&self, agent: AgentId) -> RewardRange {
        self.env.reward_range(agent)
    }
}

// ── FlattenObservation ─────────────────────────────────────────

/// Re-encodes any [`Observation`] as [`Observation::Vector`].
#[derive(Clone, Debug)]
pub struct FlattenObservation {
    spaces: IndexMap<AgentId, ObservationSpace>,
}

impl FlattenObservation {
    /// Build from the observation spaces of `env`.
    ///
    /// Fails if some agent's space is not an [`ObservationSpace`].
    pub fn new<E: Environment<Obs = Observation>>(env: &E) -> Result<Self, ConfigError> {
        let mut spaces = IndexMap::new();
        for &agent in env.possible_agents() {
            let space = env
                .observation_space(agent)
                .downcast_ref::<ObservationSpace>()
                .ok_or_else(|| {
                    ConfigError::invalid(
                        "observation_space",
                        format!("agent {agent} does not use an ObservationSpace"),
                    )
                })?;
            let flat = ObservationSpace::new(
                ObservationMode::Vector,
                vec![space.size()],
                space.low().to_vec(),
                space.high().to_vec(),
            );
            spaces.insert(agent, flat);
        }
        Ok(Self { spaces })
    }

    /// Wrap `env` so it emits flat vectors.
    pub fn wrap<E: Environment<Obs = Observation>>(
        env: E,
    ) -> Result<ObservationWrapper<E, Self>, ConfigError> {
        let transform = Self::new(&env)?;
        Ok(ObservationWrapper::new(env, transform))
    }
}

impl ObservationTransform<Observation> for FlattenObservation {
    type Out = Observation;

    fn observation(&self, _agent: AgentId, obs: Observation) -> Observation {
        match obs {
            Observation::Vector(_) => obs,
            other => Observation::Vector(other.flatten()),
        }
    }

    fn observation_space(&self, agent: AgentId) -> &dyn Space<Observation> {
        &self.spaces[&agent]
    }
}

// ── ScaleReward ────────────────────────────────────────────────

/// Multiplies every reward by a constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleReward {
    /// Multiplier. May be negative.
    pub factor: f64,
}

impl RewardTransform for ScaleReward {
    fn reward(&self, _agent: AgentId, reward: f64) -> f64 {
        reward * self.factor
    }

    fn reward_range(&self, _agent: AgentId, inner: RewardRange) -> RewardRange {
        let (a, b) = (inner.min * self.factor, inner.max * self.factor);
        RewardRange::new(a.min(b), a.max(b))
    }
}

// ── DirectionActions ───────────────────────────────────────────

/// A non-empty set of directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionSpace {
    directions: Vec<Direction>,
}

impl DirectionSpace {
    /// Space over `directions`.
    ///
    /// # Panics
    ///
    /// Panics if `directions` is empty.
    pub fn new(directions: &[Direction]) -> Self {
        assert!(
            !directions.is_empty(),
            "DirectionSpace must have at least one direction"
        );
        Self {
            directions: directions.to_vec(),
        }
    }

    /// Members in declaration order.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }
}

impl Space<Direction> for DirectionSpace {
    fn sample(&self, rng: &mut SimRng) -> Direction {
        self.directions[rng.random_range(0..self.directions.len())]
    }

    fn contains(&self, value: &Direction) -> bool {
        self.directions.contains(value)
    }
}

/// Lets callers act with [`Direction`]s in games whose movement actions
/// use direction indices.
///
/// Non-movement actions (indices past [`Direction::None`]) reverse to
/// [`Direction::None`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionActions {
    space: DirectionSpace,
}

impl DirectionActions {
    /// Accept exactly `directions`.
    pub fn new(directions: &[Direction]) -> Self {
        Self {
            space: DirectionSpace::new(directions),
        }
    }

    /// Accept the four moving directions.
    pub fn cardinal() -> Self {
        Self::new(&Direction::CARDINAL)
    }

    /// Accept every direction including staying put.
    pub fn all() -> Self {
        Self::new(&Direction::ALL)
    }
}

impl ActionTransform<usize> for DirectionActions {
    type Outer = Direction;

    fn action(&self, _agent: AgentId, action: Direction) -> usize {
        action.index()
    }

    fn reverse_action(&self, _agent: AgentId, action: usize) -> Direction {
        Direction::from_index(action).unwrap_or(Direction::None)
    }

    fn action_space(&self, _agent: AgentId) -> &dyn Space<Direction> {
        &self.space
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgrid_core::seeded_rng;

    #[test]
    fn scale_reward_flips_range_for_negative_factor() {
        let t = ScaleReward { factor: -2.0 };
        let r = t.reward_range(AgentId(0), RewardRange::new(-1.0, 0.5));
        assert_eq!(r, RewardRange::new(-1.0, 2.0));
        assert_eq!(t.reward(AgentId(0), 0.5), -1.0);
    }

    #[test]
    fn direction_actions_round_trip_indices() {
        let t = DirectionActions::all();
        for d in Direction::ALL {
            let idx = t.action(AgentId(0), d);
            assert_eq!(t.reverse_action(AgentId(0), idx), d);
        }
        assert_eq!(t.reverse_action(AgentId(0), 5), Direction::None);
    }

    #[test]
    fn direction_space_samples_members() {
        let space = DirectionSpace::new(&Direction::CARDINAL);
        let mut rng = seeded_rng(4);
        for _ in 0..50 {
            let d = space.sample(&mut rng);
            assert!(space.contains(&d));
            assert_ne!(d, Direction::None);
        }
        assert!(!space.contains(&Direction::None));
    }

    #[test]
    fn flatten_leaves_vectors_alone() {
        let t = FlattenObservation {
            spaces: IndexMap::new(),
        };
        let v = Observation::Vector(vec![1, 2]);
        assert_eq!(t.observation(AgentId(0), v.clone()), v);
        let g = Observation::Grid {
            channels: 1,
            height: 1,
            width: 2,
            data: vec![3, 4],
        };
        assert_eq!(
            t.observation(AgentId(0), g),
            Observation::Vector(vec![3, 4])
        );
    }
}
