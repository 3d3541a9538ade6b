//! Integration test: the reset/step state machine, no-clobber on bad
//! input, horizon truncation and seeded determinism.

use posgrid_core::{AgentId, EnvError, EnvStatus, JointAction, StepId};
use posgrid_engine::{Env, EnvConfig, Environment};
use posgrid_test_utils::{CountingModel, TrajectoryHasher};
use proptest::prelude::*;

fn both(a: usize, b: usize) -> JointAction<usize> {
    [(AgentId(0), a), (AgentId(1), b)].into_iter().collect()
}

fn env(model: CountingModel, horizon: Option<u64>) -> Env<CountingModel> {
    let config = EnvConfig {
        seed: 0,
        max_episode_steps: horizon,
    };
    Env::new(model, config).unwrap()
}

// ── State machine ────────────────────────────────────────────

#[test]
fn step_before_reset_is_invalid_state() {
    let mut env = env(CountingModel::new(), None);
    assert_eq!(env.status(), EnvStatus::Uninitialized);
    let err = env.step(both(0, 0)).unwrap_err();
    assert_eq!(
        err,
        EnvError::InvalidState {
            status: EnvStatus::Uninitialized
        }
    );
}

#[test]
fn terminal_until_reset() {
    let mut env = env(CountingModel::terminating_at(2), None);
    env.reset(Some(1)).unwrap();
    assert_eq!(env.status(), EnvStatus::Ready);
    let out = env.step(both(0, 1)).unwrap();
    assert!(!out.all_done);
    assert_eq!(env.status(), EnvStatus::Ready);
    let out = env.step(both(0, 1)).unwrap();
    assert!(out.all_done);
    assert!(out.terminated.values().all(|&t| t));
    assert!(out.truncated.values().all(|&t| !t));
    assert_eq!(env.status(), EnvStatus::Terminal);

    assert!(matches!(
        env.step(both(0, 0)),
        Err(EnvError::InvalidState {
            status: EnvStatus::Terminal
        })
    ));

    env.reset(None).unwrap();
    assert_eq!(env.status(), EnvStatus::Ready);
    assert_eq!(env.step_count(), StepId(0));
}

#[test]
fn close_returns_to_uninitialized() {
    let mut env = env(CountingModel::new(), None);
    env.reset(None).unwrap();
    env.close();
    assert_eq!(env.status(), EnvStatus::Uninitialized);
    assert!(env.state().is_none());
    assert!(env.step(both(0, 0)).is_err());
}

// ── No-clobber ───────────────────────────────────────────────

#[test]
fn invalid_action_leaves_everything_unchanged() {
    let mut env = env(CountingModel::new(), None);
    env.reset(Some(9)).unwrap();
    env.step(both(1, 1)).unwrap();
    let state = env.state().cloned();
    let step = env.step_count();

    let err = env.step(both(2, 0)).unwrap_err();
    assert!(matches!(err, EnvError::InvalidAction { agent: AgentId(0), .. }));
    let missing: JointAction<usize> = [(AgentId(0), 0)].into_iter().collect();
    let err = env.step(missing).unwrap_err();
    assert!(matches!(err, EnvError::InvalidAction { agent: AgentId(1), .. }));

    assert_eq!(env.state().cloned(), state);
    assert_eq!(env.step_count(), step);
    assert_eq!(env.status(), EnvStatus::Ready);

    // The RNG did not advance: the next step matches a fresh replay.
    let out = env.step(both(0, 0)).unwrap();
    let mut replay = self::env(CountingModel::new(), None);
    replay.reset(Some(9)).unwrap();
    replay.step(both(1, 1)).unwrap();
    assert_eq!(replay.step(both(0, 0)).unwrap(), out);
}

// ── Horizon ──────────────────────────────────────────────────

#[test]
fn truncates_exactly_at_horizon() {
    let mut env = env(CountingModel::new(), Some(3));
    env.reset(None).unwrap();
    for _ in 0..2 {
        let out = env.step(both(0, 0)).unwrap();
        assert!(!out.all_done);
        assert!(out.truncated.values().all(|&t| !t));
    }
    let out = env.step(both(0, 0)).unwrap();
    assert!(out.all_done);
    assert!(out.truncated.values().all(|&t| t));
    assert!(out.terminated.values().all(|&t| !t));
    assert_eq!(env.status(), EnvStatus::Terminal);
}

#[test]
fn termination_at_horizon_is_not_truncation() {
    let mut env = env(CountingModel::terminating_at(3), Some(3));
    env.reset(None).unwrap();
    env.step(both(0, 0)).unwrap();
    env.step(both(0, 0)).unwrap();
    let out = env.step(both(0, 0)).unwrap();
    assert!(out.all_done);
    assert!(out.terminated.values().all(|&t| t));
    assert!(out.truncated.values().all(|&t| !t));
}

// ── Determinism ──────────────────────────────────────────────

fn rollout(seed: Option<u64>, env: &mut Env<CountingModel>, actions: &[(usize, usize)]) -> u64 {
    let mut h = TrajectoryHasher::new();
    h.feed(&env.reset(seed).unwrap());
    for &(a, b) in actions {
        let out = env.step(both(a, b)).unwrap();
        h.feed(&out);
        h.feed(&env.state());
    }
    h.finish()
}

#[test]
fn reset_without_seed_continues_the_stream() {
    let mut env = env(CountingModel::new(), None);
    let actions = vec![(0, 1); 16];
    let first = rollout(Some(5), &mut env, &actions);
    let second = rollout(None, &mut env, &actions);
    let reseeded = rollout(Some(5), &mut env, &actions);
    assert_eq!(first, reseeded);
    assert_ne!(first, second);
}

proptest! {
    #[test]
    fn same_seed_same_trajectory(
        seed in any::<u64>(),
        actions in prop::collection::vec((0usize..2, 0usize..2), 1..30),
    ) {
        let mut a = env(CountingModel::new(), None);
        let mut b = env(CountingModel::new(), None);
        prop_assert_eq!(
            rollout(Some(seed), &mut a, &actions),
            rollout(Some(seed), &mut b, &actions)
        );
    }

    #[test]
    fn rewards_stay_in_range(
        actions in prop::collection::vec((0usize..2, 0usize..2), 1..30),
    ) {
        let mut env = env(CountingModel::new(), None);
        env.reset(Some(0)).unwrap();
        for (a, b) in actions {
            let out = env.step(both(a, b)).unwrap();
            for (&agent, &r) in &out.rewards {
                prop_assert!(env.reward_range(agent).contains(r));
            }
        }
    }
}
