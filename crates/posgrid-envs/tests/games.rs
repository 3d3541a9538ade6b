//! Integration test: per-game invariants under arbitrary action sequences,
//! and seeded reproducibility of whole trajectories.

use std::collections::HashSet;
use std::fmt::Debug;

use posgrid_core::{AgentId, Coord, JointAction, PosgModel};
use posgrid_engine::{Env, EnvConfig, Environment};
use posgrid_envs::{
    Driving, DrivingConfig, LbfConfig, LevelBasedForaging, PredatorPrey, PredatorPreyConfig, PursuitEvasion,
    PursuitEvasionConfig, TwoPaths, TwoPathsConfig,
};
use posgrid_obs::ObservationMode;
use posgrid_test_utils::TrajectoryHasher;
use proptest::prelude::*;

fn joint(n_agents: usize, n_actions: usize, raw: &[usize], t: usize) -> JointAction<usize> {
    (0..n_agents)
        .map(|i| (AgentId(i as u32), raw[(t * n_agents + i) % raw.len()] % n_actions))
        .collect()
}

/// Run `steps` joint actions from `raw`, resetting after episode ends, and
/// call `check` on every state reached.
fn drive<M>(
    model: M,
    seed: u64,
    n_actions: usize,
    raw: &[usize],
    steps: usize,
    mut check: impl FnMut(&M, &M::State),
) -> u64
where
    M: PosgModel<Action = usize>,
    M::Obs: Debug,
{
    let mut env = Env::new(model, EnvConfig::default()).unwrap();
    let mut hasher = TrajectoryHasher::new();
    hasher.feed(&env.reset(Some(seed)).unwrap());
    let n = env.possible_agents().len();
    for t in 0..steps {
        let out = env.step(joint(n, n_actions, raw, t)).unwrap();
        hasher.feed(&out);
        if let Some(state) = env.state() {
            hasher.feed(state);
            check(env.model(), state);
        }
        if out.all_done {
            hasher.feed(&env.reset(None).unwrap());
        }
    }
    hasher.finish()
}

fn distinct(cells: impl IntoIterator<Item = Coord>) -> bool {
    let mut seen = HashSet::new();
    cells.into_iter().all(|c| seen.insert(c))
}

fn predator_prey(cooperative: bool, prey_strength: usize) -> PredatorPrey {
    PredatorPrey::new(PredatorPreyConfig {
        grid_name: "5x5".into(),
        num_predators: 3,
        num_prey: 3,
        cooperative,
        prey_strength,
        action_probs: 0.9,
        ..PredatorPreyConfig::default()
    })
    .unwrap()
}

fn lbf(static_layout: bool, mode: ObservationMode) -> LevelBasedForaging {
    LevelBasedForaging::new(LbfConfig {
        num_agents: 3,
        field_size: 6,
        max_food: 4,
        static_layout,
        observation_mode: mode,
        penalty: 0.1,
        ..LbfConfig::default()
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // ── PredatorPrey ─────────────────────────────────────────

    #[test]
    fn predators_and_prey_never_share_cells(
        seed in any::<u64>(),
        cooperative in any::<bool>(),
        strength in 1usize..=3,
        raw in prop::collection::vec(0usize..5, 1..40),
    ) {
        drive(predator_prey(cooperative, strength), seed, 5, &raw, 60, |m, s| {
            let free: Vec<Coord> = s.free_prey().collect();
            assert!(distinct(s.predators.iter().copied()));
            assert!(distinct(free.iter().copied()));
            assert!(s.predators.iter().all(|p| !free.contains(p)));
            assert!(s.predators.iter().chain(&free).all(|&c| m.grid().is_free(c)));
        });
    }

    #[test]
    fn caught_prey_stay_caught(
        seed in any::<u64>(),
        raw in prop::collection::vec(0usize..5, 1..40),
    ) {
        let mut last: Option<Vec<bool>> = None;
        drive(predator_prey(true, 1), seed, 5, &raw, 60, |_, s| {
            // Episodes only end with every prey caught; the next state
            // then belongs to a fresh episode.
            if let Some(prev) = last.as_ref().filter(|p| !p.iter().all(|&c| c)) {
                for (was, now) in prev.iter().zip(&s.caught) {
                    assert!(!was || *now);
                }
            }
            last = Some(s.caught.clone());
        });
    }

    // ── Level-based foraging ─────────────────────────────────

    #[test]
    fn foragers_never_stand_on_food(
        seed in any::<u64>(),
        static_layout in any::<bool>(),
        raw in prop::collection::vec(0usize..6, 1..40),
    ) {
        drive(lbf(static_layout, ObservationMode::Tuple), seed, 6, &raw, 60, |m, s| {
            assert!(distinct(s.agents.iter().copied()));
            for (food, level) in s.remaining_food() {
                assert!(!s.agents.contains(&food));
                assert!((1..=m.config().max_food_level()).contains(&level));
            }
        });
    }

    #[test]
    fn lbf_trajectories_repeat_per_seed(
        seed in any::<u64>(),
        raw in prop::collection::vec(0usize..6, 1..40),
    ) {
        let a = drive(lbf(false, ObservationMode::Grid), seed, 6, &raw, 40, |_, _| {});
        let b = drive(lbf(false, ObservationMode::Grid), seed, 6, &raw, 40, |_, _| {});
        prop_assert_eq!(a, b);
    }

    // ── Driving ──────────────────────────────────────────────

    #[test]
    fn cars_never_share_cells(
        seed in any::<u64>(),
        obstacle_collisions in any::<bool>(),
        infinite_horizon in any::<bool>(),
        raw in prop::collection::vec(0usize..5, 1..40),
    ) {
        let model = Driving::new(DrivingConfig {
            num_agents: 4,
            obstacle_collisions,
            infinite_horizon,
            action_probs: 0.9,
            ..DrivingConfig::default()
        })
        .unwrap();
        drive(model, seed, 5, &raw, 60, |m, s| {
            assert!(distinct(s.vehicles.iter().map(|v| v.coord)));
            for v in &s.vehicles {
                assert!(m.grid().contains(v.coord));
                if m.config().obstacle_collisions {
                    assert!(m.grid().is_free(v.coord));
                }
            }
        });
    }

    // ── Two-player chases ────────────────────────────────────

    #[test]
    fn chase_trajectories_repeat_per_seed(
        seed in any::<u64>(),
        raw in prop::collection::vec(0usize..5, 1..40),
    ) {
        let stochastic = TwoPathsConfig {
            action_probs: 0.8,
            ..TwoPathsConfig::default()
        };
        let a = drive(TwoPaths::new(stochastic.clone()).unwrap(), seed, 4, &raw, 50, |_, _| {});
        let b = drive(TwoPaths::new(stochastic).unwrap(), seed, 4, &raw, 50, |_, _| {});
        prop_assert_eq!(a, b);

        let pe = || {
            PursuitEvasion::new(PursuitEvasionConfig {
                action_probs: 0.8,
                ..PursuitEvasionConfig::default()
            })
            .unwrap()
        };
        let a = drive(pe(), seed, 5, &raw, 50, |_, _| {});
        let b = drive(pe(), seed, 5, &raw, 50, |_, _| {});
        prop_assert_eq!(a, b);
    }

    #[test]
    fn evader_progress_never_regresses(
        seed in any::<u64>(),
        raw in prop::collection::vec(0usize..5, 1..40),
    ) {
        let model = PursuitEvasion::new(PursuitEvasionConfig::default()).unwrap();
        drive(model, seed, 5, &raw, 80, |m, s| {
            assert!(m.grid().is_free(s.evader) && m.grid().is_free(s.pursuer));
            assert!(s.min_goal_dist <= m.goal_distance(s.evader_goal, s.evader_start));
        });
    }
}
