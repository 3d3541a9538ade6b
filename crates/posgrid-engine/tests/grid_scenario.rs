//! Integration test: two walkers on an open 5x5 grid contesting one cell.

use posgrid_core::{AgentId, Coord, Direction, JointAction};
use posgrid_engine::{Env, EnvConfig, Environment, RenderMode};
use posgrid_test_utils::{open_grid, GridWalkModel};

fn act(a: Direction, b: Direction) -> JointAction<usize> {
    [(AgentId(0), a.index()), (AgentId(1), b.index())]
        .into_iter()
        .collect()
}

fn walkers(starts: [Coord; 2]) -> Env<GridWalkModel> {
    let model = GridWalkModel::new(open_grid(5, 5), starts.to_vec());
    let mut env = Env::new(model, EnvConfig::default()).unwrap();
    env.reset(Some(0)).unwrap();
    env
}

fn positions(env: &Env<GridWalkModel>) -> Vec<Coord> {
    env.state().map(|s| s.positions.clone()).unwrap_or_default()
}

#[test]
fn corner_walkers_contesting_a_cell_both_stay() {
    let mut env = walkers([Coord::new(0, 0), Coord::new(4, 4)]);
    for _ in 0..3 {
        let out = env.step(act(Direction::East, Direction::North)).unwrap();
        assert!(!out.all_done);
    }
    assert_eq!(positions(&env), vec![Coord::new(3, 0), Coord::new(4, 1)]);

    // Both now target (4, 0).
    let out = env.step(act(Direction::East, Direction::North)).unwrap();
    assert_eq!(positions(&env), vec![Coord::new(3, 0), Coord::new(4, 1)]);
    assert!(!out.all_done);
    assert_eq!(out.rewards[&AgentId(0)], 0.0);
    assert_eq!(out.rewards[&AgentId(1)], 0.0);
}

#[test]
fn walkers_two_apart_contesting_the_middle_both_stay() {
    let mut env = walkers([Coord::new(1, 2), Coord::new(3, 2)]);
    let out = env.step(act(Direction::East, Direction::West)).unwrap();
    assert_eq!(positions(&env), vec![Coord::new(1, 2), Coord::new(3, 2)]);
    assert!(!out.all_done);
}

#[test]
fn adjacent_walkers_cannot_swap() {
    let mut env = walkers([Coord::new(1, 2), Coord::new(2, 2)]);
    env.step(act(Direction::East, Direction::West)).unwrap();
    assert_eq!(positions(&env), vec![Coord::new(1, 2), Coord::new(2, 2)]);
}

#[test]
fn following_into_a_vacated_cell_is_allowed() {
    let mut env = walkers([Coord::new(1, 2), Coord::new(2, 2)]);
    env.step(act(Direction::East, Direction::East)).unwrap();
    assert_eq!(positions(&env), vec![Coord::new(2, 2), Coord::new(3, 2)]);
}

#[test]
fn walls_of_the_grid_stop_movement() {
    let mut env = walkers([Coord::new(0, 0), Coord::new(4, 4)]);
    let out = env.step(act(Direction::North, Direction::East)).unwrap();
    assert_eq!(positions(&env), vec![Coord::new(0, 0), Coord::new(4, 4)]);
    assert!(out.rewards.values().all(|&r| r == 0.0));
}

#[test]
fn render_draws_agents_by_index() {
    let env = walkers([Coord::new(0, 0), Coord::new(4, 4)]);
    let text = env.render(RenderMode::Ansi).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], "0....");
    assert_eq!(rows[4], "....1");
}
