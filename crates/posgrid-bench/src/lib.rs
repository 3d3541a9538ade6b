//! Benchmark profiles and utilities for posgrid.
//!
//! - [`pillar_arena`]: square grid with a regular lattice of blocked cells
//! - [`scatter`]: deterministic distinct free cells via seed
//! - [`random_directions`] / [`random_joint_action`]: seeded action streams
//! - [`foraging_profile`]: a mid-sized LBF game

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashSet;

use posgrid_core::{
    seeded_rng, AgentId, ConfigError, Coord, Direction, JointAction, NoFreeCellError, SimRng,
};
use posgrid_engine::Environment;
use posgrid_envs::{LbfConfig, LevelBasedForaging};
use posgrid_grid::{Grid, GridError};
use posgrid_obs::ObservationMode;
use rand::Rng;

/// A `size`x`size` grid with every cell at odd `(x, y)` blocked.
///
/// Pillars leave every free cell reachable while giving movement and
/// line-of-sight checks something to hit.
pub fn pillar_arena(size: u32) -> Result<Grid, GridError> {
    let pillars = (0..size as i32)
        .flat_map(|y| (0..size as i32).map(move |x| Coord::new(x, y)))
        .filter(|c| c.x % 2 == 1 && c.y % 2 == 1);
    Grid::new(size, size, pillars)
}

/// `n` distinct free cells of `grid`, reproducible for a given `seed`.
pub fn scatter(grid: &Grid, n: usize, seed: u64) -> Result<Vec<Coord>, NoFreeCellError> {
    let mut rng = seeded_rng(seed);
    let mut taken = HashSet::with_capacity(n);
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let c = grid.sample_free_coord(&taken, &mut rng)?;
        taken.insert(c);
        out.push(c);
    }
    Ok(out)
}

/// `n` uniformly random directions, `None` included.
pub fn random_directions(n: usize, rng: &mut SimRng) -> Vec<Direction> {
    (0..n)
        .map(|_| Direction::ALL[rng.random_range(0..Direction::ALL.len())])
        .collect()
}

/// One uniformly sampled in-space action per active agent of `env`.
pub fn random_joint_action<E>(env: &E, rng: &mut SimRng) -> JointAction<E::Action>
where
    E: Environment + ?Sized,
{
    env.agents()
        .into_iter()
        .map(|agent: AgentId| (agent, env.action_space(agent).sample(rng)))
        .collect()
}

/// LBF on a 20x20 field with 4 agents and 10 food, observed in `mode`.
pub fn foraging_profile(mode: ObservationMode) -> Result<LevelBasedForaging, ConfigError> {
    LevelBasedForaging::new(LbfConfig {
        num_agents: 4,
        field_size: 20,
        max_food: 10,
        observation_mode: mode,
        ..LbfConfig::default()
    })
}
