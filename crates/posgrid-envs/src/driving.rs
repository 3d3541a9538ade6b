//! Driving: cars share a road grid, each heading for its own destination.
//!
//! Every car has a heading and a [`Speed`]. Actions steer and throttle:
//! [`ACCELERATE`] and [`DECELERATE`] move one speed step, [`TURN_RIGHT`]
//! and [`TURN_LEFT`] rotate the heading a quarter turn. Cars then move
//! `Speed::cells` cells along their heading (backwards in reverse), one
//! cell per sub-tick, all cars together through the shared collision
//! resolver.
//!
//! - Two cars that claim the same cell, trade cells, or run into one
//!   another both crash.
//! - With `obstacle_collisions` a car that drives into a blocked cell
//!   crashes. Without it blocked cells are open road.
//! - Leaving the map stops the car without a crash.
//!
//! A car is done once it crashes ([`R_CRASH`]) or reaches its destination
//! ([`R_DESTINATION`]); each new closest approach to the destination pays
//! [`R_PROGRESS`]. Finite episodes end when every car is done. With
//! `infinite_horizon` done cars are put back on a start cell with a fresh
//! destination at the beginning of the next step.
//!
//! Observations are a heading-relative window `obs_dim = (front, back,
//! side)` of cell codes, followed by speed, destination cell and the two
//! done flags.

use std::collections::HashSet;

use indexmap::IndexMap;
use posgrid_core::{
    AgentId, AgentInfo, ConfigError, Coord, Direction, Discrete, EnvError, JointAction,
    JointObservation, JointReward, JointTimestep, NoFreeCellError, Outcome, PosgModel,
    RewardRange, SimRng, Space,
};
use posgrid_grid::layout::{self, car_marker, CAR_DEST, CAR_START, DRIVING};
use posgrid_grid::{CollisionResolver, Grid, MoveOutcome, MovementRules};
use posgrid_obs::{Observation, ObservationMode, ObservationSpace};
use rand::Rng;

use crate::common::{agent_ids, flags};

/// Keep speed and heading.
pub const DO_NOTHING: usize = 0;
/// One speed step up.
pub const ACCELERATE: usize = 1;
/// One speed step down.
pub const DECELERATE: usize = 2;
/// Quarter turn clockwise.
pub const TURN_RIGHT: usize = 3;
/// Quarter turn anticlockwise.
pub const TURN_LEFT: usize = 4;

/// Reward on the step a car crashes.
pub const R_CRASH: f64 = -1.0;
/// Reward on the step a car reaches its destination.
pub const R_DESTINATION: f64 = 1.0;
/// Reward for a new closest approach to the destination.
pub const R_PROGRESS: f64 = 0.05;

/// Local view code of a cell holding another car.
pub const CELL_VEHICLE: i32 = 0;
/// Local view code of a blocked or off-map cell.
pub const CELL_WALL: i32 = 1;
/// Local view code of open road.
pub const CELL_EMPTY: i32 = 2;
/// Local view code of the viewer's destination.
pub const CELL_DESTINATION: i32 = 3;

/// Throttle setting of a car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Speed {
    /// One cell per step, backwards.
    Reverse = 0,
    /// Not moving.
    Stopped = 1,
    /// One cell per step.
    Slow = 2,
    /// Two cells per step.
    Fast = 3,
}

impl Speed {
    /// Observation value of this speed.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Cells travelled per step.
    pub const fn cells(self) -> usize {
        match self {
            Speed::Stopped => 0,
            Speed::Reverse | Speed::Slow => 1,
            Speed::Fast => 2,
        }
    }

    fn accelerate(self) -> Self {
        match self {
            Speed::Reverse => Speed::Stopped,
            Speed::Stopped => Speed::Slow,
            Speed::Slow | Speed::Fast => Speed::Fast,
        }
    }

    fn decelerate(self) -> Self {
        match self {
            Speed::Fast => Speed::Slow,
            Speed::Slow => Speed::Stopped,
            Speed::Stopped | Speed::Reverse => Speed::Reverse,
        }
    }
}

fn turn_right(d: Direction) -> Direction {
    match d {
        Direction::North => Direction::East,
        Direction::East => Direction::South,
        Direction::South => Direction::West,
        Direction::West => Direction::North,
        Direction::None => Direction::None,
    }
}

fn turn_left(d: Direction) -> Direction {
    turn_right(d).opposite()
}

/// Configuration for [`Driving`].
#[derive(Clone, Debug, PartialEq)]
pub struct DrivingConfig {
    /// Map name in [`DRIVING`]. Default: `"7x7"`.
    pub grid_name: String,
    /// Number of cars. Default: 2.
    pub num_agents: usize,
    /// Cells visible `(front, back, side)` of the car. Default: `(3, 1, 1)`.
    pub obs_dim: (u32, u32, u32),
    /// Blocked cells crash cars instead of being drivable. Default: `false`.
    pub obstacle_collisions: bool,
    /// Respawn done cars instead of ending the episode. Default: `false`.
    pub infinite_horizon: bool,
    /// Probability that a chosen action is executed. Default: 1.0.
    pub action_probs: f64,
}

impl Default for DrivingConfig {
    fn default() -> Self {
        Self {
            grid_name: "7x7".into(),
            num_agents: 2,
            obs_dim: (3, 1, 1),
            obstacle_collisions: false,
            infinite_horizon: false,
            action_probs: 1.0,
        }
    }
}

impl DrivingConfig {
    /// Check structural invariants. Whether the map has room for
    /// `num_agents` cars is checked by [`Driving::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        layout::lookup(DRIVING, &self.grid_name)?;
        if self.num_agents == 0 {
            return Err(ConfigError::invalid("num_agents", "must be at least 1"));
        }
        self.rules().validate()
    }

    fn rules(&self) -> MovementRules {
        MovementRules {
            action_probs: self.action_probs,
            obstacle_collisions: self.obstacle_collisions,
            agent_collisions: true,
            block_swaps: true,
        }
    }
}

/// One car.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vehicle {
    /// Current cell.
    pub coord: Coord,
    /// Direction the car faces. Always cardinal.
    pub heading: Direction,
    /// Throttle setting.
    pub speed: Speed,
    /// Cell the car must reach.
    pub dest: Coord,
    /// The car reached `dest`.
    pub dest_reached: bool,
    /// The car crashed.
    pub crashed: bool,
    /// Smallest path length to `dest` so far.
    pub min_dest_dist: u32,
}

impl Vehicle {
    /// Crashed or arrived; the car no longer moves.
    pub fn is_done(&self) -> bool {
        self.dest_reached || self.crashed
    }

    fn travel_direction(&self) -> Direction {
        match self.speed {
            Speed::Reverse => self.heading.opposite(),
            Speed::Stopped => Direction::None,
            Speed::Slow | Speed::Fast => self.heading,
        }
    }
}

/// Every car, indexed like the agents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrivingState {
    /// Cars in agent order.
    pub vehicles: Vec<Vehicle>,
}

/// The Driving game.
#[derive(Debug)]
pub struct Driving {
    config: DrivingConfig,
    grid: Grid,
    horizon: u64,
    /// `(start, destination)` markers per car.
    markers: Vec<(char, char)>,
    /// Path lengths to each destination cell, indexed by grid index.
    dest_dists: IndexMap<Coord, Vec<Option<u32>>>,
    resolver: CollisionResolver,
    agents: Vec<AgentId>,
    actions: Discrete,
    obs_space: ObservationSpace,
}

impl Driving {
    /// Build the game after validating `config`.
    pub fn new(config: DrivingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let named = layout::lookup(DRIVING, &config.grid_name)?;
        let grid = named.grid()?;

        let mut markers = Vec::with_capacity(config.num_agents);
        for i in 0..config.num_agents {
            let pair = car_marker(CAR_START, i).zip(car_marker(CAR_DEST, i));
            match pair {
                Some((s, d))
                    if !grid.start_positions(s).is_empty()
                        && !grid.start_positions(d).is_empty() =>
                {
                    markers.push((s, d));
                }
                _ => {
                    return Err(ConfigError::invalid(
                        "num_agents",
                        format!("layout {} has no start or destination for car {i}", named.name),
                    ))
                }
            }
        }

        let mut dest_dists = IndexMap::new();
        for &(_, d) in &markers {
            for &c in grid.start_positions(d) {
                dest_dists.entry(c).or_insert_with(|| grid.bfs_distances(c));
            }
        }

        let obs_space = observation_space(&config, &grid);
        Ok(Self {
            horizon: named.max_episode_steps,
            markers,
            dest_dists,
            resolver: CollisionResolver::new(config.rules())?,
            agents: agent_ids(config.num_agents),
            actions: Discrete::new(TURN_LEFT + 1),
            obs_space,
            grid,
            config,
        })
    }

    /// Number of cars `grid_name` has start and destination lists for.
    pub fn supported_num_agents(grid_name: &str) -> Result<usize, ConfigError> {
        let grid = layout::lookup(DRIVING, grid_name)?.grid()?;
        Ok((0..)
            .map_while(|i| car_marker(CAR_START, i).zip(car_marker(CAR_DEST, i)))
            .take_while(|&(s, d)| {
                !grid.start_positions(s).is_empty() && !grid.start_positions(d).is_empty()
            })
            .count())
    }

    /// The configuration in force.
    pub fn config(&self) -> &DrivingConfig {
        &self.config
    }

    /// The map.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Episode length the map was tuned for.
    pub fn default_max_episode_steps(&self) -> u64 {
        self.horizon
    }

    /// Path length from `from` to `dest` over unblocked cells.
    /// Unreachable and blocked cells count as infinitely far.
    pub fn dest_distance(&self, dest: Coord, from: Coord) -> u32 {
        self.grid
            .index(from)
            .and_then(|i| self.dest_dists.get(&dest).and_then(|d| d[i]))
            .unwrap_or(u32::MAX)
    }

    /// A fresh car `i` on a start cell outside `taken`.
    fn spawn(
        &self,
        i: usize,
        taken: &HashSet<Coord>,
        rng: &mut SimRng,
    ) -> Result<Vehicle, NoFreeCellError> {
        let (start, dest) = self.markers[i];
        let coord = self.grid.sample_start_coord(start, taken, rng)?;
        let dests: Vec<Coord> = self
            .grid
            .start_positions(dest)
            .iter()
            .copied()
            .filter(|&c| c != coord)
            .collect();
        if dests.is_empty() {
            return Err(NoFreeCellError {
                excluded: 1,
                free_cells: self.grid.start_positions(dest).len(),
            });
        }
        let dest = dests[rng.random_range(0..dests.len())];
        let heading = Direction::CARDINAL[rng.random_range(0..Direction::CARDINAL.len())];
        Ok(Vehicle {
            coord,
            heading,
            speed: Speed::Stopped,
            dest,
            dest_reached: false,
            crashed: false,
            min_dest_dist: self.dest_distance(dest, coord),
        })
    }

    /// Heading-relative cell codes around car `i`, front row first, left
    /// column first.
    fn local_view(&self, state: &DrivingState, i: usize) -> Vec<i32> {
        let me = &state.vehicles[i];
        let (front, back, side) = self.config.obs_dim;
        let (front, back, side) = (front as i32, back as i32, side as i32);
        let (fx, fy) = me.heading.delta();
        let (rx, ry) = turn_right(me.heading).delta();
        let mut cells = Vec::with_capacity(((front + back + 1) * (2 * side + 1)) as usize);
        for ahead in (-back..=front).rev() {
            for lateral in -side..=side {
                let c = Coord::new(
                    me.coord.x + ahead * fx + lateral * rx,
                    me.coord.y + ahead * fy + lateral * ry,
                );
                let other_car = state
                    .vehicles
                    .iter()
                    .enumerate()
                    .any(|(j, v)| j != i && v.coord == c);
                let code = if !self.grid.contains(c) {
                    CELL_WALL
                } else if other_car {
                    CELL_VEHICLE
                } else if self.grid.is_blocked(c) {
                    CELL_WALL
                } else if c == me.dest {
                    CELL_DESTINATION
                } else {
                    CELL_EMPTY
                };
                cells.push(code);
            }
        }
        cells
    }

    fn observe(&self, state: &DrivingState) -> JointObservation<Observation> {
        self.agents
            .iter()
            .enumerate()
            .map(|(i, &agent)| {
                let me = &state.vehicles[i];
                let mut obs = self.local_view(state, i);
                obs.extend_from_slice(&[
                    me.speed.index() as i32,
                    me.dest.x,
                    me.dest.y,
                    i32::from(me.dest_reached),
                    i32::from(me.crashed),
                ]);
                (agent, Observation::Vector(obs))
            })
            .collect()
    }

    /// Mark `v` crashed unless it is already done.
    fn crash(v: &mut Vehicle) {
        if !v.is_done() {
            v.crashed = true;
            v.speed = Speed::Stopped;
        }
    }
}

fn observation_space(config: &DrivingConfig, grid: &Grid) -> ObservationSpace {
    let (front, back, side) = config.obs_dim;
    let cells = ((front + back + 1) * (2 * side + 1)) as usize;
    let mut low = vec![CELL_VEHICLE; cells];
    let mut high = vec![CELL_DESTINATION; cells];
    low.extend_from_slice(&[0, 0, 0, 0, 0]);
    high.extend_from_slice(&[
        Speed::Fast.index() as i32,
        grid.width() as i32 - 1,
        grid.height() as i32 - 1,
        1,
        1,
    ]);
    ObservationSpace::new(ObservationMode::Vector, vec![low.len()], low, high)
}

impl PosgModel for Driving {
    type State = DrivingState;
    type Action = usize;
    type Obs = Observation;

    fn possible_agents(&self) -> &[AgentId] {
        &self.agents
    }

    fn action_space(&self, _agent: AgentId) -> &dyn Space<usize> {
        &self.actions
    }

    fn observation_space(&self, _agent: AgentId) -> &dyn Space<Observation> {
        &self.obs_space
    }

    fn reward_range(&self, _agent: AgentId) -> RewardRange {
        RewardRange::new(R_CRASH, R_DESTINATION + R_PROGRESS)
    }

    fn sample_initial_state(&self, rng: &mut SimRng) -> Result<DrivingState, EnvError> {
        let mut taken = HashSet::new();
        let mut vehicles = Vec::with_capacity(self.agents.len());
        for i in 0..self.agents.len() {
            let v = self.spawn(i, &taken, rng)?;
            taken.insert(v.coord);
            vehicles.push(v);
        }
        Ok(DrivingState { vehicles })
    }

    fn sample_initial_obs(&self, state: &DrivingState) -> JointObservation<Observation> {
        self.observe(state)
    }

    fn step(
        &self,
        state: &DrivingState,
        actions: &JointAction<usize>,
        rng: &mut SimRng,
    ) -> Result<JointTimestep<DrivingState, Observation>, EnvError> {
        self.validate_actions(state, actions)?;
        let n = self.agents.len();
        let mut chosen: Vec<usize> = self.agents.iter().map(|a| actions[a]).collect();
        self.resolver
            .perturb_actions(&mut chosen, self.actions.n(), rng);

        let mut vehicles = state.vehicles.clone();
        if self.config.infinite_horizon {
            let mut taken: HashSet<Coord> = vehicles.iter().map(|v| v.coord).collect();
            for i in 0..n {
                if !vehicles[i].is_done() {
                    continue;
                }
                taken.remove(&vehicles[i].coord);
                match self.spawn(i, &taken, rng) {
                    Ok(v) => vehicles[i] = v,
                    Err(e) => tracing::trace!(car = i, %e, "respawn deferred"),
                }
                taken.insert(vehicles[i].coord);
            }
        }
        let was_done: Vec<bool> = vehicles.iter().map(Vehicle::is_done).collect();

        for (v, &a) in vehicles.iter_mut().zip(&chosen) {
            if v.is_done() {
                continue;
            }
            match a {
                ACCELERATE => v.speed = v.speed.accelerate(),
                DECELERATE => v.speed = v.speed.decelerate(),
                TURN_RIGHT => v.heading = turn_right(v.heading),
                TURN_LEFT => v.heading = turn_left(v.heading),
                _ => {}
            }
        }

        let ticks = vehicles.iter().map(|v| v.speed.cells()).max().unwrap_or(0);
        for tick in 0..ticks {
            let current: Vec<Coord> = vehicles.iter().map(|v| v.coord).collect();
            let dirs: Vec<Direction> = vehicles
                .iter()
                .map(|v| {
                    if v.is_done() || v.speed.cells() <= tick {
                        Direction::None
                    } else {
                        v.travel_direction()
                    }
                })
                .collect();
            let res = self.resolver.resolve(&self.grid, &current, &dirs);
            for i in 0..n {
                match res.outcomes[i] {
                    MoveOutcome::Obstacle => Self::crash(&mut vehicles[i]),
                    MoveOutcome::AgentCollision | MoveOutcome::Swap => {
                        let target = self.grid.neighbor(current[i], dirs[i]);
                        Self::crash(&mut vehicles[i]);
                        for j in (0..n).filter(|&j| j != i && res.positions[j] == target) {
                            Self::crash(&mut vehicles[j]);
                        }
                    }
                    MoveOutcome::OutOfBounds => vehicles[i].speed = Speed::Stopped,
                    MoveOutcome::Moved | MoveOutcome::Stayed => {}
                }
            }
            for (v, &pos) in vehicles.iter_mut().zip(&res.positions) {
                v.coord = pos;
                if !v.is_done() && pos == v.dest {
                    v.dest_reached = true;
                    v.speed = Speed::Stopped;
                }
            }
        }

        let mut rewards = JointReward::new();
        let mut info = IndexMap::new();
        for (i, &agent) in self.agents.iter().enumerate() {
            let v = &mut vehicles[i];
            let mut r = 0.0;
            if !was_done[i] {
                let dist = self.dest_distance(v.dest, v.coord);
                if !v.crashed && dist < v.min_dest_dist {
                    v.min_dest_dist = dist;
                    r += R_PROGRESS;
                }
                if v.crashed {
                    r = R_CRASH;
                    info.insert(agent, AgentInfo { outcome: Some(Outcome::Loss) });
                } else if v.dest_reached {
                    r += R_DESTINATION;
                    info.insert(agent, AgentInfo { outcome: Some(Outcome::Win) });
                }
                if v.is_done() {
                    tracing::trace!(car = i, crashed = v.crashed, at = %v.coord, "car done");
                }
            }
            rewards.insert(agent, r);
        }

        let (terminated, all_done) = if self.config.infinite_horizon {
            (flags(&self.agents, false), false)
        } else {
            let t: IndexMap<AgentId, bool> = self
                .agents
                .iter()
                .zip(&vehicles)
                .map(|(&a, v)| (a, v.is_done()))
                .collect();
            let all = t.values().all(|&d| d);
            (t, all)
        };
        let next = DrivingState { vehicles };
        Ok(JointTimestep {
            observations: self.observe(&next),
            state: next,
            rewards,
            terminated,
            truncated: flags(&self.agents, false),
            all_done,
            info,
        })
    }

    fn render_ansi(&self, state: &DrivingState) -> Option<String> {
        let mut overlay: Vec<(Coord, char)> = state
            .vehicles
            .iter()
            .zip(&self.markers)
            .filter(|(v, _)| !v.is_done())
            .map(|(v, &(_, d))| (v.dest, d))
            .collect();
        overlay.extend(state.vehicles.iter().map(|v| {
            let ch = match (v.crashed, v.heading) {
                (true, _) => 'X',
                (false, Direction::North) => '^',
                (false, Direction::South) => 'v',
                (false, Direction::East) => '>',
                (false, Direction::West) => '<',
                (false, Direction::None) => 'o',
            };
            (v.coord, ch)
        }));
        Some(self.grid.render(&overlay))
    }
}
