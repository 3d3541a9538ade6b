//! Simultaneous movement with collision resolution.
//!
//! All agents move in the same tick, so applying moves one at a time
//! would let the outcome depend on agent order. [`CollisionResolver`]
//! instead computes every candidate cell first and then rejects
//! conflicting moves symmetrically: a rejected agent stays where it is.
//!
//! Resolution order:
//! 1. Candidate = current cell shifted by the agent's direction.
//!    Out-of-bounds candidates, and blocked ones when
//!    [`MovementRules::obstacle_collisions`] is set, are replaced by the
//!    current cell.
//! 2. If [`MovementRules::block_swaps`] is set, two movers whose
//!    candidates are each other's current cells both stay.
//! 3. If [`MovementRules::agent_collisions`] is set, every mover whose
//!    candidate is claimed by anyone else stays.
//! 4. Steps 2 and 3 repeat until nothing changes, since each rejection
//!    turns a mover into a claimant of its own cell.
//!
//! Action noise ([`perturb_action`]) runs before any of this, on the raw
//! action indices, so games with extra non-movement actions share it.

use std::collections::HashMap;

use posgrid_core::{ConfigError, Coord, Direction, SimRng};
use rand::Rng;

use crate::grid::Grid;

/// Per-game movement semantics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementRules {
    /// Probability that an agent's chosen action is executed. Otherwise a
    /// different action is substituted uniformly at random.
    pub action_probs: f64,
    /// Blocked cells stop movement. When `false`, agents may walk onto
    /// blocked cells.
    pub obstacle_collisions: bool,
    /// Two agents may not end the tick on the same cell.
    pub agent_collisions: bool,
    /// Two agents may not trade cells in one tick.
    pub block_swaps: bool,
}

impl Default for MovementRules {
    fn default() -> Self {
        Self {
            action_probs: 1.0,
            obstacle_collisions: true,
            agent_collisions: true,
            block_swaps: true,
        }
    }
}

impl MovementRules {
    /// Check that `action_probs` is a probability.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.action_probs) {
            return Err(ConfigError::invalid(
                "action_probs",
                format!("must be in [0, 1], got {}", self.action_probs),
            ));
        }
        Ok(())
    }
}

/// Apply action noise to one agent's chosen action.
///
/// Draws one `f64`; with probability `1 - action_probs` draws again to
/// pick uniformly among the `n_actions - 1` other actions. With a single
/// action there is nothing to substitute.
pub fn perturb_action(
    chosen: usize,
    n_actions: usize,
    action_probs: f64,
    rng: &mut SimRng,
) -> usize {
    let draw: f64 = rng.random();
    if draw < action_probs || n_actions <= 1 {
        return chosen;
    }
    let k = rng.random_range(0..n_actions - 1);
    if k >= chosen {
        k + 1
    } else {
        k
    }
}

/// What happened to one agent's move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    /// The agent entered its candidate cell.
    Moved,
    /// The agent chose not to move.
    Stayed,
    /// The candidate cell was off the grid.
    OutOfBounds,
    /// The candidate cell was blocked.
    Obstacle,
    /// Another agent claimed the same cell.
    AgentCollision,
    /// The agent tried to trade cells with another agent.
    Swap,
}

impl MoveOutcome {
    /// Whether the agent wanted to move but was held in place.
    pub fn is_rejected(self) -> bool {
        !matches!(self, Self::Moved | Self::Stayed)
    }
}

/// Result of [`CollisionResolver::resolve`], indexed like the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Next position of every agent.
    pub positions: Vec<Coord>,
    /// Why each agent ended where it did.
    pub outcomes: Vec<MoveOutcome>,
}

/// Resolves simultaneous moves under a fixed set of [`MovementRules`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionResolver {
    rules: MovementRules,
}

impl CollisionResolver {
    /// Create a resolver after validating `rules`.
    pub fn new(rules: MovementRules) -> Result<Self, ConfigError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    /// The movement rules in force.
    pub fn rules(&self) -> &MovementRules {
        &self.rules
    }

    /// Apply action noise to each action in agent order.
    pub fn perturb_actions(&self, actions: &mut [usize], n_actions: usize, rng: &mut SimRng) {
        for action in actions.iter_mut() {
            let executed = perturb_action(*action, n_actions, self.rules.action_probs, rng);
            if executed != *action {
                tracing::trace!(chosen = *action, executed, "action perturbed");
            }
            *action = executed;
        }
    }

    /// Resolve one tick of movement. Never fails: every conflict ends
    /// with the affected agents staying in place.
    ///
    /// # Panics
    ///
    /// Panics if `current` and `directions` differ in length.
    pub fn resolve(&self, grid: &Grid, current: &[Coord], directions: &[Direction]) -> Resolution {
        assert_eq!(
            current.len(),
            directions.len(),
            "one direction per agent required"
        );
        let n = current.len();
        let mut positions = Vec::with_capacity(n);
        let mut outcomes = Vec::with_capacity(n);
        for (&cur, &dir) in current.iter().zip(directions) {
            let (pos, outcome) = self.candidate(grid, cur, dir);
            positions.push(pos);
            outcomes.push(outcome);
        }

        // Each pass reverts at least one mover, so n + 1 passes suffice.
        for _ in 0..=n {
            let mut changed = false;
            if self.rules.block_swaps {
                changed |= reject_swaps(current, &mut positions, &mut outcomes);
            }
            if self.rules.agent_collisions {
                changed |= reject_shared_cells(current, &mut positions, &mut outcomes);
            }
            if !changed {
                break;
            }
        }

        for (i, outcome) in outcomes.iter().enumerate() {
            if matches!(outcome, MoveOutcome::AgentCollision | MoveOutcome::Swap) {
                tracing::trace!(agent = i, ?outcome, at = %current[i], "move rejected");
            }
        }
        Resolution {
            positions,
            outcomes,
        }
    }

    fn candidate(&self, grid: &Grid, cur: Coord, dir: Direction) -> (Coord, MoveOutcome) {
        if dir == Direction::None {
            return (cur, MoveOutcome::Stayed);
        }
        let next = grid.neighbor(cur, dir);
        if !grid.contains(next) {
            (cur, MoveOutcome::OutOfBounds)
        } else if self.rules.obstacle_collisions && grid.is_blocked(next) {
            (cur, MoveOutcome::Obstacle)
        } else {
            (next, MoveOutcome::Moved)
        }
    }
}

fn reject_swaps(current: &[Coord], positions: &mut [Coord], outcomes: &mut [MoveOutcome]) -> bool {
    let mut changed = false;
    for i in 0..current.len() {
        for j in (i + 1)..current.len() {
            let swapping = outcomes[i] == MoveOutcome::Moved
                && outcomes[j] == MoveOutcome::Moved
                && positions[i] == current[j]
                && positions[j] == current[i];
            if swapping {
                positions[i] = current[i];
                positions[j] = current[j];
                outcomes[i] = MoveOutcome::Swap;
                outcomes[j] = MoveOutcome::Swap;
                changed = true;
            }
        }
    }
    changed
}

fn reject_shared_cells(
    current: &[Coord],
    positions: &mut [Coord],
    outcomes: &mut [MoveOutcome],
) -> bool {
    let mut claims: HashMap<Coord, u32> = HashMap::with_capacity(positions.len());
    for &p in positions.iter() {
        *claims.entry(p).or_insert(0) += 1;
    }
    let mut changed = false;
    for i in 0..positions.len() {
        if outcomes[i] == MoveOutcome::Moved && claims[&positions[i]] > 1 {
            positions[i] = current[i];
            outcomes[i] = MoveOutcome::AgentCollision;
            changed = true;
        }
    }
    changed
}
