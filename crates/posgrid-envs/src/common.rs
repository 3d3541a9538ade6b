//! Helpers shared by the grid games.

use std::collections::HashSet;

use posgrid_core::{AgentFlags, AgentId, Coord, Direction, EnvError, Outcome, SimRng};
use posgrid_grid::Grid;

/// The same flag for every agent.
pub(crate) fn flags(agents: &[AgentId], value: bool) -> AgentFlags {
    agents.iter().map(|&a| (a, value)).collect()
}

/// `n` consecutive agent ids starting at 0.
pub(crate) fn agent_ids(n: usize) -> Vec<AgentId> {
    (0..n as u32).map(AgentId).collect()
}

/// Movement direction of a [`Direction`]-numbered action. Indices past
/// the movement range do not move.
pub(crate) fn direction_of(action: usize) -> Direction {
    Direction::from_index(action).unwrap_or(Direction::None)
}

/// Sample `n` distinct free cells, avoiding `taken` and recording each
/// pick in it.
pub(crate) fn place_free(
    grid: &Grid,
    n: usize,
    taken: &mut HashSet<Coord>,
    rng: &mut SimRng,
) -> Result<Vec<Coord>, EnvError> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let c = grid.sample_free_coord(taken, rng)?;
        taken.insert(c);
        out.push(c);
    }
    Ok(out)
}

/// Whether two movers caught each other this tick: they share a cell or
/// traded cells.
pub(crate) fn met(a_prev: Coord, a: Coord, b_prev: Coord, b: Coord) -> bool {
    a == b || (a == b_prev && b == a_prev)
}

/// The other side's view of a two-player result.
pub(crate) fn mirror(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Win => Outcome::Loss,
        Outcome::Loss => Outcome::Win,
        Outcome::Draw => Outcome::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_covers_shared_cell_and_swap() {
        let (a, b) = (Coord::new(0, 0), Coord::new(1, 0));
        assert!(met(a, b, b, b));
        assert!(met(a, b, b, a));
        assert!(!met(a, a, b, b));
    }

    #[test]
    fn unknown_actions_do_not_move() {
        assert_eq!(direction_of(2), Direction::East);
        assert_eq!(direction_of(5), Direction::None);
    }
}
