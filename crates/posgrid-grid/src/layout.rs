//! Named maps used by the bundled games.
//!
//! Each family is a static table of [`NamedLayout`]s. A game selects its
//! map by `grid_name` through [`lookup`], which reports unknown names as
//! [`ConfigError::UnknownGrid`].

use posgrid_core::ConfigError;

use crate::error::GridError;
use crate::grid::Grid;

/// An ASCII map plus the episode length it was tuned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NamedLayout {
    /// Name used in configs and registry ids, e.g. `"7x7"`.
    pub name: &'static str,
    /// Map in [`Grid::from_layout`] syntax.
    pub ascii: &'static str,
    /// Default truncation horizon for finite episodes.
    pub max_episode_steps: u64,
}

impl NamedLayout {
    /// Parse the map.
    pub fn grid(&self) -> Result<Grid, GridError> {
        Grid::from_layout(self.ascii)
    }
}

/// Find `name` in `family`.
pub fn lookup<'a>(family: &'a [NamedLayout], name: &str) -> Result<&'a NamedLayout, ConfigError> {
    family
        .iter()
        .find(|l| l.name == name)
        .ok_or_else(|| ConfigError::UnknownGrid {
            name: name.to_string(),
        })
}

/// Start-list marker for the runner in TwoPaths maps.
pub const RUNNER_START: char = 'R';
/// Start-list marker for the chaser in TwoPaths maps.
pub const CHASER_START: char = 'C';
/// Goal cells, in TwoPaths and PursuitEvasion maps.
pub const GOAL: char = 'G';
/// Start-list marker for the evader in PursuitEvasion maps.
pub const EVADER_START: char = 'E';
/// Start-list marker for the pursuer in PursuitEvasion maps.
pub const PURSUER_START: char = 'P';

/// TwoPaths maps: a runner must reach one of two goals along separate
/// corridors while a chaser guards them.
pub const TWO_PATHS: &[NamedLayout] = &[
    NamedLayout {
        name: "3x3",
        ascii: "
            GCG
            .#.
            .R.
        ",
        max_episode_steps: 20,
    },
    NamedLayout {
        name: "7x7",
        ascii: "
            G..C..G
            .#####.
            .#####.
            .#####.
            .#####.
            .#####.
            ...R...
        ",
        max_episode_steps: 40,
    },
];

/// PursuitEvasion maps.
pub const PURSUIT_EVASION: &[NamedLayout] = &[NamedLayout {
    name: "8x8",
    ascii: "
        G..#...G
        .#.#.#..
        .#...#.#
        ...#P...
        .#.#.##.
        .#......
        ...##.#.
        E......E
    ",
    max_episode_steps: 100,
}];

/// Start-list marker of the first car in Driving maps; car `i` uses the
/// `i`-th letter from here.
pub const CAR_START: char = 'a';
/// Destination marker of the first car in Driving maps; car `i` uses the
/// `i`-th digit from here.
pub const CAR_DEST: char = '0';

/// Marker of car `i`'s start list, offset from `base`.
pub fn car_marker(base: char, i: usize) -> Option<char> {
    u32::try_from(i)
        .ok()
        .and_then(|i| char::from_u32(base as u32 + i))
}

/// Driving maps: a road network between blocks, with one start list and
/// one destination list per car.
pub const DRIVING: &[NamedLayout] = &[
    NamedLayout {
        name: "3x3",
        ascii: "
            a.1
            .#.
            0.b
        ",
        max_episode_steps: 15,
    },
    NamedLayout {
        name: "7x7",
        ascii: "
            aa.2.bb
            .#.#.#.
            1.....3
            .#.#.#.
            3.....1
            .#.#.#.
            dd.0.cc
        ",
        max_episode_steps: 50,
    },
];

/// PredatorPrey maps. Entities are placed anywhere free.
pub const PREDATOR_PREY: &[NamedLayout] = &[
    NamedLayout {
        name: "5x5",
        ascii: "
            .....
            .....
            .....
            .....
            .....
        ",
        max_episode_steps: 25,
    },
    NamedLayout {
        name: "10x10",
        ascii: "
            ..........
            ..........
            ..##..##..
            ..##..##..
            ..........
            ..........
            ..##..##..
            ..##..##..
            ..........
            ..........
        ",
        max_episode_steps: 50,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layout_parses_and_is_connected() {
        for layout in TWO_PATHS
            .iter()
            .chain(PURSUIT_EVASION)
            .chain(PREDATOR_PREY)
            .chain(DRIVING)
        {
            let grid = layout.grid().unwrap();
            let name = layout.name;
            assert_eq!(name, format!("{}x{}", grid.width(), grid.height()));
            let free = grid.free_coords();
            let dist = grid.bfs_distances(free[0]);
            for c in free {
                assert!(dist[grid.index(c).unwrap()].is_some(), "{name}: {c} unreachable");
            }
        }
    }

    #[test]
    fn two_paths_markers() {
        let grid = lookup(TWO_PATHS, "7x7").unwrap().grid().unwrap();
        assert_eq!(grid.start_positions(GOAL).len(), 2);
        assert_eq!(grid.start_positions(RUNNER_START).len(), 1);
        assert_eq!(grid.start_positions(CHASER_START).len(), 1);
    }

    #[test]
    fn pursuit_evasion_markers() {
        let grid = lookup(PURSUIT_EVASION, "8x8").unwrap().grid().unwrap();
        assert_eq!(grid.start_positions(EVADER_START).len(), 2);
        assert_eq!(grid.start_positions(GOAL).len(), 2);
        assert_eq!(grid.start_positions(PURSUER_START).len(), 1);
    }

    #[test]
    fn driving_maps_pair_starts_with_destinations() {
        for layout in DRIVING {
            let grid = layout.grid().unwrap();
            let cars = (0..)
                .map_while(|i| car_marker(CAR_START, i))
                .take_while(|&m| !grid.start_positions(m).is_empty())
                .count();
            assert!(cars >= 2, "{}", layout.name);
            for i in 0..cars {
                let dest = car_marker(CAR_DEST, i).unwrap();
                assert!(!grid.start_positions(dest).is_empty(), "{}: car {i}", layout.name);
            }
        }
        assert_eq!(car_marker(CAR_START, 3), Some('d'));
    }

    #[test]
    fn unknown_name_is_config_error() {
        assert_eq!(
            lookup(TWO_PATHS, "9x9").unwrap_err(),
            ConfigError::UnknownGrid { name: "9x9".into() }
        );
    }
}
