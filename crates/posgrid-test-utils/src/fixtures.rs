//! Reusable grid fixtures.

use posgrid_grid::Grid;

/// An open `width x height` grid with no blocked cells.
pub fn open_grid(width: u32, height: u32) -> Grid {
    Grid::open(width, height).expect("fixture dimensions are valid")
}

/// A one-row corridor with walls at both ends:
///
/// ```text
/// #.....#
/// ```
pub fn corridor_grid() -> Grid {
    Grid::from_layout("#.....#").expect("corridor layout is valid")
}

/// A 5x5 ring around a blocked 3x3 centre, with start lists `A` and `B`
/// on opposite corners.
///
/// ```text
/// A....
/// .###.
/// .###.
/// .###.
/// ....B
/// ```
pub fn ring_grid() -> Grid {
    Grid::from_layout(
        "
        A....
        .###.
        .###.
        .###.
        ....B
        ",
    )
    .expect("ring layout is valid")
}
