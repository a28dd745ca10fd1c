//! Shared grid and map fixtures for the unit test suites.

use crate::belief::BeliefVector;
use crate::engine::ValueIteration;
use crate::grid::Grid;
use crate::types::{Pos, SpecialEdge};
use crate::world::{MapDescription, PackageSpec};

/// 1x3: (0,0) - (0,1) - (0,2).
pub(crate) fn open_corridor() -> Grid {
    Grid::new(1, 3, Vec::new()).unwrap()
}

pub(crate) fn blocked_corridor() -> Grid {
    Grid::new(1, 3, vec![SpecialEdge::always_blocked(Pos::new(0, 1), Pos::new(0, 2))]).unwrap()
}

/// Corridor whose last edge is fragile; no way around it.
pub(crate) fn fragile_corridor(probability: f64) -> Grid {
    Grid::new(1, 3, vec![SpecialEdge::fragile(Pos::new(0, 1), Pos::new(0, 2), probability)])
        .unwrap()
}

/// 2x3 with fragile (0,1)-(0,2); blocked, the detour runs along row 1.
pub(crate) fn fragile_detour(probability: f64) -> Grid {
    Grid::new(2, 3, vec![SpecialEdge::fragile(Pos::new(0, 1), Pos::new(0, 2), probability)])
        .unwrap()
}

/// 2x2 where both exits of (0,0) are fragile.
pub(crate) fn two_fragile_exits() -> Grid {
    Grid::new(
        2,
        2,
        vec![
            SpecialEdge::fragile(Pos::new(0, 0), Pos::new(0, 1), 0.5),
            SpecialEdge::fragile(Pos::new(0, 0), Pos::new(1, 0), 0.5),
        ],
    )
    .unwrap()
}

pub(crate) fn solved_engine(grid: &Grid, start: Pos, goal: Pos) -> ValueIteration {
    ValueIteration::solved(grid, start, goal).unwrap()
}

pub(crate) fn belief(symbols: &str) -> BeliefVector {
    BeliefVector::parse(symbols).unwrap()
}

/// Package from (0,0) to (0,2) on a 1x3 grid, agent on the pickup.
pub(crate) fn corridor_map(edges: Vec<SpecialEdge>) -> MapDescription {
    MapDescription {
        rows: 1,
        cols: 3,
        packages: vec![PackageSpec {
            pickup: Pos::new(0, 0),
            appears_at: 0,
            deliver_to: Pos::new(0, 2),
            deadline: 50,
        }],
        edges,
        agents: vec![Pos::new(0, 0)],
    }
}

/// Same package route as [`corridor_map`] on the 2x3 detour grid.
pub(crate) fn detour_map(probability: f64) -> MapDescription {
    MapDescription {
        rows: 2,
        edges: vec![SpecialEdge::fragile(Pos::new(0, 1), Pos::new(0, 2), probability)],
        ..corridor_map(Vec::new())
    }
}
