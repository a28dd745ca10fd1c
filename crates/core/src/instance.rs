//! Draws one concrete realization of the fragile edges.

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

use crate::error::NavResult;
use crate::grid::Grid;
use crate::world::MapDescription;

/// Blocks each fragile edge independently with its probability.
///
/// Blocked edges become always-blocked; open ones stay registered as fragile so the
/// planner's belief positions still line up. The same seed always yields the same instance.
pub fn resolve_instance(description: &MapDescription, seed: u64) -> NavResult<MapDescription> {
    let mut grid = Grid::new(description.rows, description.cols, description.edges.clone())?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for edge in grid.fragile_edges() {
        let blocked = unit_roll(&mut rng) < edge.probability;
        log::debug!("instance {seed}: edge {} {}", edge.identifier, if blocked { "blocked" } else { "open" });
        if blocked {
            grid.block_fragile_edge(edge.from, edge.to)?;
        }
    }
    Ok(MapDescription { edges: grid.special_edges().to_vec(), ..description.clone() })
}

/// Uniform in `[0, 1)` from the top 53 bits.
fn unit_roll(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}
