//! Per-tick decision making against the solved utility tables.

use crate::belief::{BeliefVector, EdgeBelief};
use crate::engine::ValueIteration;
use crate::error::{NavError, NavResult};
use crate::grid::Grid;
use crate::types::{Action, EdgeKind, Pos};
use crate::utility::Utility;
use crate::world::World;

#[derive(Clone, Debug, PartialEq)]
pub struct StepDecision {
    /// `None` when no route to the goal exists under the narrowed belief.
    pub action: Option<Action>,
    pub belief: BeliefVector,
    pub value: Utility,
}

/// Stateless: the caller carries the running belief between ticks.
#[derive(Clone, Copy)]
pub struct StepController<'a> {
    engine: &'a ValueIteration,
}

impl<'a> StepController<'a> {
    pub fn new(engine: &'a ValueIteration) -> Self {
        Self { engine }
    }

    pub fn initial_belief(&self) -> BeliefVector {
        BeliefVector::unknown(self.engine.fragile_edges().len())
    }

    /// Resolves every unknown fragile edge touching `location` from the live grid.
    /// Already resolved symbols are kept as they are.
    pub fn observe(&self, grid: &Grid, location: Pos, belief: &BeliefVector) -> NavResult<BeliefVector> {
        self.engine.space().check(belief)?;
        if !belief.is_concrete() {
            return Err(NavError::InvariantViolation(format!(
                "running belief {belief} contains wildcards"
            )));
        }
        let mut narrowed = belief.clone();
        for (idx, edge) in self.engine.fragile_edges().iter().enumerate() {
            if !edge.touches(location) || narrowed[idx] != EdgeBelief::Unknown {
                continue;
            }
            let (kind, _) = grid.edge_type_and_cost(edge.from, edge.to)?;
            let symbol = EdgeBelief::from_blocked(kind == EdgeKind::AlwaysBlocked);
            log::debug!("observed edge {} as {}", edge.identifier, symbol.symbol());
            narrowed.set(idx, symbol);
        }
        Ok(narrowed)
    }

    pub fn next_action(&self, world: &World, belief: &BeliefVector) -> NavResult<StepDecision> {
        let location = world.agent().location;
        let belief = self.observe(world.grid(), location, belief)?;
        let entry = self.engine.best_action(location, &belief)?;
        if entry.action.is_none() {
            log::warn!("no action exists at {location} under belief {belief}");
        }
        Ok(StepDecision { action: entry.action, belief, value: entry.value })
    }
}
