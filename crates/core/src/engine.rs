//! Belief-state value iteration over (vertex x belief vector).
//! This module exists to fill every per-vertex utility table with the best expected
//! reward-to-goal and the action achieving it.
//! It does not own live simulation state; it plans on a frozen grid snapshot.

use std::sync::Arc;

use serde::Serialize;

use crate::belief::{BeliefSpace, BeliefVector, EdgeBelief};
use crate::error::{NavError, NavResult};
use crate::grid::Grid;
use crate::types::{Action, Direction, EdgeKind, FragileEdge, Pos};
use crate::utility::{StateUtility, Utility, UtilityEntry};
use crate::world::World;

/// Upper bound on fragile edges; the table holds `3^k` entries per vertex.
pub const MAX_FRAGILE_EDGES: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub combinations: usize,
    pub passes: usize,
    pub updates: usize,
}

pub struct ValueIteration {
    grid: Grid,
    start: Pos,
    goal: Pos,
    fragile: Vec<FragileEdge>,
    space: Arc<BeliefSpace>,
    tables: Vec<StateUtility>,
    solved: bool,
}

impl ValueIteration {
    /// Seeds the tables; the grid is copied with agent occupancy erased.
    pub fn new(grid: &Grid, start: Pos, goal: Pos) -> NavResult<Self> {
        let grid = grid.without_occupants();
        grid.coords_to_index(start)?;
        let goal_index = grid.coords_to_index(goal)?;
        let fragile = grid.fragile_edges();
        if fragile.len() > MAX_FRAGILE_EDGES {
            return Err(NavError::Validation(format!(
                "{} fragile edges exceed the supported maximum of {MAX_FRAGILE_EDGES}",
                fragile.len()
            )));
        }

        let space = Arc::new(BeliefSpace::new(fragile.len()));
        let mut tables: Vec<StateUtility> =
            grid.positions().map(|pos| StateUtility::new(pos, Arc::clone(&space))).collect();
        tables[goal_index].update(
            &BeliefVector::filled(fragile.len(), EdgeBelief::Any),
            Utility::GOAL,
            Some(Action::NoOp),
        )?;

        Ok(Self { grid, start, goal, fragile, space, tables, solved: false })
    }

    /// Plans from the package pickup to its delivery location.
    pub fn for_world(world: &World) -> NavResult<Self> {
        let package = world.package();
        Self::new(world.grid(), package.pickup, package.deliver_to)
    }

    pub fn solved(grid: &Grid, start: Pos, goal: Pos) -> NavResult<Self> {
        let mut engine = Self::new(grid, start, goal)?;
        engine.solve()?;
        Ok(engine)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goal(&self) -> Pos {
        self.goal
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Plans read from the tables are only meaningful once `solve` has run.
    pub fn ensure_solved(&self) -> NavResult<()> {
        if self.solved {
            return Ok(());
        }
        Err(NavError::InvariantViolation(
            "utility tables were queried for a plan before value iteration ran".to_string(),
        ))
    }

    pub fn space(&self) -> &BeliefSpace {
        &self.space
    }

    pub fn fragile_edges(&self) -> &[FragileEdge] {
        &self.fragile
    }

    pub fn fragile_index(&self, a: Pos, b: Pos) -> Option<usize> {
        self.fragile.iter().position(|edge| edge.connects(a, b))
    }

    pub fn tables(&self) -> &[StateUtility] {
        &self.tables
    }

    pub fn table(&self, pos: Pos) -> NavResult<&StateUtility> {
        Ok(&self.tables[self.grid.coords_to_index(pos)?])
    }

    pub fn value(&self, pos: Pos, belief: &BeliefVector) -> NavResult<Utility> {
        self.table(pos)?.value(belief)
    }

    /// Stored optimal action; fails on an engine that has not been solved.
    pub fn best_action(&self, pos: Pos, belief: &BeliefVector) -> NavResult<UtilityEntry> {
        self.ensure_solved()?;
        self.table(pos)?.lookup(belief)
    }

    /// Solves every resolved combination, then combinations with unknowns in order of
    /// increasing unknown count so that their refinements are already final.
    pub fn solve(&mut self) -> NavResult<SolveStats> {
        log::info!(
            "solving {} vertices x {} beliefs ({} fragile edges), goal {}",
            self.tables.len(),
            self.space.len(),
            self.fragile.len(),
            self.goal
        );
        let space = Arc::clone(&self.space);
        let mut stats = SolveStats::default();
        for combination in space.solve_order() {
            let (passes, updates) = self.relax_to_fixed_point(combination)?;
            log::debug!("belief {combination} converged after {passes} passes ({updates} updates)");
            stats.combinations += 1;
            stats.passes += passes;
            stats.updates += updates;
        }
        self.solved = true;
        log::info!(
            "value iteration finished: {} combinations, {} passes, {} updates",
            stats.combinations,
            stats.passes,
            stats.updates
        );
        Ok(stats)
    }

    /// Repeats relaxation passes until one produces no update. Returns `(passes, updates)`.
    pub fn relax_to_fixed_point(&mut self, combination: &BeliefVector) -> NavResult<(usize, usize)> {
        let max_passes = self.tables.len() + 2;
        let mut passes = 0;
        let mut total = 0;
        loop {
            passes += 1;
            if passes > max_passes {
                return Err(NavError::InvariantViolation(format!(
                    "belief {combination} did not converge within {max_passes} passes"
                )));
            }
            let updates = self.relax_pass(combination)?;
            if updates == 0 {
                return Ok((passes, total));
            }
            total += updates;
        }
    }

    /// One scan over every vertex for a concrete `combination`; returns the update count.
    pub fn relax_pass(&mut self, combination: &BeliefVector) -> NavResult<usize> {
        self.space.check(combination)?;
        if !combination.is_concrete() {
            return Err(NavError::InvariantViolation(format!(
                "relaxation needs a stored belief, got {combination}"
            )));
        }
        let mut updates = 0;
        for index in 0..self.tables.len() {
            let from = self.tables[index].location();
            if from == self.goal {
                continue;
            }
            let mut candidates = Vec::with_capacity(4);
            for (direction, to) in self.grid.neighbors(from) {
                if let Some(value) = self.candidate(from, direction, to, combination)? {
                    candidates.push((value, direction));
                }
            }
            for (value, direction) in candidates {
                if self.tables[index].update(combination, value, Some(Action::Move(direction)))? {
                    updates += 1;
                }
            }
        }
        Ok(updates)
    }

    fn candidate(
        &self,
        from: Pos,
        direction: Direction,
        to: Pos,
        combination: &BeliefVector,
    ) -> NavResult<Option<Utility>> {
        let (kind, cost) = self.grid.edge_type_and_cost(from, to)?;
        match kind {
            EdgeKind::AlwaysBlocked => Ok(None),
            EdgeKind::Normal => Ok(Some(self.value(to, combination)?.after_step(cost))),
            EdgeKind::Fragile => {
                let idx = self.fragile_index(from, to).ok_or(NavError::EdgeNotFound { from, to })?;
                match combination[idx] {
                    EdgeBelief::Blocked => Ok(None),
                    EdgeBelief::Open => Ok(Some(self.value(to, combination)?.after_step(cost))),
                    EdgeBelief::Unknown => {
                        let if_open =
                            self.value(to, &combination.with(idx, EdgeBelief::Open))?.after_step(cost);
                        let if_blocked = self.best_alternative(
                            from,
                            direction,
                            &combination.with(idx, EdgeBelief::Blocked),
                        )?;
                        Ok(Some(Utility::mix(self.fragile[idx].probability, if_blocked, if_open)))
                    }
                    symbol @ (EdgeBelief::Any | EdgeBelief::Resolved) => {
                        Err(NavError::InvariantViolation(format!(
                            "wildcard `{}` in relaxation belief {combination}",
                            symbol.symbol()
                        )))
                    }
                }
            }
        }
    }

    /// Best one-step alternative from `from` that avoids `excluded`, read under `belief`.
    fn best_alternative(
        &self,
        from: Pos,
        excluded: Direction,
        belief: &BeliefVector,
    ) -> NavResult<Utility> {
        let mut best = Utility::Unreachable;
        for (direction, to) in self.grid.neighbors(from) {
            if direction == excluded {
                continue;
            }
            let (kind, cost) = self.grid.edge_type_and_cost(from, to)?;
            if kind == EdgeKind::Fragile {
                let idx =
                    self.fragile_index(from, to).ok_or(NavError::EdgeNotFound { from, to })?;
                if belief[idx] == EdgeBelief::Blocked {
                    continue;
                }
            }
            best = best.max(self.value(to, belief)?.after_step(cost));
        }
        Ok(best)
    }

    /// Every vertex and stored belief with its value and optimal action.
    pub fn belief_states_values(&self) -> String {
        let edges: Vec<&str> = self.fragile.iter().map(|edge| edge.identifier.as_str()).collect();
        let mut out = format!("Fragile edges (belief order): [{}]\n", edges.join(", "));
        for table in &self.tables {
            out.push_str(&format!("Location {}:\n", table.location()));
            for (belief, entry) in table.entries() {
                let action = entry.action.map_or_else(|| "none".to_string(), |a| a.to_string());
                let value = entry.value;
                out.push_str(&format!("  {belief}: value {value}, optimal action {action}\n"));
            }
        }
        out
    }
}
