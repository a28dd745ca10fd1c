//! Live simulation state: the grid, the single package and the single agent.
//! This module exists to validate parsed maps and to apply moves and clock ticks.
//! It does not own planning; the engine only reads its grid and package locations.

use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::error::{NavError, NavResult};
use crate::grid::Grid;
use crate::types::{Direction, Pos, SpecialEdge, SpecialKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub pickup: Pos,
    pub appears_at: u32,
    pub deliver_to: Pos,
    pub deadline: u32,
}

/// Parsed map contents before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDescription {
    pub rows: usize,
    pub cols: usize,
    pub packages: Vec<PackageSpec>,
    pub edges: Vec<SpecialEdge>,
    pub agents: Vec<Pos>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageStatus {
    Waiting,
    Placed,
    Picked,
    Delivered,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Package {
    pub pickup: Pos,
    pub appears_at: u32,
    pub deliver_to: Pos,
    pub deadline: u32,
    pub status: PackageStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub location: Pos,
    pub actions: u32,
    pub score: u32,
}

#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    package: Package,
    agent: Agent,
    time: u32,
}

impl World {
    pub fn new(description: &MapDescription) -> NavResult<Self> {
        let [spec] = description.packages.as_slice() else {
            return Err(NavError::Validation(format!(
                "exactly one package is required, found {}",
                description.packages.len()
            )));
        };
        let [agent_location] = description.agents.as_slice() else {
            return Err(NavError::Validation(format!(
                "exactly one agent is required, found {}",
                description.agents.len()
            )));
        };
        if spec.appears_at != 0 {
            return Err(NavError::Validation(format!(
                "the package must appear at time 0, not {}",
                spec.appears_at
            )));
        }
        if spec.pickup != *agent_location {
            return Err(NavError::Validation(format!(
                "the package at {} must be co-located with the agent at {agent_location}",
                spec.pickup
            )));
        }

        let mut grid = Grid::new(description.rows, description.cols, description.edges.clone())?;
        grid.coords_to_index(spec.pickup)?;
        grid.coords_to_index(spec.deliver_to)?;
        grid.set_occupied(vec![*agent_location]);

        let mut world = Self {
            grid,
            package: Package {
                pickup: spec.pickup,
                appears_at: spec.appears_at,
                deliver_to: spec.deliver_to,
                deadline: spec.deadline,
                status: PackageStatus::Waiting,
            },
            agent: Agent { location: *agent_location, actions: 0, score: 0 },
            time: 0,
        };
        world.refresh_package();
        world.collect_package();
        Ok(world)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    /// Moves the agent one step; the target edge must currently be traversable.
    /// Crossing a fragile edge never breaks it; blocking is decided up front by
    /// [`resolve_instance`](crate::instance::resolve_instance).
    pub fn step(&mut self, direction: Direction) -> NavResult<Direction> {
        let from = self.agent.location;
        let to = from.step(direction);
        if !self.grid.contains(to) || !self.grid.is_path_available(from, to)? {
            return Err(NavError::IllegalMove { from, direction });
        }
        self.agent.location = to;
        self.agent.actions += 1;
        self.grid.set_occupied(vec![to]);
        self.collect_package();
        Ok(direction)
    }

    pub fn advance_clock(&mut self) {
        self.time += 1;
        self.refresh_package();
    }

    /// No package is left waiting, placed or carried.
    pub fn is_finished(&self) -> bool {
        matches!(self.package.status, PackageStatus::Delivered | PackageStatus::Expired)
    }

    fn refresh_package(&mut self) {
        let package = &mut self.package;
        if package.status == PackageStatus::Waiting && package.appears_at <= self.time {
            package.status = PackageStatus::Placed;
        }
        if matches!(package.status, PackageStatus::Placed | PackageStatus::Picked)
            && package.deadline <= self.time
        {
            log::info!("package expired at time {}", self.time);
            package.status = PackageStatus::Expired;
        }
    }

    fn collect_package(&mut self) {
        let location = self.agent.location;
        let package = &mut self.package;
        if package.status == PackageStatus::Placed && package.pickup == location {
            log::debug!("package picked up at {location}");
            package.status = PackageStatus::Picked;
        }
        if package.status == PackageStatus::Picked && package.deliver_to == location {
            log::info!("package delivered at {location}, time {}", self.time);
            package.status = PackageStatus::Delivered;
            self.agent.score += 1;
        }
    }

    pub fn snapshot_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.write_u32(self.time);
        hasher.write_i32(self.agent.location.row);
        hasher.write_i32(self.agent.location.col);
        hasher.write_u32(self.agent.actions);
        hasher.write_u32(self.agent.score);
        hasher.write_u8(self.package.status as u8);
        for edge in self.grid.special_edges() {
            hasher.write_i32(edge.from.row);
            hasher.write_i32(edge.from.col);
            hasher.write_i32(edge.to.row);
            hasher.write_i32(edge.to.col);
            hasher.write_u8(match edge.kind {
                SpecialKind::AlwaysBlocked => 0,
                SpecialKind::Fragile { .. } => 1,
            });
        }
        hasher.finish()
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max_row = self.grid.rows() - 1;
        let max_col = self.grid.cols() - 1;
        writeln!(f, "#X {max_row} ; Maximum x coordinate: {max_row}")?;
        writeln!(f, "#Y {max_col} ; Maximum y coordinate: {max_col}")?;

        let package = &self.package;
        let Pos { row, col } = package.pickup;
        match package.status {
            PackageStatus::Waiting => writeln!(
                f,
                "#P 0  T {0} ; Package 0: waiting to appear, At time: {0}",
                package.appears_at
            )?,
            PackageStatus::Placed => {
                writeln!(f, "#P 1  L {row} {col} ; Package 0: placed, On location: ({row},{col})")?
            }
            PackageStatus::Picked => writeln!(f, "#P 2  A 0 ; Package 0: picked, By agent: 0")?,
            PackageStatus::Delivered => writeln!(f, "#P 3  A 0 ; Package 0: delivered, By agent 0")?,
            PackageStatus::Expired => writeln!(
                f,
                "#P 4  T {0} ; Package 0: disappeared, At time {0}",
                package.deadline
            )?,
        }

        writeln!(f)?;
        for (idx, edge) in self.grid.special_edges().iter().enumerate() {
            match edge.kind {
                SpecialKind::AlwaysBlocked => {
                    writeln!(f, "#E 0 ; Edge {idx} {}: always blocked", edge.identifier())?
                }
                SpecialKind::Fragile { probability } => writeln!(
                    f,
                    "#E 1 ; Edge {idx} {}: fragile, p = {probability}",
                    edge.identifier()
                )?,
            }
        }

        let agent = &self.agent;
        let Pos { row, col } = agent.location;
        writeln!(
            f,
            "#A 0  L {row} {col}  A {}  S {} ; Agent 0: Normal agent, Location: ({row} {col}), \
             Number of actions: {}, Score: {}",
            agent.actions, agent.score, agent.actions, agent.score
        )?;
        writeln!(f)?;
        writeln!(f, "#T {0} ; Total Time unit passed: {0}", self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn new_world_picks_up_the_co_located_package() {
        let world = World::new(&corridor_map(Vec::new())).unwrap();
        assert_eq!(world.package().status, PackageStatus::Picked);
        assert_eq!(world.grid().occupied(), &[Pos::new(0, 0)]);
    }

    #[test]
    fn validation_rejects_extra_packages_and_agents() {
        let mut map = corridor_map(Vec::new());
        map.packages.push(map.packages[0]);
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));

        let mut map = corridor_map(Vec::new());
        map.agents.push(Pos::new(0, 1));
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));

        let mut map = corridor_map(Vec::new());
        map.agents.clear();
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));
    }

    #[test]
    fn validation_requires_time_zero_and_co_location() {
        let mut map = corridor_map(Vec::new());
        map.packages[0].appears_at = 3;
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));

        let mut map = corridor_map(Vec::new());
        map.agents[0] = Pos::new(0, 1);
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));
    }

    #[test]
    fn stepping_to_the_destination_delivers() {
        let mut world = World::new(&corridor_map(Vec::new())).unwrap();
        world.step(Direction::Right).unwrap();
        world.advance_clock();
        assert!(!world.is_finished());
        world.step(Direction::Right).unwrap();
        assert_eq!(world.package().status, PackageStatus::Delivered);
        assert_eq!(world.agent().score, 1);
        assert_eq!(world.agent().actions, 2);
        assert!(world.is_finished());
    }

    #[test]
    fn crossing_a_fragile_edge_leaves_it_fragile() {
        let mut world = World::new(&detour_map(0.9)).unwrap();
        world.step(Direction::Right).unwrap();
        world.step(Direction::Right).unwrap();
        assert_eq!(world.agent().location, Pos::new(0, 2));
        assert_eq!(world.grid().fragile_edges().len(), 1);
        assert!(world.grid().is_path_available(Pos::new(0, 2), Pos::new(0, 1)).unwrap());
    }

    #[test]
    fn illegal_steps_are_rejected_without_moving() {
        let blocked = vec![SpecialEdge::always_blocked(Pos::new(0, 0), Pos::new(0, 1))];
        let mut world = World::new(&corridor_map(blocked)).unwrap();
        assert_eq!(
            world.step(Direction::Right),
            Err(NavError::IllegalMove { from: Pos::new(0, 0), direction: Direction::Right })
        );
        assert!(matches!(world.step(Direction::Up), Err(NavError::IllegalMove { .. })));
        assert_eq!(world.agent().location, Pos::new(0, 0));
    }

    #[test]
    fn package_expires_at_its_deadline() {
        let mut map = corridor_map(Vec::new());
        map.packages[0].deadline = 2;
        let mut world = World::new(&map).unwrap();
        world.advance_clock();
        assert_eq!(world.package().status, PackageStatus::Picked);
        world.advance_clock();
        assert_eq!(world.package().status, PackageStatus::Expired);
        assert!(world.is_finished());
    }

    #[test]
    fn display_summarises_state() {
        let edges = vec![SpecialEdge::fragile(Pos::new(0, 1), Pos::new(0, 2), 0.5)];
        let world = World::new(&corridor_map(edges)).unwrap();
        let text = world.to_string();
        assert!(text.starts_with("#X 0 ; Maximum x coordinate: 0\n#Y 2 ; Maximum y coordinate: 2\n"));
        assert!(text.contains("#P 2  A 0 ; Package 0: picked, By agent: 0"));
        assert!(text.contains("#E 1 ; Edge 0 (0,1) (0,2): fragile, p = 0.5"));
        assert!(text.contains("#A 0  L 0 0  A 0  S 0"));
        assert!(text.ends_with("#T 0 ; Total Time unit passed: 0\n"));
    }

    #[test]
    fn snapshot_hash_tracks_agent_progress() {
        let mut world = World::new(&corridor_map(Vec::new())).unwrap();
        let before = world.snapshot_hash();
        assert_eq!(before, world.clone().snapshot_hash());
        world.step(Direction::Right).unwrap();
        assert_ne!(before, world.snapshot_hash());
    }
}
