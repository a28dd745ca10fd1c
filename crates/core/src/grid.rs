//! Undirected 4-neighborhood grid graph with blocked and fragile edge registry.
//! This module owns adjacency, coordinate transforms and edge classification.
//! It does not own package bookkeeping or any planning state.

use crate::error::{NavError, NavResult};
use crate::types::{Direction, EdgeKind, FragileEdge, Pos, SpecialEdge, SpecialKind};

/// Largest supported vertex count; every vertex gets its own utility table.
pub const MAX_VERTICES: usize = 1 << 20;

#[derive(Clone, Debug)]
pub struct Grid {
    rows: usize,
    cols: usize,
    vertex_count: usize,
    special_edges: Vec<SpecialEdge>,
    occupied: Vec<Pos>,
    // Per vertex, indexed by `Direction::slot`.
    open: Vec<[bool; 4]>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, special_edges: Vec<SpecialEdge>) -> NavResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(NavError::Validation(format!("grid must not be empty, got {rows}x{cols}")));
        }
        // The cap also keeps every coordinate within `i32`.
        let vertex_count = rows
            .checked_mul(cols)
            .filter(|&count| count <= MAX_VERTICES)
            .ok_or_else(|| {
                NavError::Validation(format!(
                    "grid {rows}x{cols} exceeds the supported maximum of {MAX_VERTICES} vertices"
                ))
            })?;
        let mut grid = Self {
            rows,
            cols,
            vertex_count,
            special_edges: Vec::new(),
            occupied: Vec::new(),
            open: Vec::new(),
        };
        for (idx, edge) in special_edges.iter().enumerate() {
            grid.coords_to_index(edge.from)?;
            grid.coords_to_index(edge.to)?;
            if Direction::between(edge.from, edge.to).is_none() {
                return Err(NavError::InvalidEdge {
                    from: edge.from,
                    to: edge.to,
                    reason: "endpoints are not grid-adjacent",
                });
            }
            if let SpecialKind::Fragile { probability } = edge.kind
                && !(0.0..=1.0).contains(&probability)
            {
                return Err(NavError::InvalidEdge {
                    from: edge.from,
                    to: edge.to,
                    reason: "blocking probability must lie in [0, 1]",
                });
            }
            if special_edges[..idx].iter().any(|other| other.connects(edge.from, edge.to)) {
                return Err(NavError::InvalidEdge {
                    from: edge.from,
                    to: edge.to,
                    reason: "edge registered more than once",
                });
            }
        }
        grid.special_edges = special_edges;
        grid.rebuild_adjacency();
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows
            && (pos.col as usize) < self.cols
    }

    pub fn coords_to_index(&self, pos: Pos) -> NavResult<usize> {
        if !self.contains(pos) {
            return Err(NavError::OutOfBounds { pos, rows: self.rows, cols: self.cols });
        }
        Ok(pos.row as usize * self.cols + pos.col as usize)
    }

    pub fn index_to_coords(&self, index: usize) -> NavResult<Pos> {
        if index >= self.vertex_count() {
            return Err(NavError::IndexOutOfBounds { index, vertices: self.vertex_count() });
        }
        Ok(Pos::new((index / self.cols) as i32, (index % self.cols) as i32))
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let cols = self.cols;
        (0..self.vertex_count()).map(move |index| Pos::new((index / cols) as i32, (index % cols) as i32))
    }

    pub fn occupied(&self) -> &[Pos] {
        &self.occupied
    }

    pub fn set_occupied(&mut self, positions: Vec<Pos>) {
        self.occupied = positions;
    }

    /// Copy of this grid with every agent occupancy cleared.
    pub fn without_occupants(&self) -> Grid {
        Grid { occupied: Vec::new(), ..self.clone() }
    }

    /// Whether the adjacency edge from `pos` towards `direction` exists.
    pub fn has_edge(&self, pos: Pos, direction: Direction) -> bool {
        match self.coords_to_index(pos) {
            Ok(index) => self.open[index][direction.slot()],
            Err(_) => false,
        }
    }

    /// Neighbor reached through an existing adjacency edge.
    pub fn neighbor(&self, pos: Pos, direction: Direction) -> Option<Pos> {
        self.has_edge(pos, direction).then(|| pos.step(direction))
    }

    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = (Direction, Pos)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.neighbor(pos, direction).map(|next| (direction, next)))
    }

    pub fn is_path_available(&self, from: Pos, to: Pos) -> NavResult<bool> {
        self.coords_to_index(from)?;
        self.coords_to_index(to)?;
        if self.occupied.contains(&to) {
            return Ok(false);
        }
        Ok(Direction::between(from, to).is_some_and(|direction| self.has_edge(from, direction)))
    }

    /// Registered kind of the unordered pair plus its adjacency weight (1 if traversable, else 0).
    pub fn edge_type_and_cost(&self, from: Pos, to: Pos) -> NavResult<(EdgeKind, u32)> {
        let direction = self.action_name(from, to)?;
        let kind = self
            .special_edges
            .iter()
            .find(|edge| edge.connects(from, to))
            .map_or(EdgeKind::Normal, SpecialEdge::edge_kind);
        let cost = u32::from(self.has_edge(from, direction));
        Ok((kind, cost))
    }

    pub fn action_name(&self, from: Pos, to: Pos) -> NavResult<Direction> {
        self.coords_to_index(from)?;
        self.coords_to_index(to)?;
        Direction::between(from, to).ok_or(NavError::InvalidEdge {
            from,
            to,
            reason: "vertices are not 4-neighbors",
        })
    }

    pub fn special_edges(&self) -> &[SpecialEdge] {
        &self.special_edges
    }

    /// Fragile edges in registration order; this order defines belief-vector positions.
    pub fn fragile_edges(&self) -> Vec<FragileEdge> {
        self.special_edges
            .iter()
            .filter_map(|edge| match edge.kind {
                SpecialKind::Fragile { probability } => {
                    Some(FragileEdge::new(edge.from, edge.to, probability))
                }
                SpecialKind::AlwaysBlocked => None,
            })
            .collect()
    }

    /// Turns a registered fragile edge into an always-blocked one.
    pub fn block_fragile_edge(&mut self, from: Pos, to: Pos) -> NavResult<()> {
        let edge = self
            .special_edges
            .iter_mut()
            .find(|edge| edge.connects(from, to) && edge.edge_kind() == EdgeKind::Fragile)
            .ok_or(NavError::EdgeNotFound { from, to })?;
        edge.kind = SpecialKind::AlwaysBlocked;
        self.rebuild_adjacency();
        Ok(())
    }

    fn rebuild_adjacency(&mut self) {
        let mut open = vec![[false; 4]; self.vertex_count()];
        for (index, slots) in open.iter_mut().enumerate() {
            let pos = Pos::new((index / self.cols) as i32, (index % self.cols) as i32);
            for direction in Direction::ALL {
                slots[direction.slot()] = self.contains(pos.step(direction));
            }
        }
        for edge in &self.special_edges {
            if edge.edge_kind() != EdgeKind::AlwaysBlocked {
                continue;
            }
            for (a, b) in [(edge.from, edge.to), (edge.to, edge.from)] {
                if let (Some(direction), Ok(index)) =
                    (Direction::between(a, b), self.coords_to_index(a))
                {
                    open[index][direction.slot()] = false;
                }
            }
        }
        self.open = open;
    }
}
