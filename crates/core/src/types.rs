use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// A grid vertex addressed as `(row, col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(self, (d_row, d_col): (i32, i32)) -> Self {
        Self { row: self.row + d_row, col: self.col + d_col }
    }

    pub fn step(self, direction: Direction) -> Self {
        self.offset(direction.delta())
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit `(row, col)` delta for this move.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Direction of a single 4-neighborhood step, `None` for anything else.
    pub fn between(from: Pos, to: Pos) -> Option<Direction> {
        match (to.row - from.row, to.col - from.col) {
            (-1, 0) => Some(Direction::Up),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (0, 1) => Some(Direction::Right),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Up" => Ok(Direction::Up),
            "Down" => Ok(Direction::Down),
            "Left" => Ok(Direction::Left),
            "Right" => Ok(Direction::Right),
            other => Err(NavError::InvalidAction(other.to_string())),
        }
    }
}

/// An entry in a utility table: a move, or staying put at the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    NoOp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(direction) => direction.fmt(f),
            Action::NoOp => f.write_str("no-op"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Normal,
    AlwaysBlocked,
    Fragile,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpecialKind {
    AlwaysBlocked,
    /// Blocked with `probability`, unresolved until an endpoint is visited.
    Fragile { probability: f64 },
}

/// A registered non-normal edge between two grid-adjacent vertices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecialEdge {
    pub from: Pos,
    pub to: Pos,
    pub kind: SpecialKind,
}

impl SpecialEdge {
    pub fn always_blocked(from: Pos, to: Pos) -> Self {
        Self { from, to, kind: SpecialKind::AlwaysBlocked }
    }

    pub fn fragile(from: Pos, to: Pos, probability: f64) -> Self {
        Self { from, to, kind: SpecialKind::Fragile { probability } }
    }

    pub fn edge_kind(&self) -> EdgeKind {
        match self.kind {
            SpecialKind::AlwaysBlocked => EdgeKind::AlwaysBlocked,
            SpecialKind::Fragile { .. } => EdgeKind::Fragile,
        }
    }

    /// True when this edge joins `a` and `b` in either orientation.
    pub fn connects(&self, a: Pos, b: Pos) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    pub fn touches(&self, pos: Pos) -> bool {
        self.from == pos || self.to == pos
    }

    pub fn identifier(&self) -> String {
        edge_identifier(self.from, self.to)
    }
}

/// One of the fixed set of fragile edges the belief vectors range over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragileEdge {
    pub from: Pos,
    pub to: Pos,
    pub probability: f64,
    pub identifier: String,
}

impl FragileEdge {
    pub fn new(from: Pos, to: Pos, probability: f64) -> Self {
        Self { from, to, probability, identifier: edge_identifier(from, to) }
    }

    pub fn connects(&self, a: Pos, b: Pos) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    pub fn touches(&self, pos: Pos) -> bool {
        self.from == pos || self.to == pos
    }
}

fn edge_identifier(from: Pos, to: Pos) -> String {
    format!("{from} {to}")
}
