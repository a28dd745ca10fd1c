//! Error taxonomy for grid queries, belief tables, planning and map loading.

use thiserror::Error;

use crate::types::{Direction, Pos};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("position {pos} is outside the {rows}x{cols} grid")]
    OutOfBounds { pos: Pos, rows: usize, cols: usize },
    #[error("vertex index {index} is outside a grid of {vertices} vertices")]
    IndexOutOfBounds { index: usize, vertices: usize },
    #[error("invalid action `{0}`")]
    InvalidAction(String),
    #[error("invalid edge {from} - {to}: {reason}")]
    InvalidEdge { from: Pos, to: Pos, reason: &'static str },
    #[error("unknown belief state {belief} for location {location}")]
    UnknownBelief { belief: String, location: Pos },
    #[error("no fragile edge registered between {from} and {to}")]
    EdgeNotFound { from: Pos, to: Pos },
    #[error("invalid map: {0}")]
    Validation(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("illegal move {direction} from {from}")]
    IllegalMove { from: Pos, direction: Direction },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type NavResult<T> = Result<T, NavError>;
