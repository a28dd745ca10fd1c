//! Belief vectors over the fixed set of fragile edges.
//!
//! A belief vector holds one symbol per fragile edge, in fragile-edge enumeration order.
//! Stored table keys only ever use `T` (blocked), `F` (open) and `U` (unknown); the
//! wildcards `X` (anything) and `K` (any resolved state) exist for queries.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeBelief {
    /// `T`
    Blocked,
    /// `F`
    Open,
    /// `U`
    Unknown,
    /// `X`
    Any,
    /// `K`
    Resolved,
}

impl EdgeBelief {
    /// Symbols that may appear in stored keys, in enumeration order.
    pub const STORED: [EdgeBelief; 3] = [EdgeBelief::Blocked, EdgeBelief::Open, EdgeBelief::Unknown];

    pub const fn symbol(self) -> char {
        match self {
            EdgeBelief::Blocked => 'T',
            EdgeBelief::Open => 'F',
            EdgeBelief::Unknown => 'U',
            EdgeBelief::Any => 'X',
            EdgeBelief::Resolved => 'K',
        }
    }

    pub fn from_symbol(symbol: char) -> NavResult<Self> {
        match symbol {
            'T' => Ok(EdgeBelief::Blocked),
            'F' => Ok(EdgeBelief::Open),
            'U' => Ok(EdgeBelief::Unknown),
            'X' => Ok(EdgeBelief::Any),
            'K' => Ok(EdgeBelief::Resolved),
            other => Err(NavError::InvariantViolation(format!(
                "belief symbol `{other}` is outside the alphabet T/F/U/X/K"
            ))),
        }
    }

    pub const fn is_wildcard(self) -> bool {
        matches!(self, EdgeBelief::Any | EdgeBelief::Resolved)
    }

    pub const fn from_blocked(blocked: bool) -> Self {
        if blocked { EdgeBelief::Blocked } else { EdgeBelief::Open }
    }

    /// Symmetric wildcard-aware comparison of two symbols.
    pub fn matches(self, other: EdgeBelief) -> bool {
        match (self, other) {
            (EdgeBelief::Any, _) | (_, EdgeBelief::Any) => true,
            (EdgeBelief::Resolved, EdgeBelief::Unknown)
            | (EdgeBelief::Unknown, EdgeBelief::Resolved) => false,
            (EdgeBelief::Resolved, _) | (_, EdgeBelief::Resolved) => true,
            (a, b) => a == b,
        }
    }

    fn digit(self) -> Option<usize> {
        match self {
            EdgeBelief::Blocked => Some(0),
            EdgeBelief::Open => Some(1),
            EdgeBelief::Unknown => Some(2),
            EdgeBelief::Any | EdgeBelief::Resolved => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeliefVector(Vec<EdgeBelief>);

impl BeliefVector {
    pub fn new(symbols: Vec<EdgeBelief>) -> Self {
        Self(symbols)
    }

    pub fn filled(len: usize, symbol: EdgeBelief) -> Self {
        Self(vec![symbol; len])
    }

    pub fn unknown(len: usize) -> Self {
        Self::filled(len, EdgeBelief::Unknown)
    }

    /// Parses a compact symbol string such as `"TFU"`.
    pub fn parse(symbols: &str) -> NavResult<Self> {
        symbols.chars().map(EdgeBelief::from_symbol).collect::<NavResult<Vec<_>>>().map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn symbols(&self) -> &[EdgeBelief] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = EdgeBelief> + '_ {
        self.0.iter().copied()
    }

    /// Copy with position `idx` replaced by `symbol`.
    pub fn with(&self, idx: usize, symbol: EdgeBelief) -> Self {
        let mut next = self.clone();
        next.0[idx] = symbol;
        next
    }

    pub fn set(&mut self, idx: usize, symbol: EdgeBelief) {
        self.0[idx] = symbol;
    }

    pub fn unknown_count(&self) -> usize {
        self.0.iter().filter(|symbol| **symbol == EdgeBelief::Unknown).count()
    }

    /// True when no wildcard appears, i.e. the vector can be a stored key.
    pub fn is_concrete(&self) -> bool {
        !self.0.iter().any(|symbol| symbol.is_wildcard())
    }

    pub fn matches(&self, other: &BeliefVector) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.matches(*b))
    }

    /// Position of a concrete key inside the enumeration of `{T,F,U}^k`.
    pub(crate) fn ordinal(&self) -> Option<usize> {
        self.0.iter().try_fold(0usize, |acc, symbol| symbol.digit().map(|digit| acc * 3 + digit))
    }
}

impl Index<usize> for BeliefVector {
    type Output = EdgeBelief;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

impl fmt::Display for BeliefVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, symbol) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", symbol.symbol())?;
        }
        f.write_str("]")
    }
}

/// Every stored key for `fragile_count` fragile edges, in cartesian-product order
/// (first edge varies slowest, symbols ordered `T`, `F`, `U`).
#[derive(Debug, PartialEq, Eq)]
pub struct BeliefSpace {
    fragile_count: usize,
    keys: Vec<BeliefVector>,
}

impl BeliefSpace {
    pub fn new(fragile_count: usize) -> Self {
        let total = 3usize.pow(fragile_count as u32);
        let keys = (0..total)
            .map(|ordinal| {
                let mut symbols = vec![EdgeBelief::Blocked; fragile_count];
                let mut rest = ordinal;
                for slot in symbols.iter_mut().rev() {
                    *slot = EdgeBelief::STORED[rest % 3];
                    rest /= 3;
                }
                BeliefVector(symbols)
            })
            .collect();
        Self { fragile_count, keys }
    }

    pub fn fragile_count(&self) -> usize {
        self.fragile_count
    }

    pub fn keys(&self) -> &[BeliefVector] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys ordered for solving: fully resolved first, then by increasing unknown count.
    pub fn solve_order(&self) -> Vec<&BeliefVector> {
        let mut ordered: Vec<&BeliefVector> = self.keys.iter().collect();
        ordered.sort_by_key(|key| key.unknown_count());
        ordered
    }

    /// Rejects vectors of the wrong length; wildcards are allowed.
    pub fn check(&self, query: &BeliefVector) -> NavResult<()> {
        if query.len() != self.fragile_count {
            return Err(NavError::InvariantViolation(format!(
                "belief {query} has {} symbols, expected {}",
                query.len(),
                self.fragile_count
            )));
        }
        Ok(())
    }
}
