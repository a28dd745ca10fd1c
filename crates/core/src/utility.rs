//! Per-vertex utility tables keyed by belief vector.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::belief::{BeliefSpace, BeliefVector};
use crate::error::{NavError, NavResult};
use crate::types::{Action, Pos};

/// Expected reward-to-goal: the negated step cost, or no route at all.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Utility {
    Unreachable,
    Reward(f64),
}

impl Utility {
    pub const GOAL: Utility = Utility::Reward(0.0);

    pub fn is_reachable(self) -> bool {
        matches!(self, Utility::Reward(_))
    }

    pub fn reward(self) -> Option<f64> {
        match self {
            Utility::Reward(reward) => Some(reward),
            Utility::Unreachable => None,
        }
    }

    /// Value of reaching `self` after paying `cost`.
    pub fn after_step(self, cost: u32) -> Utility {
        match self {
            Utility::Reward(reward) => Utility::Reward(reward - f64::from(cost)),
            Utility::Unreachable => Utility::Unreachable,
        }
    }

    /// `p * if_blocked + (1 - p) * if_open`; a branch with zero weight is ignored.
    pub fn mix(blocked_probability: f64, if_blocked: Utility, if_open: Utility) -> Utility {
        if blocked_probability <= 0.0 {
            return if_open;
        }
        if blocked_probability >= 1.0 {
            return if_blocked;
        }
        match (if_blocked, if_open) {
            (Utility::Reward(blocked), Utility::Reward(open)) => {
                Utility::Reward(blocked_probability * blocked + (1.0 - blocked_probability) * open)
            }
            _ => Utility::Unreachable,
        }
    }

    pub fn max(self, other: Utility) -> Utility {
        if other > self { other } else { self }
    }
}

impl PartialOrd for Utility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Utility::Unreachable, Utility::Unreachable) => Some(Ordering::Equal),
            (Utility::Unreachable, Utility::Reward(_)) => Some(Ordering::Less),
            (Utility::Reward(_), Utility::Unreachable) => Some(Ordering::Greater),
            (Utility::Reward(a), Utility::Reward(b)) => a.partial_cmp(b),
        }
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Utility::Unreachable => f.write_str("-inf"),
            Utility::Reward(reward) => write!(f, "{reward}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct UtilityEntry {
    pub value: Utility,
    pub action: Option<Action>,
}

impl UtilityEntry {
    pub const UNREACHABLE: UtilityEntry = UtilityEntry { value: Utility::Unreachable, action: None };
}

/// Value and best action for every stored belief at one location.
#[derive(Clone, Debug)]
pub struct StateUtility {
    location: Pos,
    space: Arc<BeliefSpace>,
    entries: Vec<UtilityEntry>,
}

impl StateUtility {
    pub fn new(location: Pos, space: Arc<BeliefSpace>) -> Self {
        let entries = vec![UtilityEntry::UNREACHABLE; space.len()];
        Self { location, space, entries }
    }

    pub fn location(&self) -> Pos {
        self.location
    }

    pub fn space(&self) -> &BeliefSpace {
        &self.space
    }

    /// Raises every stored entry matching `query` whose value is strictly below `value`.
    /// Returns whether anything changed; a rejected raise is a normal outcome.
    pub fn update(
        &mut self,
        query: &BeliefVector,
        value: Utility,
        action: Option<Action>,
    ) -> NavResult<bool> {
        self.space.check(query)?;
        if let Some(ordinal) = query.ordinal() {
            return Ok(raise(&mut self.entries[ordinal], value, action));
        }
        let mut updated = false;
        for (key, entry) in self.space.keys().iter().zip(self.entries.iter_mut()) {
            if key.matches(query) {
                updated |= raise(entry, value, action);
            }
        }
        Ok(updated)
    }

    /// First stored entry, in enumeration order, whose key matches `query`.
    pub fn lookup(&self, query: &BeliefVector) -> NavResult<UtilityEntry> {
        self.space.check(query)?;
        if let Some(ordinal) = query.ordinal() {
            return Ok(self.entries[ordinal]);
        }
        self.space
            .keys()
            .iter()
            .position(|key| key.matches(query))
            .map(|ordinal| self.entries[ordinal])
            .ok_or_else(|| NavError::UnknownBelief {
                belief: query.to_string(),
                location: self.location,
            })
    }

    pub fn value(&self, query: &BeliefVector) -> NavResult<Utility> {
        self.lookup(query).map(|entry| entry.value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&BeliefVector, &UtilityEntry)> {
        self.space.keys().iter().zip(self.entries.iter())
    }
}

fn raise(entry: &mut UtilityEntry, value: Utility, action: Option<Action>) -> bool {
    if value > entry.value {
        log::trace!("raise {} -> {value} ({action:?})", entry.value);
        *entry = UtilityEntry { value, action };
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::EdgeBelief;
    use crate::types::Direction;

    fn table(fragile_count: usize) -> StateUtility {
        StateUtility::new(Pos::new(0, 0), Arc::new(BeliefSpace::new(fragile_count)))
    }

    fn belief(symbols: &str) -> BeliefVector {
        BeliefVector::parse(symbols).unwrap()
    }

    #[test]
    fn fresh_table_is_unreachable_everywhere() {
        let table = table(2);
        assert!(table.entries().all(|(_, entry)| *entry == UtilityEntry::UNREACHABLE));
        assert_eq!(table.entries().count(), 9);
    }

    #[test]
    fn update_only_raises_values() {
        let mut table = table(1);
        let right = Some(Action::Move(Direction::Right));
        assert!(table.update(&belief("T"), Utility::Reward(-3.0), right).unwrap());
        assert!(!table.update(&belief("T"), Utility::Reward(-5.0), None).unwrap());
        assert!(!table.update(&belief("T"), Utility::Reward(-3.0), None).unwrap());
        assert_eq!(
            table.lookup(&belief("T")).unwrap(),
            UtilityEntry { value: Utility::Reward(-3.0), action: right }
        );
        assert!(!table.update(&belief("F"), Utility::Unreachable, None).unwrap());
    }

    #[test]
    fn wildcard_update_raises_every_completion() {
        let mut table = table(2);
        assert!(table.update(&belief("KX"), Utility::Reward(-1.0), Some(Action::NoOp)).unwrap());
        for (key, entry) in table.entries() {
            let expected = key[0] != EdgeBelief::Unknown;
            assert_eq!(entry.value.is_reachable(), expected, "key {key}");
        }
    }

    #[test]
    fn wildcard_lookup_returns_first_match_in_enumeration_order() {
        let mut table = table(2);
        table.update(&belief("FU"), Utility::Reward(-2.0), None).unwrap();
        table.update(&belief("FT"), Utility::Reward(-4.0), None).unwrap();
        assert_eq!(table.value(&belief("FX")).unwrap(), Utility::Reward(-4.0));
        assert_eq!(table.value(&belief("XU")).unwrap(), Utility::Unreachable);
    }

    #[test]
    fn malformed_query_length_fails_fast() {
        let table = table(2);
        assert!(matches!(table.lookup(&belief("T")), Err(NavError::InvariantViolation(_))));
    }

    #[test]
    fn mixing_weights_branches_and_propagates_unreachable() {
        assert_eq!(
            Utility::mix(0.25, Utility::Reward(-4.0), Utility::Reward(-2.0)),
            Utility::Reward(-2.5)
        );
        assert_eq!(
            Utility::mix(0.5, Utility::Unreachable, Utility::Reward(-1.0)),
            Utility::Unreachable
        );
        assert_eq!(Utility::mix(0.0, Utility::Unreachable, Utility::Reward(-1.0)), Utility::Reward(-1.0));
        assert_eq!(Utility::mix(1.0, Utility::Reward(-7.0), Utility::Unreachable), Utility::Reward(-7.0));
    }

    #[test]
    fn unreachable_orders_below_every_reward() {
        assert!(Utility::Unreachable < Utility::Reward(-1e9));
        assert_eq!(Utility::Unreachable.max(Utility::Reward(-2.0)), Utility::Reward(-2.0));
        assert_eq!(Utility::Unreachable.to_string(), "-inf");
        assert_eq!(Utility::Reward(-2.0).to_string(), "-2");
    }
}
