//! Exhaustive policy tree over every fragile-edge realization along the planned route.
//!
//! The walk starts at the engine's start location with an all-unknown belief. Whenever the
//! current location touches fragile edges that are still unknown, the tree branches over every
//! blocked/open assignment of just those edges; otherwise it follows the stored optimal action.
//! Nodes are produced lazily in depth-first order, so callers can render or inspect them.

use serde::Serialize;

use crate::belief::{BeliefVector, EdgeBelief};
use crate::engine::ValueIteration;
use crate::error::{NavError, NavResult};
use crate::types::{Action, Direction, Pos};
use crate::utility::Utility;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub edge: String,
    pub blocked: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PolicyNode {
    /// Branch guard; the following nodes up to the next guard at `depth` belong to it.
    Guard { depth: usize, observations: Vec<Observation> },
    Step {
        depth: usize,
        location: Pos,
        belief: BeliefVector,
        action: Direction,
        value: Utility,
        cost: i64,
    },
    GoalReached { depth: usize, location: Pos, cost: i64 },
    Unreachable { depth: usize, location: Pos, belief: BeliefVector },
}

impl PolicyNode {
    pub fn depth(&self) -> usize {
        match self {
            PolicyNode::Guard { depth, .. }
            | PolicyNode::Step { depth, .. }
            | PolicyNode::GoalReached { depth, .. }
            | PolicyNode::Unreachable { depth, .. } => *depth,
        }
    }
}

#[derive(Clone, Debug)]
struct Frame {
    depth: usize,
    steps: usize,
    location: Pos,
    belief: BeliefVector,
    cost: i64,
}

enum Task {
    Visit(Frame),
    Branch { observations: Vec<Observation>, child: Frame },
}

pub struct PolicyWalk<'a> {
    engine: &'a ValueIteration,
    stack: Vec<Task>,
    max_steps: usize,
    failed: bool,
}

impl<'a> PolicyWalk<'a> {
    pub fn new(engine: &'a ValueIteration, start: Pos) -> Self {
        let root = Frame {
            depth: 0,
            steps: 0,
            location: start,
            belief: BeliefVector::unknown(engine.fragile_edges().len()),
            cost: 0,
        };
        // With a fixed belief every step strictly raises the value, and the belief can
        // narrow at most once per fragile edge.
        let max_steps = engine.grid().vertex_count() * (engine.fragile_edges().len() + 1);
        Self { engine, stack: vec![Task::Visit(root)], max_steps, failed: false }
    }

    fn visit(&mut self, frame: Frame) -> NavResult<PolicyNode> {
        if frame.steps > self.max_steps {
            return Err(NavError::InvariantViolation(format!(
                "policy walk exceeded {} steps at {}",
                self.max_steps, frame.location
            )));
        }
        if frame.location == self.engine.goal() {
            return Ok(PolicyNode::GoalReached {
                depth: frame.depth,
                location: frame.location,
                cost: frame.cost,
            });
        }

        let unresolved: Vec<usize> = self
            .engine
            .fragile_edges()
            .iter()
            .enumerate()
            .filter(|(idx, edge)| {
                edge.touches(frame.location) && frame.belief[*idx] == EdgeBelief::Unknown
            })
            .map(|(idx, _)| idx)
            .collect();
        if !unresolved.is_empty() {
            self.push_branches(&frame, &unresolved);
            return self.next_node();
        }

        let entry = self.engine.best_action(frame.location, &frame.belief)?;
        let Some(Action::Move(direction)) = entry.action else {
            return Ok(PolicyNode::Unreachable {
                depth: frame.depth,
                location: frame.location,
                belief: frame.belief,
            });
        };
        let next = self.engine.grid().neighbor(frame.location, direction).ok_or_else(|| {
            NavError::InvariantViolation(format!(
                "optimal action {direction} at {} crosses a missing edge",
                frame.location
            ))
        })?;
        let (_, step_cost) = self.engine.grid().edge_type_and_cost(frame.location, next)?;
        let node = PolicyNode::Step {
            depth: frame.depth,
            location: frame.location,
            belief: frame.belief.clone(),
            action: direction,
            value: entry.value,
            cost: frame.cost,
        };
        self.stack.push(Task::Visit(Frame {
            steps: frame.steps + 1,
            location: next,
            cost: frame.cost - i64::from(step_cost),
            ..frame
        }));
        Ok(node)
    }

    /// Queues one guarded child per blocked/open assignment, first assignment on top.
    fn push_branches(&mut self, frame: &Frame, unresolved: &[usize]) {
        let edges = self.engine.fragile_edges();
        let combinations = 1usize << unresolved.len();
        for mask in (0..combinations).rev() {
            let mut belief = frame.belief.clone();
            let mut observations = Vec::with_capacity(unresolved.len());
            for (bit, idx) in unresolved.iter().enumerate() {
                // Most significant bit first, blocked before open.
                let blocked = mask & (1 << (unresolved.len() - 1 - bit)) == 0;
                belief.set(*idx, EdgeBelief::from_blocked(blocked));
                observations.push(Observation { edge: edges[*idx].identifier.clone(), blocked });
            }
            let child = Frame { depth: frame.depth + 1, belief, ..frame.clone() };
            self.stack.push(Task::Branch { observations, child });
        }
    }

    fn next_node(&mut self) -> NavResult<PolicyNode> {
        match self.stack.pop() {
            Some(Task::Visit(frame)) => self.visit(frame),
            Some(Task::Branch { observations, child }) => {
                let depth = child.depth - 1;
                self.stack.push(Task::Visit(child));
                Ok(PolicyNode::Guard { depth, observations })
            }
            None => Err(NavError::InvariantViolation("policy walk ran out of tasks".to_string())),
        }
    }
}

impl Iterator for PolicyWalk<'_> {
    type Item = NavResult<PolicyNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.stack.is_empty() {
            return None;
        }
        let node = self.engine.ensure_solved().and_then(|()| self.next_node());
        self.failed = node.is_err();
        Some(node)
    }
}

impl ValueIteration {
    /// Lazily walks the decision tree from the package pickup location.
    pub fn policy_walk(&self) -> PolicyWalk<'_> {
        PolicyWalk::new(self, self.start())
    }

    /// Renders the full decision tree as indented text.
    pub fn find_policy(&self) -> NavResult<String> {
        let mut out = String::new();
        for node in self.policy_walk() {
            out.push_str(&render_node(&node?));
        }
        Ok(out)
    }
}

fn render_node(node: &PolicyNode) -> String {
    let indent = "    ".repeat(node.depth());
    match node {
        PolicyNode::Guard { observations, .. } => {
            let guard: Vec<String> = observations
                .iter()
                .map(|obs| {
                    format!("Blocked[{}]={}", obs.edge, if obs.blocked { "True" } else { "False" })
                })
                .collect();
            format!("{indent}if {}:\n", guard.join(" and "))
        }
        PolicyNode::Step { location, belief, action, value, cost, .. } => format!(
            "{indent}At {location} with belief {belief}: {action} \
             (expected value {value}, path cost {cost})\n"
        ),
        PolicyNode::GoalReached { location, cost, .. } => {
            format!("{indent}At {location}: no-op, goal reached (path cost {cost})\n")
        }
        PolicyNode::Unreachable { location, belief, .. } => {
            format!("{indent}At {location} with belief {belief}: unreachable, best to stop\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn nodes(engine: &ValueIteration) -> Vec<PolicyNode> {
        engine.policy_walk().collect::<NavResult<Vec<_>>>().expect("policy walk succeeds")
    }

    #[test]
    fn open_corridor_policy_is_a_straight_line() {
        let engine = solved_engine(&open_corridor(), Pos::new(0, 0), Pos::new(0, 2));
        let actions: Vec<Direction> = nodes(&engine)
            .into_iter()
            .filter_map(|node| match node {
                PolicyNode::Step { action, .. } => Some(action),
                _ => None,
            })
            .collect();
        assert_eq!(actions, [Direction::Right, Direction::Right]);
        assert_eq!(
            engine.find_policy().unwrap(),
            "At (0,0) with belief []: Right (expected value -2, path cost 0)\n\
             At (0,1) with belief []: Right (expected value -1, path cost -1)\n\
             At (0,2): no-op, goal reached (path cost -2)\n"
        );
    }

    #[test]
    fn fragile_edge_branches_when_its_endpoint_is_reached() {
        let engine = solved_engine(&fragile_detour(0.5), Pos::new(0, 0), Pos::new(0, 2));
        let walked = nodes(&engine);
        let guards: Vec<&PolicyNode> =
            walked.iter().filter(|node| matches!(node, PolicyNode::Guard { .. })).collect();
        assert_eq!(guards.len(), 2);
        assert_eq!(
            guards[0],
            &PolicyNode::Guard {
                depth: 0,
                observations: vec![Observation { edge: "(0,1) (0,2)".to_string(), blocked: true }],
            }
        );
        let goals = walked.iter().filter(|node| matches!(node, PolicyNode::GoalReached { .. }));
        assert_eq!(goals.count(), 2, "both realizations end at the goal");
    }

    #[test]
    fn blocked_branch_takes_the_detour() {
        let engine = solved_engine(&fragile_detour(0.5), Pos::new(0, 0), Pos::new(0, 2));
        let text = engine.find_policy().unwrap();
        assert!(text.contains("if Blocked[(0,1) (0,2)]=True:\n    At (0,1) with belief [T]: Down"));
        assert!(text.contains("if Blocked[(0,1) (0,2)]=False:\n    At (0,1) with belief [F]: Right"));
        assert!(text.contains("    At (0,2): no-op, goal reached (path cost -4)"));
        assert!(text.contains("    At (0,2): no-op, goal reached (path cost -2)"));
    }

    #[test]
    fn route_without_fallback_is_unreachable_from_the_start() {
        let engine = solved_engine(&fragile_corridor(0.5), Pos::new(0, 0), Pos::new(0, 2));
        assert_eq!(
            engine.find_policy().unwrap(),
            "At (0,0) with belief [U]: unreachable, best to stop\n"
        );
    }

    #[test]
    fn dead_end_branch_reports_unreachable() {
        let engine = solved_engine(&fragile_corridor(0.5), Pos::new(0, 1), Pos::new(0, 2));
        let walk = PolicyWalk::new(&engine, Pos::new(0, 1));
        let walked: Vec<PolicyNode> = walk.collect::<NavResult<_>>().unwrap();
        assert_eq!(walked.len(), 5);
        assert_eq!(
            walked[1],
            PolicyNode::Unreachable {
                depth: 1,
                location: Pos::new(0, 1),
                belief: BeliefVector::new(vec![EdgeBelief::Blocked]),
            }
        );
        assert!(matches!(walked[4], PolicyNode::GoalReached { depth: 1, cost: -1, .. }));
    }

    #[test]
    fn edges_seen_together_branch_over_all_assignments() {
        let engine = solved_engine(&two_fragile_exits(), Pos::new(0, 0), Pos::new(1, 1));
        let guards: Vec<Vec<bool>> = nodes(&engine)
            .into_iter()
            .filter_map(|node| match node {
                PolicyNode::Guard { depth: 0, observations } => {
                    Some(observations.iter().map(|obs| obs.blocked).collect())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            guards,
            [vec![true, true], vec![true, false], vec![false, true], vec![false, false]]
        );
    }

    #[test]
    fn unsolved_engine_yields_one_error_and_stops() {
        let engine = ValueIteration::new(&open_corridor(), Pos::new(0, 0), Pos::new(0, 2)).unwrap();
        let mut walk = engine.policy_walk();
        assert!(matches!(walk.next(), Some(Err(NavError::InvariantViolation(_)))));
        assert!(walk.next().is_none());
        assert!(matches!(engine.find_policy(), Err(NavError::InvariantViolation(_))));
    }
}
