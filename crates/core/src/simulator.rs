//! Tick loop that drives the agent with the step controller until the package is settled.

use serde::Serialize;

use crate::belief::BeliefVector;
use crate::controller::StepController;
use crate::engine::ValueIteration;
use crate::error::NavResult;
use crate::types::{Action, Direction, Pos};
use crate::world::{PackageStatus, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Delivered,
    Expired,
    /// The controller had no move under its belief.
    Stuck,
    TickBudgetExhausted,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepRecord {
    pub time: u32,
    pub from: Pos,
    pub action: Direction,
    /// Belief the action was chosen under.
    pub belief: BeliefVector,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepRecord>,
    pub outcome: RunOutcome,
    pub final_time: u32,
    pub score: u32,
    pub snapshot_hash: u64,
}

pub struct Simulator<'a> {
    world: World,
    controller: StepController<'a>,
    belief: BeliefVector,
}

impl<'a> Simulator<'a> {
    pub fn new(world: World, engine: &'a ValueIteration) -> Self {
        let controller = StepController::new(engine);
        let belief = controller.initial_belief();
        Self { world, controller, belief }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn belief(&self) -> &BeliefVector {
        &self.belief
    }

    pub fn run(&mut self, max_ticks: u32) -> NavResult<SimulationReport> {
        let mut steps = Vec::new();
        let mut outcome = RunOutcome::TickBudgetExhausted;
        for _ in 0..max_ticks {
            if let Some(done) = self.settled() {
                outcome = done;
                break;
            }
            let decision = self.controller.next_action(&self.world, &self.belief)?;
            self.belief = decision.belief;
            let Some(Action::Move(direction)) = decision.action else {
                outcome = RunOutcome::Stuck;
                break;
            };
            let from = self.world.agent().location;
            let time = self.world.time();
            self.world.step(direction)?;
            self.world.advance_clock();
            steps.push(StepRecord { time, from, action: direction, belief: self.belief.clone() });
        }
        if outcome == RunOutcome::TickBudgetExhausted
            && let Some(done) = self.settled()
        {
            outcome = done;
        }

        let report = SimulationReport {
            steps,
            outcome,
            final_time: self.world.time(),
            score: self.world.agent().score,
            snapshot_hash: self.world.snapshot_hash(),
        };
        log::info!(
            "simulation ended {:?} at time {} after {} steps",
            report.outcome,
            report.final_time,
            report.steps.len()
        );
        Ok(report)
    }

    fn settled(&self) -> Option<RunOutcome> {
        if !self.world.is_finished() {
            return None;
        }
        Some(match self.world.package().status {
            PackageStatus::Delivered => RunOutcome::Delivered,
            _ => RunOutcome::Expired,
        })
    }
}
