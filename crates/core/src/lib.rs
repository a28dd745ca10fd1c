pub mod belief;
pub mod controller;
pub mod engine;
pub mod error;
pub mod grid;
pub mod instance;
pub mod parser;
pub mod policy;
pub mod simulator;
pub mod types;
pub mod utility;
pub mod world;

#[cfg(test)]
mod test_support;

pub use belief::{BeliefSpace, BeliefVector, EdgeBelief};
pub use controller::{StepController, StepDecision};
pub use engine::{MAX_FRAGILE_EDGES, SolveStats, ValueIteration};
pub use error::{NavError, NavResult};
pub use grid::{Grid, MAX_VERTICES};
pub use instance::resolve_instance;
pub use parser::parse_map;
pub use policy::{Observation, PolicyNode, PolicyWalk};
pub use simulator::{RunOutcome, SimulationReport, Simulator, StepRecord};
pub use types::*;
pub use utility::{StateUtility, Utility, UtilityEntry};
pub use world::{Agent, MapDescription, Package, PackageSpec, PackageStatus, World};
