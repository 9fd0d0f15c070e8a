//! Seams to the outside world: distance metrics and the constraint solver.
//!
//! The solver is a black box. It is grounded with a fact base plus rule
//! files, then enumerates models one at a time through a [`ModelHandler`].

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Coordinate;
use crate::facts::FactSet;

/// Distance between two coordinates, in miles.
pub trait DistanceMetric: Sync {
    fn distance(&self, from: Coordinate, to: Coordinate) -> f64;
}

/// One candidate solution enumerated by the solver.
pub trait SolverModel {
    /// Every fact true in the model, input facts included.
    fn facts(&self) -> &FactSet;

    /// Cost vector, one entry per optimisation priority level.
    fn cost(&self) -> &[i64];

    /// Whether the solver has proven no better-cost model exists.
    fn optimality_proven(&self) -> bool;
}

/// Returned from every model delivery to steer enumeration.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum SolveCommand {
    #[default]
    Continue,
    Stop(String),
}

impl SolveCommand {
    pub fn is_stop(&self) -> bool {
        matches!(self, SolveCommand::Stop(_))
    }
}

impl std::fmt::Display for SolveCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveCommand::Continue => write!(f, "Continue"),
            SolveCommand::Stop(reason) => write!(f, "Stop: {}", reason),
        }
    }
}

/// Receives models strictly one at a time.
///
/// The solver must not deliver the next model before `on_model` returns.
pub trait ModelHandler {
    fn on_model(&mut self, model: &dyn SolverModel) -> SolveCommand;
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("grounding failed: {0}")]
    Ground(String),

    #[error("search failed: {0}")]
    Search(String),
}

/// An external constraint solver.
pub trait Solver {
    fn ground(&mut self, facts: &FactSet, rules: &[PathBuf]) -> Result<(), SolverError>;

    /// Runs the search, handing each model to `handler` until the search
    /// space is exhausted or the handler returns [`SolveCommand::Stop`].
    fn solve(&mut self, handler: &mut dyn ModelHandler) -> Result<(), SolverError>;
}
