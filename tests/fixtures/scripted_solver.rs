//! In-memory solver that replays a fixed list of models.

use std::path::PathBuf;
use std::time::Duration;

use run_scheduler::facts::{Fact, FactSet};
use run_scheduler::traits::{ModelHandler, SolveCommand, Solver, SolverError, SolverModel};

#[derive(Debug, Clone)]
pub struct ScriptedModel {
    facts: FactSet,
    cost: Vec<i64>,
    optimal: bool,
}

impl ScriptedModel {
    pub fn new(facts: impl IntoIterator<Item = Fact>, cost: Vec<i64>, optimal: bool) -> Self {
        Self {
            facts: facts.into_iter().collect(),
            cost,
            optimal,
        }
    }
}

impl SolverModel for ScriptedModel {
    fn facts(&self) -> &FactSet {
        &self.facts
    }

    fn cost(&self) -> &[i64] {
        &self.cost
    }

    fn optimality_proven(&self) -> bool {
        self.optimal
    }
}

/// Replays its models in order, each merged with the grounded input facts.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    models: Vec<ScriptedModel>,
    grounded: Option<FactSet>,
    pub rules: Vec<PathBuf>,
    pub delivered: usize,
    pub stopped_with: Option<String>,
    pub fail_search: bool,
    /// Time spent in `ground`, standing in for a slow grounder.
    pub ground_delay: Duration,
}

impl ScriptedSolver {
    pub fn new(models: Vec<ScriptedModel>) -> Self {
        Self {
            models,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_search: true,
            ..Default::default()
        }
    }
}

impl Solver for ScriptedSolver {
    fn ground(&mut self, facts: &FactSet, rules: &[PathBuf]) -> Result<(), SolverError> {
        std::thread::sleep(self.ground_delay);
        self.grounded = Some(facts.clone());
        self.rules = rules.to_vec();
        Ok(())
    }

    fn solve(&mut self, handler: &mut dyn ModelHandler) -> Result<(), SolverError> {
        let grounded = self
            .grounded
            .clone()
            .ok_or_else(|| SolverError::Search("solve called before ground".to_string()))?;
        if self.fail_search {
            return Err(SolverError::Search("scripted failure".to_string()));
        }
        for model in &self.models {
            let mut facts = grounded.clone();
            facts.extend(model.facts.iter().cloned());
            let merged = ScriptedModel {
                facts,
                cost: model.cost.clone(),
                optimal: model.optimal,
            };
            self.delivered += 1;
            if let SolveCommand::Stop(reason) = handler.on_model(&merged) {
                self.stopped_with = Some(reason);
                break;
            }
        }
        Ok(())
    }
}
