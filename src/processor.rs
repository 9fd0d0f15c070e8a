//! Per-model processing for a solve session.
//!
//! The solver hands over models strictly one at a time. [`ModelProcessor`]
//! is stateless across calls: the session counters live in
//! [`SessionState`], which is passed in and handed back on every call.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::extract::{DaySchedule, ExtractError, extract_schedule, fingerprint, label_costs};
use crate::facts::FactSet;
use crate::format::{costs_to_string, schedule_to_table};
use crate::precision::{PrecisionCodec, PrecisionPair};
use crate::store::{Solution, SolutionStore, StoreError};
use crate::traits::{ModelHandler, SolveCommand, Solver, SolverError, SolverModel};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),

    #[error("cannot persist solutions: {0}")]
    Store(StoreError),
}

#[derive(Debug, Error)]
enum ModelError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub event: String,
    pub precision: PrecisionPair,
    /// Keep every model under its raw counter instead of only labelling
    /// optimal ones.
    pub save_all_models: bool,
    /// Ask the solver to stop once this many optimal models are saved.
    pub stop_after_optimal: Option<u64>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            event: "event".to_string(),
            precision: PrecisionPair::default(),
            save_all_models: false,
            stop_after_optimal: None,
        }
    }
}

/// A model that could not be turned into a saved solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFailure {
    pub model: u64,
    pub error: String,
}

/// Moment the search began, taken after grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveStart {
    pub at: DateTime<Local>,
    pub instant: Instant,
}

impl SolveStart {
    pub fn now() -> Self {
        Self {
            at: Local::now(),
            instant: Instant::now(),
        }
    }
}

/// Counters carried across the models of one solve session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Set when the search starts; stamped at the first model otherwise.
    pub solve_start: Option<SolveStart>,
    /// Number of models delivered so far; also the next model's index.
    pub models: u64,
    /// Index of the first model reported as optimal.
    pub first_optimal: Option<u64>,
    pub optimal_saved: u64,
    pub failures: Vec<ModelFailure>,
}

impl SessionState {
    /// Position of an optimal model relative to the first optimal one.
    pub fn relative_label(&self, index: u64) -> Option<u64> {
        self.first_optimal
            .and_then(|first| index.checked_sub(first))
    }

    /// File stem for the model at `index`.
    pub fn file_name(&self, index: u64, optimal: bool, save_all_models: bool) -> String {
        if save_all_models {
            return index.to_string();
        }
        match self.relative_label(index) {
            Some(label) if optimal => format!("solution_{}", label),
            _ => "solution".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ModelProcessor {
    options: ProcessorOptions,
    codec: PrecisionCodec,
    store: SolutionStore,
}

impl ModelProcessor {
    pub fn new(options: ProcessorOptions, store: SolutionStore) -> Self {
        Self {
            codec: PrecisionCodec::new(options.precision.distance),
            options,
            store,
        }
    }

    /// Builds a processor whose output directory follows the configuration,
    /// defaulting to `solutions/<event>_<solve start>`.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let store = match &config.out_dir {
            Some(dir) => SolutionStore::new(dir.clone()),
            None => SolutionStore::per_session("solutions", config.event.clone()),
        };
        Self::new(config.processor_options(), store.with_fact_dump(config.save_facts))
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn store(&self) -> &SolutionStore {
        &self.store
    }

    /// Handles one model and returns the updated session state.
    ///
    /// Failures specific to this model are logged and recorded in the state;
    /// only a failure that dooms every later model is returned as an error.
    pub fn process(
        &self,
        mut state: SessionState,
        model: &dyn SolverModel,
    ) -> (SessionState, Result<SolveCommand, SessionError>) {
        let start = *state.solve_start.get_or_insert_with(SolveStart::now);
        let index = state.models;
        state.models += 1;
        let optimal = model.optimality_proven();
        if optimal && state.first_optimal.is_none() {
            state.first_optimal = Some(index);
        }
        let name = state.file_name(index, optimal, self.options.save_all_models);

        match self.save_model(index, &name, model, start) {
            Ok(path) => {
                info!(model = index, optimal, path = %path.display(), "saved solution");
            }
            Err(ModelError::Store(err)) if err.is_structural() => {
                error!(model = index, error = %err, "output directory unusable, aborting session");
                return (state, Err(SessionError::Store(err)));
            }
            Err(err) => {
                error!(model = index, error = %err, "failed to process model");
                state.failures.push(ModelFailure {
                    model: index,
                    error: err.to_string(),
                });
                return (state, Ok(SolveCommand::Continue));
            }
        }

        if optimal {
            state.optimal_saved += 1;
            if let Some(limit) = self.options.stop_after_optimal {
                if state.optimal_saved >= limit {
                    let reason = format!("{} optimal models saved", state.optimal_saved);
                    return (state, Ok(SolveCommand::Stop(reason)));
                }
            }
        }
        (state, Ok(SolveCommand::Continue))
    }

    fn save_model(
        &self,
        index: u64,
        name: &str,
        model: &dyn SolverModel,
        start: SolveStart,
    ) -> Result<PathBuf, ModelError> {
        let facts = model.facts();
        let schedule = extract_schedule(facts, &self.codec)?;
        let costs = label_costs(facts, model.cost());
        if costs.len() != model.cost().len() {
            warn!(
                model = index,
                labels = costs.len(),
                levels = model.cost().len(),
                "objective labels do not cover the cost vector"
            );
        }
        info!("schedule for model {}:\n{}", index, schedule_to_table(&schedule));
        info!("costs: {}", costs_to_string(&costs));

        let solution = self.solution(index, model.optimality_proven(), schedule, costs, facts, start);
        Ok(self.store.save(name, &solution, facts)?)
    }

    fn solution(
        &self,
        index: u64,
        optimal: bool,
        schedule: Vec<DaySchedule>,
        costs: BTreeMap<String, i64>,
        facts: &FactSet,
        start: SolveStart,
    ) -> Solution {
        Solution {
            event: self.options.event.clone(),
            model: index,
            start_time: start.at,
            found_time: Local::now(),
            compute_seconds: start.instant.elapsed().as_secs_f64(),
            distance_precision: self.options.precision.distance,
            duration_precision: self.options.precision.duration,
            optimal,
            schedule,
            costs,
            hash: fingerprint(facts),
        }
    }
}

/// Adapts a [`ModelProcessor`] to the solver's callback interface.
#[derive(Debug)]
pub struct SolveSession<'p> {
    processor: &'p ModelProcessor,
    state: SessionState,
    stopped: Option<String>,
    fatal: Option<SessionError>,
}

impl<'p> SolveSession<'p> {
    /// Starts a session; create it once grounding has finished.
    pub fn new(processor: &'p ModelProcessor) -> Self {
        Self {
            processor,
            state: SessionState {
                solve_start: Some(SolveStart::now()),
                ..Default::default()
            },
            stopped: None,
            fatal: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn finish(self, elapsed: Duration) -> Result<SessionReport, SessionError> {
        if let Some(err) = self.fatal {
            return Err(err);
        }
        Ok(SessionReport {
            models: self.state.models,
            first_optimal: self.state.first_optimal,
            optimal_saved: self.state.optimal_saved,
            failures: self.state.failures,
            stopped: self.stopped,
            elapsed,
        })
    }
}

impl ModelHandler for SolveSession<'_> {
    fn on_model(&mut self, model: &dyn SolverModel) -> SolveCommand {
        if self.fatal.is_some() {
            return SolveCommand::Stop("session already failed".to_string());
        }
        let state = std::mem::take(&mut self.state);
        let (state, result) = self.processor.process(state, model);
        self.state = state;
        match result {
            Ok(command) => {
                if let SolveCommand::Stop(reason) = &command {
                    info!(reason = %reason, "stopping model enumeration");
                    self.stopped = Some(reason.clone());
                }
                command
            }
            Err(err) => {
                let reason = err.to_string();
                self.fatal = Some(err);
                SolveCommand::Stop(reason)
            }
        }
    }
}

/// Outcome of a completed solve session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub models: u64,
    pub first_optimal: Option<u64>,
    pub optimal_saved: u64,
    pub failures: Vec<ModelFailure>,
    /// Set when the session asked the solver to stop early.
    pub stopped: Option<String>,
    pub elapsed: Duration,
}

impl SessionReport {
    /// The solver delivered no model at all: the problem is infeasible or the
    /// search space was exhausted. This is not an error.
    pub fn found_none(&self) -> bool {
        self.models == 0
    }
}

/// Grounds `facts` with `rules`, runs the search and feeds every model to
/// `processor`.
pub fn run_session<S>(
    solver: &mut S,
    facts: &FactSet,
    rules: &[PathBuf],
    processor: &ModelProcessor,
) -> Result<SessionReport, SessionError>
where
    S: Solver + ?Sized,
{
    info!(facts = facts.len(), rules = rules.len(), "grounding");
    solver.ground(facts, rules)?;

    info!(event = %processor.options().event, "starting solve");
    let started = Instant::now();
    let mut session = SolveSession::new(processor);
    solver.solve(&mut session)?;
    let report = session.finish(started.elapsed())?;

    if report.found_none() {
        warn!("solver found no models");
    }
    info!(
        models = report.models,
        failures = report.failures.len(),
        elapsed = ?report.elapsed,
        "finished solve"
    );
    Ok(report)
}
