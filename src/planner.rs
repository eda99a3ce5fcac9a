//! Job orchestration.
//!
//! Routes a planning job through the pipeline: configuration validation,
//! greedy baseline, optional schedule GA, or matrix GA (single or joint).
//! Non-fatal outcomes — timeout, stagnation, an incumbent with remaining
//! hard violations — come back inside the success payload so the caller
//! keeps the best-effort result; only a broken configuration or an
//! internal fault is an error.
//!
//! Progress is pushed through an injectable sink every few generations and
//! mirrored to `tracing`. Cancellation is cooperative: a shared flag is
//! checked at generation boundaries and the incumbent is returned promptly.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::baseline;
use crate::error::{PlanError, Result};
use crate::evaluator::{evaluate, Evaluation, FitnessWeights, RosterKpi};
use crate::ga::{
    GaOptions, GaProblem, GaRunner, GaStats, GaStatus, MatrixProblem, MatrixTarget, Progress,
    ScheduleProblem,
};
use crate::models::{PlanningConfig, Roster, ScheduleSource};
use crate::validation::{validate_config, ValidationError, ValidationErrorKind};

/// Recognised optimiser options, all optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizerOptions {
    /// Run the schedule GA on top of the greedy baseline.
    pub use_ga: bool,
    /// Fall back to the greedy schedule when the GA incumbent is invalid.
    pub greedy_fallback: bool,
    pub ga_timeout_ms: Option<u64>,
    pub population_size: Option<usize>,
    pub max_generations: Option<usize>,
    pub stagnation_limit: Option<usize>,
    pub elite_count: Option<usize>,
    pub mutation_rate: Option<f64>,
    pub crossover_rate: Option<f64>,
    pub tournament_size: Option<usize>,
    pub baseline_adherence: Option<f64>,
    /// Per-probe fitness weight overrides.
    pub weights: Option<WeightOverrides>,
    /// Matrix GA only: inject the current matrices as individual 0.
    pub use_current_as_seed: bool,
    /// RNG seed for reproducible jobs.
    pub seed: Option<u64>,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            use_ga: true,
            greedy_fallback: true,
            ga_timeout_ms: None,
            population_size: None,
            max_generations: None,
            stagnation_limit: None,
            elite_count: None,
            mutation_rate: None,
            crossover_rate: None,
            tournament_size: None,
            baseline_adherence: None,
            weights: None,
            use_current_as_seed: false,
            seed: None,
        }
    }
}

impl OptimizerOptions {
    /// Applies the set options onto a base GA configuration.
    fn apply(&self, mut base: GaOptions) -> GaOptions {
        if let Some(v) = self.ga_timeout_ms {
            base.timeout_ms = v;
        }
        if let Some(v) = self.population_size {
            base.population_size = v;
        }
        if let Some(v) = self.max_generations {
            base.max_generations = v;
        }
        if let Some(v) = self.stagnation_limit {
            base.stagnation_limit = v;
        }
        if let Some(v) = self.elite_count {
            base.elite_count = v;
        }
        if let Some(v) = self.mutation_rate {
            base.mutation_rate = v;
        }
        if let Some(v) = self.crossover_rate {
            base.crossover_rate = v;
        }
        if let Some(v) = self.tournament_size {
            base.tournament_size = v;
        }
        if let Some(v) = self.baseline_adherence {
            base.baseline_adherence = v;
        }
        base.seed = self.seed;
        base.sanitized()
    }

    /// The fitness weights with any overrides applied.
    fn fitness_weights(&self) -> FitnessWeights {
        let mut weights = FitnessWeights::default();
        if let Some(over) = &self.weights {
            if let Some(v) = over.constraint_violation {
                weights.constraint_violation = v;
            }
            if let Some(v) = over.coverage_violation {
                weights.coverage_violation = v;
            }
            if let Some(v) = over.exclusion_violation {
                weights.exclusion_violation = v;
            }
            if let Some(v) = over.hours_under {
                weights.hours_under = v;
            }
            if let Some(v) = over.hours_over {
                weights.hours_over = v;
            }
            if let Some(v) = over.matrix_change {
                weights.matrix_change = v;
            }
        }
        weights
    }
}

/// Fitness weight overrides, keyed the way hosts send them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    #[serde(rename = "CONSTRAINT_VIOLATION", default, skip_serializing_if = "Option::is_none")]
    pub constraint_violation: Option<f64>,
    #[serde(rename = "COVERAGE_VIOLATION", default, skip_serializing_if = "Option::is_none")]
    pub coverage_violation: Option<f64>,
    #[serde(rename = "EXCLUSION_VIOLATION", default, skip_serializing_if = "Option::is_none")]
    pub exclusion_violation: Option<f64>,
    #[serde(rename = "HOURS_UNDER", default, skip_serializing_if = "Option::is_none")]
    pub hours_under: Option<f64>,
    #[serde(rename = "HOURS_OVER", default, skip_serializing_if = "Option::is_none")]
    pub hours_over: Option<f64>,
    #[serde(rename = "MATRIX_CHANGE", default, skip_serializing_if = "Option::is_none")]
    pub matrix_change: Option<f64>,
}

/// Why a job could not deliver a clean result.
///
/// Serialised as the tag strings hosts display (`timeout`,
/// `constraints_violated`, ..., `error:<msg>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FailureReason {
    Timeout,
    ConstraintsViolated,
    NoSolution,
    InitialInconsistency,
    MaxBacktracks,
    Error(String),
}

impl From<FailureReason> for String {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::Timeout => "timeout".to_string(),
            FailureReason::ConstraintsViolated => "constraints_violated".to_string(),
            FailureReason::NoSolution => "no_solution".to_string(),
            FailureReason::InitialInconsistency => "initial_inconsistency".to_string(),
            FailureReason::MaxBacktracks => "max_backtracks".to_string(),
            FailureReason::Error(msg) => format!("error:{msg}"),
        }
    }
}

impl TryFrom<String> for FailureReason {
    type Error = String;

    fn try_from(tag: String) -> std::result::Result<Self, String> {
        match tag.as_str() {
            "timeout" => Ok(Self::Timeout),
            "constraints_violated" => Ok(Self::ConstraintsViolated),
            "no_solution" => Ok(Self::NoSolution),
            "initial_inconsistency" => Ok(Self::InitialInconsistency),
            "max_backtracks" => Ok(Self::MaxBacktracks),
            other => match other.strip_prefix("error:") {
                Some(msg) => Ok(Self::Error(msg.to_string())),
                None => Err(format!("unknown failure reason '{other}'")),
            },
        }
    }
}

/// Result of a schedule job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub roster: Roster,
    pub evaluation: Evaluation,
    pub kpi: RosterKpi,
    /// The optimiser stopped early (timeout or cancel); the roster is the
    /// incumbent at that point.
    pub best_effort: bool,
    /// Hard violations remain in the returned roster.
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GaStats>,
}

/// Result of a matrix job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixResult {
    /// The evolved grids, keyed by matrix id.
    pub matrices: BTreeMap<String, Vec<Vec<String>>>,
    pub fitness: f64,
    pub best_effort: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GaStats>,
}

/// A job sent into the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobRequest {
    GenerateSchedule {
        #[serde(flatten)]
        config: PlanningConfig,
        #[serde(default)]
        options: OptimizerOptions,
    },
    GenerateMatrix {
        #[serde(rename = "targetMatrixId")]
        target_matrix_id: String,
        /// Resize the target to this many rows before evolving.
        #[serde(rename = "rowCount", default, skip_serializing_if = "Option::is_none")]
        row_count: Option<usize>,
        /// Resize the target to this cycle length before evolving.
        #[serde(rename = "columnCount", default, skip_serializing_if = "Option::is_none")]
        column_count: Option<usize>,
        #[serde(flatten)]
        config: PlanningConfig,
        #[serde(default)]
        options: OptimizerOptions,
    },
    GenerateAllMatrices {
        #[serde(flatten)]
        config: PlanningConfig,
        #[serde(default)]
        options: OptimizerOptions,
    },
}

/// A message sent back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobResponse {
    Progress {
        #[serde(flatten)]
        progress: Progress,
    },
    Success {
        payload: JobPayload,
        #[serde(default)]
        failed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<FailureReason>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

/// The payload of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobPayload {
    Schedule(Box<ScheduleResult>),
    Matrices(MatrixResult),
}

/// Orchestrates planning jobs.
///
/// A planner is cheap to build per job. Both the progress sink and the
/// cancel flag are optional.
#[derive(Default)]
pub struct Planner<'a> {
    progress: Option<Box<dyn FnMut(Progress) + 'a>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Planner<'a> {
    /// Creates a planner with no progress sink and no cancel flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a progress sink.
    pub fn with_progress(mut self, sink: impl FnMut(Progress) + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Installs a cooperative cancel flag.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Builds the month's schedule: greedy baseline, then the schedule GA
    /// unless disabled.
    pub fn generate_monthly_schedule(
        &mut self,
        config: &PlanningConfig,
        options: &OptimizerOptions,
    ) -> Result<ScheduleResult> {
        validate_config(config).map_err(PlanError::ConfigInvalid)?;
        let ga_options = options.apply(GaOptions::default());
        let weights = options.fitness_weights();
        let mut rng = job_rng(ga_options.seed);

        info!(
            year = config.year,
            month = config.month,
            employees = config.employees.len(),
            use_ga = options.use_ga,
            "building monthly schedule"
        );

        let greedy = baseline::build(config, &mut rng)?;
        let greedy_eval = evaluate(&greedy, config, None, &weights);

        if !options.use_ga {
            return Ok(finish_schedule(greedy, greedy_eval, config, false, None));
        }

        let problem = ScheduleProblem::new(config, &greedy)
            .with_weights(weights.clone())
            .with_baseline_adherence(ga_options.baseline_adherence);
        let mut runner = GaRunner::new(ga_options);
        if let Some(flag) = self.cancel {
            runner = runner.with_cancel_flag(flag);
        }
        if let Some(sink) = self.progress.as_mut() {
            runner = runner.with_progress(|p| sink(p));
        }
        let outcome = runner.run(&problem, &mut rng)?;
        drop(runner);

        let mut best = outcome.best;
        best.set_source(ScheduleSource::Evolved);
        let evaluation = evaluate(&best, config, Some(&greedy), &weights);

        if !evaluation.is_valid && options.greedy_fallback && greedy_eval.is_valid {
            warn!(
                fitness = outcome.best_fitness,
                "optimiser incumbent violates hard constraints; falling back to greedy schedule"
            );
            let mut result = finish_schedule(greedy.clone(), greedy_eval, config, true, None);
            result.stats = Some(outcome.stats);
            return Ok(result);
        }

        let best_effort = matches!(outcome.status, GaStatus::TimedOut | GaStatus::Cancelled);
        let reason = if !evaluation.is_valid {
            Some(FailureReason::ConstraintsViolated)
        } else if outcome.status == GaStatus::TimedOut {
            Some(FailureReason::Timeout)
        } else {
            None
        };
        let mut result = finish_schedule(best, evaluation, config, best_effort, reason);
        result.stats = Some(outcome.stats);
        Ok(result)
    }

    /// Evolves one matrix, holding the others fixed.
    pub fn generate_matrix(
        &mut self,
        config: &PlanningConfig,
        target_matrix_id: &str,
        options: &OptimizerOptions,
    ) -> Result<MatrixResult> {
        if !config.matrices.iter().any(|m| m.id == target_matrix_id) {
            return Err(PlanError::ConfigInvalid(vec![ValidationError {
                kind: ValidationErrorKind::UnknownMatrix,
                message: format!("target matrix '{target_matrix_id}' is not declared"),
            }]));
        }
        self.run_matrix_job(
            config,
            MatrixTarget::Single(target_matrix_id.to_string()),
            options,
        )
    }

    /// Evolves all matrices jointly.
    pub fn generate_all_matrices(
        &mut self,
        config: &PlanningConfig,
        options: &OptimizerOptions,
    ) -> Result<MatrixResult> {
        self.run_matrix_job(config, MatrixTarget::Joint, options)
    }

    fn run_matrix_job(
        &mut self,
        config: &PlanningConfig,
        target: MatrixTarget,
        options: &OptimizerOptions,
    ) -> Result<MatrixResult> {
        validate_config(config).map_err(PlanError::ConfigInvalid)?;
        let ga_options = options.apply(GaOptions::matrix_defaults());
        let weights = options.fitness_weights();
        let mut rng = job_rng(ga_options.seed);

        info!(
            mode = ?target,
            population = ga_options.population_size,
            "evolving matrices"
        );

        let problem = MatrixProblem::new(config, target)
            .with_weights(weights)
            .with_current_as_seed(options.use_current_as_seed)
            .with_probe_seed(ga_options.seed.unwrap_or(0));
        let mut runner = GaRunner::new(ga_options);
        if let Some(flag) = self.cancel {
            runner = runner.with_cancel_flag(flag);
        }
        if let Some(sink) = self.progress.as_mut() {
            runner = runner.with_progress(|p| sink(p));
        }
        let outcome = runner.run(&problem, &mut rng)?;
        drop(runner);

        let failed = !problem.is_valid(&outcome.best);
        let best_effort = matches!(outcome.status, GaStatus::TimedOut | GaStatus::Cancelled);
        let reason = if failed {
            Some(FailureReason::ConstraintsViolated)
        } else if outcome.status == GaStatus::TimedOut {
            Some(FailureReason::Timeout)
        } else {
            None
        };

        Ok(MatrixResult {
            matrices: outcome.best,
            fitness: outcome.best_fitness,
            best_effort,
            failed,
            reason,
            stats: Some(outcome.stats),
        })
    }

    /// Routes a wire-format request and folds errors into the response.
    pub fn run_job(&mut self, request: &JobRequest) -> JobResponse {
        let result = match request {
            JobRequest::GenerateSchedule { config, options } => self
                .generate_monthly_schedule(config, options)
                .map(|r| (JobPayload::Schedule(Box::new(r.clone())), r.failed, r.reason)),
            JobRequest::GenerateMatrix {
                target_matrix_id,
                row_count,
                column_count,
                config,
                options,
            } => {
                let config = resize_target(config, target_matrix_id, *row_count, *column_count);
                self.generate_matrix(&config, target_matrix_id, options)
                    .map(|r| (JobPayload::Matrices(r.clone()), r.failed, r.reason))
            }
            JobRequest::GenerateAllMatrices { config, options } => self
                .generate_all_matrices(config, options)
                .map(|r| (JobPayload::Matrices(r.clone()), r.failed, r.reason)),
        };

        match result {
            Ok((payload, failed, reason)) => JobResponse::Success {
                payload,
                failed,
                reason,
            },
            Err(err) => JobResponse::Error {
                details: error_details(&err),
                message: err.to_string(),
            },
        }
    }
}

/// Resizes the target matrix to the requested dimensions before evolving,
/// wrapping existing rows and cells cyclically to fill new space.
fn resize_target(
    config: &PlanningConfig,
    target_matrix_id: &str,
    row_count: Option<usize>,
    column_count: Option<usize>,
) -> PlanningConfig {
    let mut config = config.clone();
    if let Some(matrix) = config
        .matrices
        .iter_mut()
        .find(|m| m.id == target_matrix_id)
    {
        if matrix.snake_len() == 0 {
            return config;
        }
        if let Some(rows) = row_count.filter(|r| *r > 0 && *r != matrix.rows()) {
            let existing = matrix.grid.clone();
            matrix.grid = (0..rows)
                .map(|r| existing[r % existing.len()].clone())
                .collect();
        }
        if let Some(cols) = column_count.filter(|c| *c > 0 && *c != matrix.cols()) {
            for row in &mut matrix.grid {
                let existing = row.clone();
                *row = (0..cols).map(|c| existing[c % existing.len()].clone()).collect();
            }
        }
    }
    config
}

fn job_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

fn finish_schedule(
    roster: Roster,
    evaluation: Evaluation,
    config: &PlanningConfig,
    best_effort: bool,
    reason: Option<FailureReason>,
) -> ScheduleResult {
    let kpi = RosterKpi::compute(&roster, config, &evaluation);
    let failed = !evaluation.is_valid;
    let reason = reason.or(if failed {
        Some(FailureReason::ConstraintsViolated)
    } else {
        None
    });
    ScheduleResult {
        roster,
        evaluation,
        kpi,
        best_effort,
        failed,
        reason,
        stats: None,
    }
}

fn error_details(err: &PlanError) -> Option<String> {
    match err {
        PlanError::ConfigInvalid(errors) => Some(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoverageRule, Employee, ScheduleSource, ShiftMatrix, ShiftType,
    };
    use std::cell::RefCell;
    use std::sync::atomic::Ordering;

    fn two_line_config() -> PlanningConfig {
        PlanningConfig {
            year: 2027,
            month: 1, // 28 days, starts Monday
            employees: vec![
                Employee::new("e1").with_matrix("mx1"),
                Employee::new("e2").with_matrix("mx2"),
            ],
            shift_types: vec![
                ShiftType::new("M").with_hours(8.0),
                ShiftType::new("P").with_hours(8.0),
                ShiftType::new("RP"),
            ],
            matrices: vec![
                ShiftMatrix::new("mx1", [["M", "M", "M", "M", "M", "M", "M"]]),
                ShiftMatrix::new("mx2", [["P", "P", "P", "P", "P", "P", "P"]]),
            ],
            coverage_rules: vec![CoverageRule::new(1, ["M"]), CoverageRule::new(1, ["P"])],
            ..Default::default()
        }
    }

    fn fast_options() -> OptimizerOptions {
        OptimizerOptions {
            population_size: Some(12),
            max_generations: Some(50),
            stagnation_limit: Some(10),
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = two_line_config();
        cfg.month = 42;
        let err = Planner::new()
            .generate_monthly_schedule(&cfg, &OptimizerOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::ConfigInvalid(_)));
    }

    #[test]
    fn test_greedy_only_schedule() {
        let cfg = two_line_config();
        let options = OptimizerOptions {
            use_ga: false,
            seed: Some(1),
            ..Default::default()
        };
        let result = Planner::new()
            .generate_monthly_schedule(&cfg, &options)
            .unwrap();
        assert!(!result.failed);
        assert!(!result.best_effort);
        assert!(result.evaluation.is_valid);
        assert!(result.stats.is_none());
        assert_eq!(
            result.roster.entry("e1").unwrap().source,
            ScheduleSource::Greedy
        );
    }

    #[test]
    fn test_ga_schedule_valid_and_marked_evolved() {
        let cfg = two_line_config();
        let result = Planner::new()
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        assert!(!result.failed);
        assert!(result.evaluation.is_valid);
        assert!(result.stats.is_some());
        assert_eq!(
            result.roster.entry("e1").unwrap().source,
            ScheduleSource::Evolved
        );
    }

    #[test]
    fn test_impossible_coverage_flagged() {
        let mut cfg = two_line_config();
        // Three M heads from two employees can never happen.
        cfg.coverage_rules = vec![CoverageRule::new(3, ["M"])];
        let result = Planner::new()
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        assert!(result.failed);
        assert_eq!(result.reason, Some(FailureReason::ConstraintsViolated));
        // The incumbent still comes back for display.
        assert_eq!(result.roster.employee_count(), 2);
    }

    #[test]
    fn test_progress_events_emitted() {
        let events = RefCell::new(Vec::new());
        let mut cfg = two_line_config();
        // Unsatisfiable coverage keeps fitness above zero so the run
        // spends its generations.
        cfg.coverage_rules = vec![CoverageRule::new(3, ["M"])];
        let mut planner = Planner::new().with_progress(|p| events.borrow_mut().push(p));
        planner
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        drop(planner);

        let events = events.into_inner();
        assert!(!events.is_empty());
        assert!(events[0].generation >= 1);
        assert!(events.iter().all(|p| p.max_generations == 50));
        assert!(events.windows(2).all(|w| w[1].best_fitness <= w[0].best_fitness));
    }

    #[test]
    fn test_cancelled_job_returns_best_effort() {
        let flag = AtomicBool::new(false);
        flag.store(true, Ordering::Relaxed);
        let mut cfg = two_line_config();
        cfg.coverage_rules = vec![CoverageRule::new(3, ["M"])];
        let result = Planner::new()
            .with_cancel_flag(&flag)
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        assert!(result.best_effort);
    }

    #[test]
    fn test_generate_matrix_unknown_target() {
        let cfg = two_line_config();
        let err = Planner::new()
            .generate_matrix(&cfg, "nope", &OptimizerOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::ConfigInvalid(_)));
    }

    #[test]
    fn test_generate_matrix_single() {
        let cfg = two_line_config();
        let options = OptimizerOptions {
            population_size: Some(10),
            max_generations: Some(50),
            stagnation_limit: Some(10),
            seed: Some(7),
            use_current_as_seed: true,
            ..Default::default()
        };
        let result = Planner::new()
            .generate_matrix(&cfg, "mx2", &options)
            .unwrap();
        assert_eq!(result.matrices.len(), 1);
        assert!(result.matrices.contains_key("mx2"));
        assert_eq!(result.matrices["mx2"].len(), 1);
        assert_eq!(result.matrices["mx2"][0].len(), 7);
    }

    #[test]
    fn test_run_job_schedule_roundtrip() {
        let request = JobRequest::GenerateSchedule {
            config: two_line_config(),
            options: fast_options(),
        };
        let response = Planner::new().run_job(&request);
        match response {
            JobResponse::Success {
                payload: JobPayload::Schedule(result),
                failed,
                ..
            } => {
                assert!(!failed);
                assert!(result.evaluation.is_valid);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_run_job_error_response() {
        let mut cfg = two_line_config();
        cfg.matrices.clear();
        let request = JobRequest::GenerateSchedule {
            config: cfg,
            options: OptimizerOptions::default(),
        };
        match Planner::new().run_job(&request) {
            JobResponse::Error { message, details } => {
                assert!(message.contains("invalid configuration"));
                assert!(details.is_some());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_run_job_matrix_resize() {
        let request = JobRequest::GenerateMatrix {
            target_matrix_id: "mx2".into(),
            row_count: Some(2),
            column_count: Some(14),
            config: two_line_config(),
            options: OptimizerOptions {
                population_size: Some(10),
                max_generations: Some(50),
                stagnation_limit: Some(10),
                seed: Some(3),
                ..Default::default()
            },
        };
        match Planner::new().run_job(&request) {
            JobResponse::Success {
                payload: JobPayload::Matrices(result),
                ..
            } => {
                assert_eq!(result.matrices["mx2"].len(), 2);
                assert_eq!(result.matrices["mx2"][0].len(), 14);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_failure_reason_tags() {
        assert_eq!(String::from(FailureReason::Timeout), "timeout");
        assert_eq!(
            String::from(FailureReason::ConstraintsViolated),
            "constraints_violated"
        );
        assert_eq!(
            String::from(FailureReason::Error("boom".into())),
            "error:boom"
        );
        assert_eq!(
            FailureReason::try_from("max_backtracks".to_string()).unwrap(),
            FailureReason::MaxBacktracks
        );
        assert_eq!(
            FailureReason::try_from("error:x".to_string()).unwrap(),
            FailureReason::Error("x".into())
        );
        assert!(FailureReason::try_from("nope".to_string()).is_err());
    }

    #[test]
    fn test_weight_overrides_wire_names() {
        let json = r#"{"weights": {"HOURS_UNDER": 20.0, "MATRIX_CHANGE": 1.0}}"#;
        let options: OptimizerOptions = serde_json::from_str(json).unwrap();
        let weights = options.fitness_weights();
        assert!((weights.hours_under - 20.0).abs() < 1e-10);
        assert!((weights.matrix_change - 1.0).abs() < 1e-10);
        // Untouched weights keep their defaults.
        assert!((weights.hours_over - 8.0).abs() < 1e-10);
        assert!((weights.constraint_violation - 10_000.0).abs() < 1e-10);
    }

    #[test]
    fn test_job_request_wire_format() {
        let request = JobRequest::GenerateSchedule {
            config: two_line_config(),
            options: OptimizerOptions::default(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"generateSchedule\""));
        assert!(json.contains("\"shiftTypes\""));
        let back: JobRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_seeded_jobs_reproducible() {
        let cfg = two_line_config();
        let a = Planner::new()
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        let b = Planner::new()
            .generate_monthly_schedule(&cfg, &fast_options())
            .unwrap();
        assert_eq!(a.roster, b.roster);
        assert_eq!(a.evaluation.fitness, b.evaluation.fitness);
    }
}
