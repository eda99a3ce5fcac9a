//! Roster evaluation.
//!
//! Aggregates sequencing-rule violations, exact daily coverage deviations,
//! exclusion violations, worked-hours deviation and pattern deviation into
//! one weighted fitness score (lower is better, 0 is perfect).
//!
//! Hard terms (rules, coverage, exclusions) make a roster invalid; soft
//! terms (hours, pattern deviation) only raise its cost. The hours penalty
//! is asymmetric on purpose: being under contract hurts the worker, so it
//! costs more than the same overshoot.
//!
//! Evaluation is a pure function of `(roster, config, baseline, weights)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::checker::{validate, Wrap};
use crate::models::{matches_shift, PlanningConfig, Roster};

/// Weights of the fitness terms. All overridable per probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessWeights {
    /// Cost per sequencing-rule violation.
    pub constraint_violation: f64,
    /// Cost per person-day of coverage deviation.
    pub coverage_violation: f64,
    /// Cost per excluded-shift assignment.
    pub exclusion_violation: f64,
    /// Cost per hour under contract.
    pub hours_under: f64,
    /// Cost per hour over contract.
    pub hours_over: f64,
    /// Cost per cell deviating from the baseline pattern.
    pub matrix_change: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            constraint_violation: 10_000.0,
            coverage_violation: 10_000.0,
            exclusion_violation: 10_000.0,
            hours_under: 15.0,
            hours_over: 8.0,
            matrix_change: 3.0,
        }
    }
}

/// Per-employee evaluation detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeReport {
    pub employee_id: String,
    /// Sequencing-rule violations over the month.
    pub rule_violations: usize,
    /// Days assigned an excluded shift.
    pub exclusion_violations: usize,
    /// Hours worked this month.
    pub worked_hours: f64,
    /// Contractual expectation: `weekly * days / 7`.
    pub expected_hours: f64,
    /// `worked - expected` (negative = under contract).
    pub hours_deviation: f64,
    /// Cells differing from the baseline pattern.
    pub matrix_deviations: usize,
}

/// Direction of a coverage miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageKind {
    Under,
    Over,
}

/// One day's miss against one coverage rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageViolation {
    pub day: usize,
    /// Index of the rule in the configuration.
    pub rule_index: usize,
    pub required: u32,
    pub actual: u32,
    /// `actual - required`.
    pub deviation: i64,
    pub kind: CoverageKind,
}

/// The full evaluation of a roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Weighted score; 0 means perfect.
    pub fitness: f64,
    /// True iff no hard violation remains.
    pub is_valid: bool,
    pub rule_violation_total: usize,
    /// Sum of absolute coverage deviations (person-days).
    pub coverage_deviation_total: usize,
    pub exclusion_total: usize,
    pub matrix_deviation_total: usize,
    pub employees: Vec<EmployeeReport>,
    pub coverage: Vec<CoverageViolation>,
}

/// Scores a roster against the configuration.
///
/// `baseline` enables the pattern-deviation term; pass `None` when there
/// is no reference pattern (e.g. scoring the baseline itself).
pub fn evaluate(
    roster: &Roster,
    config: &PlanningConfig,
    baseline: Option<&Roster>,
    weights: &FitnessWeights,
) -> Evaluation {
    let days = roster.days;
    let expected_factor = days as f64 / 7.0;
    let rules = config.enabled_rules();

    let mut employees = Vec::with_capacity(config.employees.len());
    let mut rule_total = 0usize;
    let mut exclusion_total = 0usize;
    let mut matrix_total = 0usize;
    let mut hours_penalty = 0.0f64;

    for emp in &config.employees {
        let Some(entry) = roster.entry(&emp.id) else {
            continue;
        };

        let rule_violations = validate(&entry.shifts, &rules, Wrap::Linear).len();
        let exclusion_violations = entry
            .shifts
            .iter()
            .filter(|code| emp.is_excluded(code))
            .count();
        let worked_hours: f64 = entry.shifts.iter().map(|c| config.shift_hours(c)).sum();
        let expected_hours = emp.contract_hours * expected_factor;
        let hours_deviation = worked_hours - expected_hours;

        let matrix_deviations = match baseline.and_then(|b| b.entry(&emp.id)) {
            Some(base) => entry
                .shifts
                .iter()
                .zip(&base.shifts)
                .filter(|(a, b)| a != b)
                .count(),
            None => 0,
        };

        hours_penalty += if hours_deviation < 0.0 {
            -hours_deviation * weights.hours_under
        } else {
            hours_deviation * weights.hours_over
        };
        rule_total += rule_violations;
        exclusion_total += exclusion_violations;
        matrix_total += matrix_deviations;

        employees.push(EmployeeReport {
            employee_id: emp.id.clone(),
            rule_violations,
            exclusion_violations,
            worked_hours,
            expected_hours,
            hours_deviation,
            matrix_deviations,
        });
    }

    let coverage = coverage_violations(roster, config);
    let coverage_total: usize = coverage.iter().map(|c| c.deviation.unsigned_abs() as usize).sum();

    let fitness = rule_total as f64 * weights.constraint_violation
        + coverage_total as f64 * weights.coverage_violation
        + exclusion_total as f64 * weights.exclusion_violation
        + hours_penalty
        + matrix_total as f64 * weights.matrix_change;

    Evaluation {
        fitness,
        is_valid: rule_total == 0 && coverage_total == 0 && exclusion_total == 0,
        rule_violation_total: rule_total,
        coverage_deviation_total: coverage_total,
        exclusion_total,
        matrix_deviation_total: matrix_total,
        employees,
        coverage,
    }
}

/// Exact-coverage misses per day and rule.
fn coverage_violations(roster: &Roster, config: &PlanningConfig) -> Vec<CoverageViolation> {
    let mut out = Vec::new();
    for day in 0..roster.days {
        for (rule_index, rule) in config.coverage_rules.iter().enumerate() {
            let actual = config
                .employees
                .iter()
                .filter_map(|e| roster.shift(&e.id, day))
                .filter(|code| rule.shifts.iter().any(|t| matches_shift(code, t)))
                .count() as u32;
            if actual != rule.min {
                let deviation = actual as i64 - rule.min as i64;
                out.push(CoverageViolation {
                    day,
                    rule_index,
                    required: rule.min,
                    actual,
                    deviation,
                    kind: if deviation < 0 {
                        CoverageKind::Under
                    } else {
                        CoverageKind::Over
                    },
                });
            }
        }
    }
    out
}

/// Roster quality summary for host display.
///
/// All values derive from an [`Evaluation`]; nothing here feeds back into
/// the optimiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterKpi {
    /// Hours worked across all employees.
    pub total_worked_hours: f64,
    /// Assignments per shift code.
    pub shift_counts: HashMap<String, usize>,
    /// Fraction of (day, rule) checks met exactly (1.0 = all).
    pub coverage_satisfaction: f64,
    pub is_valid: bool,
}

impl RosterKpi {
    /// Computes the summary for a scored roster.
    pub fn compute(roster: &Roster, config: &PlanningConfig, evaluation: &Evaluation) -> Self {
        let mut shift_counts: HashMap<String, usize> = HashMap::new();
        for emp in &config.employees {
            if let Some(entry) = roster.entry(&emp.id) {
                for code in &entry.shifts {
                    *shift_counts.entry(code.clone()).or_insert(0) += 1;
                }
            }
        }

        let checks = roster.days * config.coverage_rules.len();
        let coverage_satisfaction = if checks == 0 {
            1.0
        } else {
            (checks - evaluation.coverage.len()) as f64 / checks as f64
        };

        Self {
            total_worked_hours: evaluation.employees.iter().map(|e| e.worked_hours).sum(),
            shift_counts,
            coverage_satisfaction,
            is_valid: evaluation.is_valid,
        }
    }
}
