//! Input validation for planning jobs.
//!
//! Checks structural integrity of the configuration before any optimisation
//! starts. Detects:
//! - Duplicate IDs (employees, shift types, matrices)
//! - Dangling references (matrix bindings, rule and coverage shifts,
//!   exclusions)
//! - Empty or ragged matrix grids, undeclared cells
//! - Out-of-range values (month, coverage minimum, rule day counts)
//! - Matrices too small for their bound employees
//!
//! All problems are reported at once.

use std::collections::HashSet;

use crate::models::{PlanningConfig, RuleKind};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A rule, exclusion, coverage set or matrix cell references a shift
    /// that doesn't exist.
    UnknownShift,
    /// An employee references a matrix that doesn't exist.
    UnknownMatrix,
    /// A matrix has no cells.
    EmptyMatrix,
    /// A matrix grid has rows of different lengths.
    RaggedMatrix,
    /// A matrix snake is smaller than its bound employee count.
    MatrixTooSmall,
    /// A numeric field is outside its legal range.
    OutOfRange,
    /// A required collection is empty.
    MissingInput,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a planning configuration.
///
/// Returns `Ok(())` if all checks pass, `Err(errors)` with every detected
/// issue otherwise.
pub fn validate_config(config: &PlanningConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.month > 11 {
        errors.push(ValidationError::new(
            ValidationErrorKind::OutOfRange,
            format!("month must be 0..=11, got {}", config.month),
        ));
    }

    if config.shift_types.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingInput,
            "no shift types declared",
        ));
    }
    if config.matrices.is_empty() && !config.employees.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingInput,
            "no matrices declared",
        ));
    }

    let mut shift_ids = HashSet::new();
    for s in &config.shift_types {
        if !shift_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate shift id: {}", s.id),
            ));
        }
    }

    let mut matrix_ids = HashSet::new();
    for m in &config.matrices {
        if !matrix_ids.insert(m.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate matrix id: {}", m.id),
            ));
        }
        if m.snake_len() == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyMatrix,
                format!("matrix '{}' has no cells", m.id),
            ));
            continue;
        }
        let cols = m.cols();
        if m.grid.iter().any(|row| row.len() != cols) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RaggedMatrix,
                format!("matrix '{}' has rows of different lengths", m.id),
            ));
        }
        for row in &m.grid {
            for cell in row {
                if !config.has_shift(cell) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownShift,
                        format!("matrix '{}' uses undeclared shift '{}'", m.id, cell),
                    ));
                }
            }
        }
    }

    let mut employee_ids = HashSet::new();
    for e in &config.employees {
        if !employee_ids.insert(e.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate employee id: {}", e.id),
            ));
        }
        if let Some(mid) = &e.matrix_id {
            if !matrix_ids.contains(mid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownMatrix,
                    format!("employee '{}' references unknown matrix '{}'", e.id, mid),
                ));
            }
        }
        if e.contract_hours < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::OutOfRange,
                format!("employee '{}' has negative contract hours", e.id),
            ));
        }
        for excluded in &e.excluded_shifts {
            if !config.has_shift(excluded) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownShift,
                    format!("employee '{}' excludes unknown shift '{}'", e.id, excluded),
                ));
            }
        }
    }

    for m in &config.matrices {
        let bound = config.employees_for_matrix(&m.id).len();
        if m.snake_len() > 0 && bound > m.snake_len() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MatrixTooSmall,
                format!(
                    "matrix '{}' has {} cells for {} bound employees",
                    m.id,
                    m.snake_len(),
                    bound
                ),
            ));
        }
    }

    for (i, rule) in config.coverage_rules.iter().enumerate() {
        if rule.min < 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::OutOfRange,
                format!("coverage rule {i} requires min >= 1"),
            ));
        }
        if rule.shifts.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingInput,
                format!("coverage rule {i} has no shifts"),
            ));
        }
        for target in &rule.shifts {
            if !config.has_shift(target) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownShift,
                    format!("coverage rule {i} references unknown shift '{target}'"),
                ));
            }
        }
    }

    for rule in &config.rules {
        for target in rule_shift_refs(&rule.kind) {
            if !config.has_shift(target) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownShift,
                    format!("rule '{}' references unknown shift '{target}'", rule.id),
                ));
            }
        }
        if let Some(days) = rule_days(&rule.kind) {
            if days < 1 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OutOfRange,
                    format!("rule '{}' requires days >= 1", rule.id),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn rule_shift_refs(kind: &RuleKind) -> Vec<&str> {
    match kind {
        RuleKind::MustFollow { shift, successor }
        | RuleKind::CannotFollow { shift, successor } => vec![shift, successor],
        RuleKind::MustPrecede { shift, predecessor }
        | RuleKind::CannotPrecede { shift, predecessor } => vec![shift, predecessor],
        RuleKind::MaxConsecutive { shift, .. } | RuleKind::MaxConsecutiveWithout { shift, .. } => {
            vec![shift]
        }
        RuleKind::MinGap { shift, other, .. } => vec![shift, other],
    }
}

fn rule_days(kind: &RuleKind) -> Option<usize> {
    match kind {
        RuleKind::MaxConsecutive { days, .. }
        | RuleKind::MaxConsecutiveWithout { days, .. }
        | RuleKind::MinGap { days, .. } => Some(*days),
        _ => None,
    }
}
