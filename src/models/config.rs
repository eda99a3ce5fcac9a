//! Planning job configuration.
//!
//! The configuration is a forest: employees reference matrices by id and
//! nothing points back. It is immutable for the duration of a job; all
//! lookups go through the helpers here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::employee::Employee;
use super::matrix::ShiftMatrix;
use super::month::MonthSpan;
use super::rule::{CoverageRule, SequenceRule};
use super::shift::{matches_shift, ShiftType};
use crate::error::Result;

/// Everything a scheduling job needs to know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningConfig {
    /// Gregorian year of the target month.
    pub year: i32,
    /// Zero-based target month (0 = January).
    pub month: u32,
    /// Employees to schedule.
    pub employees: Vec<Employee>,
    /// Declared shift types.
    pub shift_types: Vec<ShiftType>,
    /// Cyclic base patterns.
    pub matrices: Vec<ShiftMatrix>,
    /// Daily headcount rules.
    #[serde(default)]
    pub coverage_rules: Vec<CoverageRule>,
    /// Per-employee sequencing rules.
    #[serde(default)]
    pub rules: Vec<SequenceRule>,
    /// Previous-month shifts by employee id, used for continuity.
    #[serde(default)]
    pub previous_month_schedule: HashMap<String, Vec<String>>,
}

impl PlanningConfig {
    /// The target month.
    pub fn month_span(&self) -> Result<MonthSpan> {
        MonthSpan::new(self.year, self.month)
    }

    /// Enabled sequencing rules.
    pub fn enabled_rules(&self) -> Vec<SequenceRule> {
        self.rules.iter().filter(|r| r.enabled).cloned().collect()
    }

    /// The matrix an employee is bound to (explicit binding, else the
    /// first declared matrix).
    pub fn matrix_for(&self, employee: &Employee) -> Option<&ShiftMatrix> {
        match &employee.matrix_id {
            Some(id) => self.matrices.iter().find(|m| &m.id == id),
            None => self.matrices.first(),
        }
    }

    /// Employees bound to a matrix, in declaration order.
    ///
    /// Employees without an explicit binding belong to the first declared
    /// matrix.
    pub fn employees_for_matrix(&self, matrix_id: &str) -> Vec<&Employee> {
        let default_id = self.matrices.first().map(|m| m.id.as_str());
        self.employees
            .iter()
            .filter(|e| match &e.matrix_id {
                Some(id) => id == matrix_id,
                None => default_id == Some(matrix_id),
            })
            .collect()
    }

    /// Whether a shift id is declared (directly or as a variant base).
    pub fn has_shift(&self, target: &str) -> bool {
        self.shift_types.iter().any(|s| matches_shift(s.id.as_str(), target) || matches_shift(target, s.id.as_str()))
    }

    /// Counted hours for an assigned code: exact shift type first, then
    /// the variant base (`M_1` falls back to `M`). Unknown codes count 0.
    pub fn shift_hours(&self, code: &str) -> f64 {
        if let Some(s) = self.shift_types.iter().find(|s| s.id == code) {
            return s.hours;
        }
        self.shift_types
            .iter()
            .find(|s| matches_shift(code, &s.id))
            .map(|s| s.hours)
            .unwrap_or(0.0)
    }

    /// All declared shift ids, in declaration order.
    pub fn shift_ids(&self) -> Vec<String> {
        self.shift_types.iter().map(|s| s.id.clone()).collect()
    }

    /// The previous-month shifts for an employee, if any were supplied.
    pub fn history_for(&self, employee_id: &str) -> Option<&[String]> {
        self.previous_month_schedule
            .get(employee_id)
            .filter(|h| !h.is_empty())
            .map(Vec::as_slice)
    }
}
