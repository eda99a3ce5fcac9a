//! Employee model.

use serde::{Deserialize, Serialize};

use super::shift::{matches_shift, ShiftType};

/// An employee to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique employee identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contractual hours per week.
    pub contract_hours: f64,
    /// Shift codes this employee can never work.
    #[serde(default)]
    pub excluded_shifts: Vec<String>,
    /// Cyclic pattern this employee follows. `None` binds to the default
    /// (first declared) matrix.
    #[serde(default)]
    pub matrix_id: Option<String>,
}

impl Employee {
    /// Creates an employee with a 40-hour contract and no exclusions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            contract_hours: 40.0,
            excluded_shifts: Vec::new(),
            matrix_id: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the weekly contract hours.
    pub fn with_contract_hours(mut self, hours: f64) -> Self {
        self.contract_hours = hours;
        self
    }

    /// Adds an excluded shift code.
    pub fn with_excluded_shift(mut self, shift: impl Into<String>) -> Self {
        self.excluded_shifts.push(shift.into());
        self
    }

    /// Adds several excluded shift codes.
    pub fn with_excluded_shifts<I, S>(mut self, shifts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_shifts.extend(shifts.into_iter().map(Into::into));
        self
    }

    /// Binds the employee to a matrix.
    pub fn with_matrix(mut self, matrix_id: impl Into<String>) -> Self {
        self.matrix_id = Some(matrix_id.into());
        self
    }

    /// Whether a shift code is excluded for this employee.
    ///
    /// Exclusions follow the variant convention: excluding `N` also
    /// excludes `N_1`.
    pub fn is_excluded(&self, code: &str) -> bool {
        self.excluded_shifts.iter().any(|x| matches_shift(code, x))
    }

    /// Shift ids this employee may work, in declaration order.
    pub fn allowed_shifts<'a>(&self, shift_types: &'a [ShiftType]) -> Vec<&'a str> {
        shift_types
            .iter()
            .filter(|s| !self.is_excluded(&s.id))
            .map(|s| s.id.as_str())
            .collect()
    }
}
