//! Monthly roster (solution) model.
//!
//! A roster maps each employee to one shift code per day of the target
//! month, plus placement metadata: which matrix row and snake offset the
//! month was unravelled from, how well it continued the previous month,
//! and whether it came out of the greedy builder or the optimiser.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a roster entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSource {
    /// Deterministic unravelling of the cyclic matrix.
    Greedy,
    /// Output of the genetic optimiser.
    Evolved,
}

/// One employee's month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSchedule {
    /// One shift code per day of the month.
    pub shifts: Vec<String>,
    /// Matrix row the month was anchored on.
    pub matrix_row: usize,
    /// Snake offset within the row at the first day of the month.
    pub day_offset: usize,
    /// Fraction of the previous-month tail the anchor reproduced (0 when
    /// there was no usable history).
    pub continuity_score: f64,
    /// Producer of this entry.
    pub source: ScheduleSource,
}

impl EmployeeSchedule {
    /// Creates a greedy entry with default placement metadata.
    pub fn new(shifts: Vec<String>) -> Self {
        Self {
            shifts,
            matrix_row: 0,
            day_offset: 0,
            continuity_score: 0.0,
            source: ScheduleSource::Greedy,
        }
    }

    /// Sets the placement metadata.
    pub fn with_placement(mut self, row: usize, offset: usize, continuity: f64) -> Self {
        self.matrix_row = row;
        self.day_offset = offset;
        self.continuity_score = continuity;
        self
    }
}

/// A complete monthly schedule: one entry per employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    /// Days in the target month.
    pub days: usize,
    /// Entries keyed by employee id.
    pub entries: HashMap<String, EmployeeSchedule>,
}

impl Roster {
    /// Creates an empty roster for a month of `days` days.
    pub fn new(days: usize) -> Self {
        Self {
            days,
            entries: HashMap::new(),
        }
    }

    /// Inserts an entry.
    pub fn insert(&mut self, employee_id: impl Into<String>, entry: EmployeeSchedule) {
        self.entries.insert(employee_id.into(), entry);
    }

    /// The entry for an employee.
    pub fn entry(&self, employee_id: &str) -> Option<&EmployeeSchedule> {
        self.entries.get(employee_id)
    }

    /// The shift assigned to an employee on a day.
    pub fn shift(&self, employee_id: &str, day: usize) -> Option<&str> {
        self.entries
            .get(employee_id)
            .and_then(|e| e.shifts.get(day))
            .map(String::as_str)
    }

    /// Overwrites one assignment.
    ///
    /// No-op when the employee or day is unknown.
    pub fn set_shift(&mut self, employee_id: &str, day: usize, code: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(employee_id) {
            if let Some(cell) = entry.shifts.get_mut(day) {
                *cell = code.into();
            }
        }
    }

    /// Number of scheduled employees.
    pub fn employee_count(&self) -> usize {
        self.entries.len()
    }

    /// Marks every entry with a producer.
    pub fn set_source(&mut self, source: ScheduleSource) {
        for entry in self.entries.values_mut() {
            entry.source = source;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Roster {
        let mut r = Roster::new(3);
        r.insert(
            "e1",
            EmployeeSchedule::new(vec!["M".into(), "P".into(), "N".into()])
                .with_placement(1, 2, 0.5),
        );
        r
    }

    #[test]
    fn test_roster_access() {
        let r = sample();
        assert_eq!(r.days, 3);
        assert_eq!(r.employee_count(), 1);
        assert_eq!(r.shift("e1", 1), Some("P"));
        assert_eq!(r.shift("e1", 3), None);
        assert_eq!(r.shift("e2", 0), None);
    }

    #[test]
    fn test_set_shift() {
        let mut r = sample();
        r.set_shift("e1", 1, "RP");
        assert_eq!(r.shift("e1", 1), Some("RP"));
        // Unknown targets are ignored.
        r.set_shift("e2", 0, "M");
        assert_eq!(r.employee_count(), 1);
    }

    #[test]
    fn test_placement_metadata() {
        let r = sample();
        let e = r.entry("e1").unwrap();
        assert_eq!(e.matrix_row, 1);
        assert_eq!(e.day_offset, 2);
        assert!((e.continuity_score - 0.5).abs() < 1e-10);
        assert_eq!(e.source, ScheduleSource::Greedy);
    }

    #[test]
    fn test_set_source() {
        let mut r = sample();
        r.set_source(ScheduleSource::Evolved);
        assert_eq!(r.entry("e1").unwrap().source, ScheduleSource::Evolved);
    }
}
