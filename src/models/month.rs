//! Target month calendar math.
//!
//! Weeks start on Monday (0 = Mon ... 6 = Sun); months are zero-based
//! (`0..=11`) to match the job wire format.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// The calendar month a job plans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSpan {
    /// Gregorian year.
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month: u32,
}

impl MonthSpan {
    /// Creates a month span, rejecting out-of-range months.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if month > 11 {
            return Err(PlanError::Execution(format!(
                "month must be 0..=11, got {month}"
            )));
        }
        // Reject years chrono cannot represent.
        if NaiveDate::from_ymd_opt(year, month + 1, 1).is_none() {
            return Err(PlanError::Execution(format!(
                "invalid calendar month {year}-{}",
                month + 1
            )));
        }
        Ok(Self { year, month })
    }

    fn first_day(&self) -> NaiveDate {
        // Validated in `new`.
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
            .expect("month span validated on construction")
    }

    /// Number of days in the month.
    pub fn days(&self) -> usize {
        let first = self.first_day();
        let next = if self.month == 11 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 2, 1)
        }
        .expect("successor month exists");
        (next - first).num_days() as usize
    }

    /// Monday-based weekday index of the month's first day (0 = Monday).
    pub fn first_weekday(&self) -> usize {
        self.first_day().weekday().num_days_from_monday() as usize
    }

    /// Fractional number of weeks in the month.
    pub fn weeks(&self) -> f64 {
        self.days() as f64 / 7.0
    }
}
