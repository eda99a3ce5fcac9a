//! Shift type model and shift identity matching.
//!
//! A shift type is an identity token (short code like `M`, `N`, `RP`) with
//! display hours. Hours may be 0 for non-working codes such as Rest or
//! Post-Night. The set of shift types is small and fixed per job.
//!
//! # Variant codes
//!
//! A shift id also matches its variant codes: `M` matches `M_1`, `M_2`, and
//! so on. Every place that tests shift identity (rules, exclusions,
//! coverage, hours, pattern deviation) goes through [`matches_shift`].

use serde::{Deserialize, Serialize};

/// A shift type: code, display label, and counted hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftType {
    /// Unique shift code.
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// Hours this shift contributes to worked time (may be 0).
    pub hours: f64,
}

impl ShiftType {
    /// Creates a shift type with no label and zero hours.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            hours: 0.0,
        }
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the counted hours.
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = hours;
        self
    }
}

/// Whether an assigned shift code matches a target shift id.
///
/// A code matches by equality or by the variant convention
/// `target + "_" + suffix`, so `M_1` matches target `M` but `MX` does not.
#[inline]
pub fn matches_shift(code: &str, target: &str) -> bool {
    if code == target {
        return true;
    }
    match code.strip_prefix(target) {
        Some(rest) => rest.starts_with('_'),
        None => false,
    }
}
