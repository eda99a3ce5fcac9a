//! Sequencing rules and coverage rules.
//!
//! Sequencing rules constrain an individual employee's timeline: which
//! shift must or must not neighbour which, how long runs may get, and
//! minimum gaps between codes. Coverage rules fix the daily headcount per
//! shift category.

use serde::{Deserialize, Serialize};

/// A rule over one employee's shift sequence.
///
/// Carries a stable id and an `enabled` flag; disabled rules are skipped
/// everywhere. Shift references follow the variant-code convention of
/// [`matches_shift`](crate::models::matches_shift).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRule {
    /// Stable rule identifier.
    pub id: String,
    /// Whether the rule participates in validation.
    pub enabled: bool,
    /// The rule payload.
    pub kind: RuleKind,
}

/// The seven rule kinds, each with exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Every `shift` must be immediately followed by `successor`.
    MustFollow { shift: String, successor: String },
    /// `successor` may never come immediately after `shift`.
    CannotFollow { shift: String, successor: String },
    /// Every `shift` must be immediately preceded by `predecessor`.
    MustPrecede { shift: String, predecessor: String },
    /// `predecessor` may never come immediately before `shift`.
    CannotPrecede { shift: String, predecessor: String },
    /// No run of consecutive `shift` cells may exceed `days`.
    MaxConsecutive { shift: String, days: usize },
    /// No run of consecutive cells *without* `shift` may exceed `days`.
    MaxConsecutiveWithout { shift: String, days: usize },
    /// After a `shift` cell, no `other` may appear within the next `days` cells.
    MinGap {
        shift: String,
        other: String,
        days: usize,
    },
}

impl SequenceRule {
    fn new(id: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            kind,
        }
    }

    /// Creates a must-follow rule.
    pub fn must_follow(
        id: impl Into<String>,
        shift: impl Into<String>,
        successor: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::MustFollow {
                shift: shift.into(),
                successor: successor.into(),
            },
        )
    }

    /// Creates a cannot-follow rule.
    pub fn cannot_follow(
        id: impl Into<String>,
        shift: impl Into<String>,
        successor: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::CannotFollow {
                shift: shift.into(),
                successor: successor.into(),
            },
        )
    }

    /// Creates a must-precede rule.
    pub fn must_precede(
        id: impl Into<String>,
        shift: impl Into<String>,
        predecessor: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::MustPrecede {
                shift: shift.into(),
                predecessor: predecessor.into(),
            },
        )
    }

    /// Creates a cannot-precede rule.
    pub fn cannot_precede(
        id: impl Into<String>,
        shift: impl Into<String>,
        predecessor: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::CannotPrecede {
                shift: shift.into(),
                predecessor: predecessor.into(),
            },
        )
    }

    /// Creates a max-consecutive rule.
    pub fn max_consecutive(id: impl Into<String>, shift: impl Into<String>, days: usize) -> Self {
        Self::new(
            id,
            RuleKind::MaxConsecutive {
                shift: shift.into(),
                days,
            },
        )
    }

    /// Creates a max-consecutive-without rule.
    pub fn max_consecutive_without(
        id: impl Into<String>,
        shift: impl Into<String>,
        days: usize,
    ) -> Self {
        Self::new(
            id,
            RuleKind::MaxConsecutiveWithout {
                shift: shift.into(),
                days,
            },
        )
    }

    /// Creates a min-gap rule.
    pub fn min_gap(
        id: impl Into<String>,
        shift: impl Into<String>,
        other: impl Into<String>,
        days: usize,
    ) -> Self {
        Self::new(
            id,
            RuleKind::MinGap {
                shift: shift.into(),
                other: other.into(),
                days,
            },
        )
    }

    /// Disables or enables the rule.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A daily headcount rule over a set of shift codes.
///
/// For every day, the total number of assignments whose code is in
/// `shifts` must equal `min` exactly. The field keeps its historical name;
/// both under- and over-coverage are penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRule {
    /// Required daily headcount (>= 1).
    pub min: u32,
    /// Shift codes counted by this rule (non-empty).
    pub shifts: Vec<String>,
}

impl CoverageRule {
    /// Creates a coverage rule.
    pub fn new<I, S>(min: u32, shifts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            min,
            shifts: shifts.into_iter().map(Into::into).collect(),
        }
    }
}
