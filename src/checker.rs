//! Sequence rule checker.
//!
//! Validates a shift sequence — one employee's month, or one matrix row —
//! against the sequencing rules, and answers the inverse question used to
//! bias mutation: which shifts could legally sit at a given position.
//!
//! Sequences are checked either as a line (a month has a first and a last
//! day) or as a ring (a matrix row wraps). In cyclic mode neighbour rules
//! wrap across both ends and runs are tracked across the boundary;
//! violations are reported once, at indices inside the original sequence.
//!
//! Complexity of [`validate`] is O(len * rules), with an extra `days`
//! factor for gap rules.

use crate::models::{matches_shift, RuleKind, SequenceRule};
use serde::Serialize;

/// Whether a sequence is checked as a line or as a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// First and last cells have no outside neighbour.
    Linear,
    /// The sequence wraps: the last cell precedes the first.
    Cyclic,
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    /// Index of the offending cell.
    pub day: usize,
    /// Id of the violated rule.
    pub rule_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Validates a sequence against the enabled rules.
///
/// Returns every violation found; the result does not depend on the order
/// of the rule list. Disabled rules are skipped.
pub fn validate(seq: &[String], rules: &[SequenceRule], wrap: Wrap) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    if seq.is_empty() {
        return violations;
    }

    for rule in rules.iter().filter(|r| r.enabled) {
        check_rule(seq, rule, wrap, &mut violations);
    }
    violations
}

fn check_rule(seq: &[String], rule: &SequenceRule, wrap: Wrap, out: &mut Vec<RuleViolation>) {
    let len = seq.len();
    let next = |i: usize| -> Option<usize> {
        match wrap {
            Wrap::Linear => (i + 1 < len).then_some(i + 1),
            Wrap::Cyclic => Some((i + 1) % len),
        }
    };
    let prev = |i: usize| -> Option<usize> {
        match wrap {
            Wrap::Linear => i.checked_sub(1),
            Wrap::Cyclic => Some((i + len - 1) % len),
        }
    };

    match &rule.kind {
        RuleKind::MustFollow { shift, successor } => {
            for i in 0..len {
                if !matches_shift(&seq[i], shift) {
                    continue;
                }
                if let Some(j) = next(i) {
                    if !matches_shift(&seq[j], successor) {
                        out.push(violation(
                            i,
                            rule,
                            format!("{} on day {} must be followed by {}", seq[i], i, successor),
                        ));
                    }
                }
            }
        }
        RuleKind::CannotFollow { shift, successor } => {
            for i in 0..len {
                if !matches_shift(&seq[i], shift) {
                    continue;
                }
                if let Some(j) = next(i) {
                    if matches_shift(&seq[j], successor) {
                        out.push(violation(
                            i,
                            rule,
                            format!("{} on day {} cannot be followed by {}", seq[i], i, seq[j]),
                        ));
                    }
                }
            }
        }
        RuleKind::MustPrecede { shift, predecessor } => {
            for i in 0..len {
                if !matches_shift(&seq[i], shift) {
                    continue;
                }
                if let Some(j) = prev(i) {
                    if !matches_shift(&seq[j], predecessor) {
                        out.push(violation(
                            i,
                            rule,
                            format!("{} on day {} must be preceded by {}", seq[i], i, predecessor),
                        ));
                    }
                }
            }
        }
        RuleKind::CannotPrecede { shift, predecessor } => {
            for i in 0..len {
                if !matches_shift(&seq[i], shift) {
                    continue;
                }
                if let Some(j) = prev(i) {
                    if matches_shift(&seq[j], predecessor) {
                        out.push(violation(
                            i,
                            rule,
                            format!("{} on day {} cannot be preceded by {}", seq[i], i, seq[j]),
                        ));
                    }
                }
            }
        }
        RuleKind::MaxConsecutive { shift, days } => {
            check_runs(seq, rule, wrap, *days, out, |cell| {
                matches_shift(cell, shift)
            });
        }
        RuleKind::MaxConsecutiveWithout { shift, days } => {
            check_runs(seq, rule, wrap, *days, out, |cell| {
                !matches_shift(cell, shift)
            });
        }
        RuleKind::MinGap { shift, other, days } => {
            let reach = (*days).min(len.saturating_sub(1));
            for i in 0..len {
                if !matches_shift(&seq[i], shift) {
                    continue;
                }
                for d in 1..=reach {
                    let j = match wrap {
                        Wrap::Linear => {
                            if i + d >= len {
                                break;
                            }
                            i + d
                        }
                        Wrap::Cyclic => (i + d) % len,
                    };
                    if matches_shift(&seq[j], other) {
                        out.push(violation(
                            i,
                            rule,
                            format!(
                                "{} on day {} needs a gap of {} days before {}",
                                seq[i], i, days, other
                            ),
                        ));
                        break;
                    }
                }
            }
        }
    }
}

/// Reports runs of matching cells longer than `max_days`, once per run, at
/// the first index where the run exceeds its bound.
///
/// In cyclic mode the scan walks the sequence twice so runs crossing the
/// wrap are seen whole; runs that start in the second lap are duplicates
/// of already-counted runs and are skipped.
fn check_runs<F>(
    seq: &[String],
    rule: &SequenceRule,
    wrap: Wrap,
    max_days: usize,
    out: &mut Vec<RuleViolation>,
    matches: F,
) where
    F: Fn(&str) -> bool,
{
    let len = seq.len();
    let limit = match wrap {
        Wrap::Linear => len,
        Wrap::Cyclic => 2 * len,
    };

    let mut run_start: Option<usize> = None;
    for v in 0..limit {
        if matches(&seq[v % len]) {
            let start = *run_start.get_or_insert(v);
            let run_len = v - start + 1;
            if run_len == max_days + 1 && start < len {
                out.push(violation(
                    v % len,
                    rule,
                    format!("run exceeds {} consecutive day(s)", max_days),
                ));
            }
            // A full ring never ends; one report is enough.
            if run_len >= 2 * len {
                break;
            }
        } else {
            run_start = None;
        }
    }
}

fn violation(day: usize, rule: &SequenceRule, message: String) -> RuleViolation {
    RuleViolation {
        day,
        rule_id: rule.id.clone(),
        message,
    }
}

/// Width of the probe window around a mutation candidate.
fn window_width(len: usize) -> usize {
    (2 * len).min(14).max(1)
}

/// Shifts that can legally be placed at `position` in a linear sequence.
///
/// Each candidate is tried inside a test window of width `min(2*len, 14)`
/// centred on `position`; it passes when no violation lands within one
/// cell of the candidate. An empty result means the position is fully
/// constrained and the caller should fall back to an unbiased draw.
pub fn valid_next_shifts(
    seq: &[String],
    position: usize,
    rules: &[SequenceRule],
    candidates: &[String],
) -> Vec<String> {
    if seq.is_empty() || position >= seq.len() {
        return Vec::new();
    }
    let len = seq.len();
    let width = window_width(len);
    let start = position
        .saturating_sub(width / 2)
        .min(len.saturating_sub(width));
    let end = (start + width).min(len);
    let centre = position - start;

    let mut window: Vec<String> = seq[start..end].to_vec();
    candidates
        .iter()
        .filter(|cand| {
            window[centre] = (*cand).clone();
            passes_near(&window, rules, centre)
        })
        .cloned()
        .collect()
}

/// Cyclic variant of [`valid_next_shifts`]: the row is a ring and the test
/// window wraps across both ends.
pub fn valid_next_shifts_cyclic(
    row: &[String],
    position: usize,
    rules: &[SequenceRule],
    candidates: &[String],
) -> Vec<String> {
    if row.is_empty() {
        return Vec::new();
    }
    let len = row.len();
    let position = position % len;
    let width = window_width(len);
    let half = width / 2;
    let centre = half;

    // window[k] mirrors ring position (position - half + k).
    let mut window: Vec<String> = (0..width)
        .map(|k| row[(position + len - (half % len) + k) % len].clone())
        .collect();

    candidates
        .iter()
        .filter(|cand| {
            // When the window laps the ring more than once the candidate
            // cell appears at every congruent index.
            for k in 0..width {
                if k % len == centre % len {
                    window[k] = (*cand).clone();
                }
            }
            passes_near(&window, rules, centre)
        })
        .cloned()
        .collect()
}

fn passes_near(window: &[String], rules: &[SequenceRule], centre: usize) -> bool {
    validate(window, rules, Wrap::Linear)
        .iter()
        .all(|v| v.day.abs_diff(centre) > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SequenceRule;

    fn seq(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_must_follow_linear_last_exempt() {
        let rules = vec![SequenceRule::must_follow("r", "N", "SN")];
        // Last cell has no successor in linear mode.
        let v = validate(&seq(&["N", "SN", "M", "N"]), &rules, Wrap::Linear);
        assert!(v.is_empty());

        let v = validate(&seq(&["N", "M"]), &rules, Wrap::Linear);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 0);
        assert_eq!(v[0].rule_id, "r");
    }

    #[test]
    fn test_must_follow_cyclic_wraps() {
        let rules = vec![SequenceRule::must_follow("r", "N", "SN")];
        // N at the end must see SN at index 0 when the row is a ring.
        assert!(validate(&seq(&["SN", "M", "N"]), &rules, Wrap::Cyclic).is_empty());
        let v = validate(&seq(&["M", "SN", "N"]), &rules, Wrap::Cyclic);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 2);
    }

    #[test]
    fn test_cannot_follow_cyclic_wrap_violation() {
        // Linear clean, exactly one cyclic violation at the wrap index.
        let row = seq(&["M", "P", "M", "P", "M", "P", "N"]);
        let rules = vec![SequenceRule::cannot_follow("r", "N", "M")];
        assert!(validate(&row, &rules, Wrap::Linear).is_empty());
        let v = validate(&row, &rules, Wrap::Cyclic);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 6);
    }

    #[test]
    fn test_precede_rules() {
        let rules = vec![
            SequenceRule::must_precede("mp", "SN", "N"),
            SequenceRule::cannot_precede("cp", "M", "N"),
        ];
        // SN at 0 has no predecessor in linear mode; M at 2 is preceded by N.
        let v = validate(&seq(&["SN", "N", "M"]), &rules, Wrap::Linear);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].rule_id, "cp");
        assert_eq!(v[0].day, 2);

        // Cyclically SN at 0 is preceded by M: must_precede fires too.
        let v = validate(&seq(&["SN", "N", "M"]), &rules, Wrap::Cyclic);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_max_consecutive() {
        let rules = vec![SequenceRule::max_consecutive("r", "N", 2)];
        assert!(validate(&seq(&["N", "N", "M", "N"]), &rules, Wrap::Linear).is_empty());

        let v = validate(&seq(&["N", "N", "N", "N", "M"]), &rules, Wrap::Linear);
        // One violation per run, at the first excess index.
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 2);
    }

    #[test]
    fn test_max_consecutive_cyclic_wrap_run() {
        // Run of 3 N crosses the ring boundary: N N M M N.
        let rules = vec![SequenceRule::max_consecutive("r", "N", 2)];
        let row = seq(&["N", "N", "M", "M", "N"]);
        assert!(validate(&row, &rules, Wrap::Linear).is_empty());
        let v = validate(&row, &rules, Wrap::Cyclic);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 1); // wrapped index of the third N
    }

    #[test]
    fn test_max_consecutive_full_ring() {
        let rules = vec![SequenceRule::max_consecutive("r", "N", 2)];
        let v = validate(&seq(&["N", "N", "N"]), &rules, Wrap::Cyclic);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_max_consecutive_without() {
        // At most 5 days without a rest shift.
        let rules = vec![SequenceRule::max_consecutive_without("r", "RP", 5)];
        let ok = seq(&["M", "M", "M", "M", "M", "RP", "M"]);
        assert!(validate(&ok, &rules, Wrap::Linear).is_empty());

        let bad = seq(&["M", "M", "M", "M", "M", "M", "RP"]);
        let v = validate(&bad, &rules, Wrap::Linear);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 5);
    }

    #[test]
    fn test_min_gap() {
        let rules = vec![SequenceRule::min_gap("r", "N", "M", 2)];
        // M two days after N is still inside the gap.
        let v = validate(&seq(&["N", "RP", "M", "P"]), &rules, Wrap::Linear);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].day, 0);

        assert!(validate(&seq(&["N", "RP", "RP", "M"]), &rules, Wrap::Linear).is_empty());
    }

    #[test]
    fn test_variant_codes_match_in_rules() {
        let rules = vec![SequenceRule::cannot_follow("r", "N", "M")];
        let v = validate(&seq(&["N_1", "M_2"]), &rules, Wrap::Linear);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let rules = vec![SequenceRule::cannot_follow("r", "N", "M").with_enabled(false)];
        assert!(validate(&seq(&["N", "M"]), &rules, Wrap::Linear).is_empty());
    }

    #[test]
    fn test_rule_order_insensitive() {
        let a = vec![
            SequenceRule::cannot_follow("c", "N", "M"),
            SequenceRule::max_consecutive("m", "N", 1),
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        let s = seq(&["N", "N", "M", "N", "M"]);
        let mut va = validate(&s, &a, Wrap::Linear);
        let mut vb = validate(&s, &b, Wrap::Linear);
        va.sort_by(|x, y| (x.day, &x.rule_id).cmp(&(y.day, &y.rule_id)));
        vb.sort_by(|x, y| (x.day, &x.rule_id).cmp(&(y.day, &y.rule_id)));
        assert_eq!(va, vb);
    }

    #[test]
    fn test_empty_sequence() {
        let rules = vec![SequenceRule::must_follow("r", "N", "SN")];
        assert!(validate(&[], &rules, Wrap::Linear).is_empty());
        assert!(validate(&[], &rules, Wrap::Cyclic).is_empty());
    }

    #[test]
    fn test_valid_next_shifts_filters_bad_neighbours() {
        let rules = vec![SequenceRule::cannot_follow("r", "N", "M")];
        let s = seq(&["N", "P", "P", "P"]);
        let cands = seq(&["M", "P", "RP"]);
        // Position 1 sits right after N: M is out.
        let ok = valid_next_shifts(&s, 1, &rules, &cands);
        assert_eq!(ok, seq(&["P", "RP"]));
    }

    #[test]
    fn test_valid_next_shifts_fully_constrained() {
        let rules = vec![
            SequenceRule::cannot_follow("a", "N", "M"),
            SequenceRule::cannot_follow("b", "N", "P"),
        ];
        let s = seq(&["N", "M", "N"]);
        let cands = seq(&["M", "P"]);
        assert!(valid_next_shifts(&s, 1, &rules, &cands).is_empty());
    }

    #[test]
    fn test_valid_next_shifts_cyclic_respects_wrap() {
        let rules = vec![SequenceRule::cannot_follow("r", "N", "M")];
        let row = seq(&["P", "P", "N"]);
        let cands = seq(&["M", "P"]);
        // Position 0 follows the trailing N on the ring: M is out.
        let ok = valid_next_shifts_cyclic(&row, 0, &rules, &cands);
        assert_eq!(ok, seq(&["P"]));
    }
}
