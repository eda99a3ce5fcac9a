//! Greedy baseline builder.
//!
//! Deterministically derives one month of shifts from the cyclic matrices,
//! the previous-month history and the calendar.
//!
//! # Algorithm
//!
//! 1. Flatten each matrix row-major into its cyclic *snake*.
//! 2. Anchor each employee in the snake: with history, at the position
//!    that best continues the previous month (continuity scoring over the
//!    last `min(history, 28)` days); without history, at a calendar
//!    default staggered across rows and phase-shifted to the month's
//!    first weekday.
//! 3. Synchronise phases globally: when at least two well-matched
//!    histories project to the same column phase, every history-bearing
//!    employee is re-anchored at that phase.
//! 4. Unravel day by day, then repair exclusions with contemporaneous
//!    same-day swaps, which keeps the daily coverage balance intact.
//!
//! The result is bit-identical for equal configuration and seed.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::error::{PlanError, Result};
use crate::models::{
    Employee, EmployeeSchedule, PlanningConfig, Roster, ShiftMatrix, matches_shift,
};

/// Continuity votes below this score do not count.
const RELIABLE_SCORE: f64 = 0.4;
/// Continuity looks at most this far back into the previous month.
const MAX_HISTORY_DAYS: usize = 28;
/// Votes needed for a global phase to win.
const MIN_PHASE_VOTES: usize = 2;

/// A candidate anchor in a matrix snake.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    row: usize,
    /// Offset within the row at the first day of the month; day `d` reads
    /// the snake at `(row * cols + offset + d) mod len`.
    offset: usize,
    score: f64,
}

/// Builds the baseline roster for the configured month.
pub fn build(config: &PlanningConfig, rng: &mut SmallRng) -> Result<Roster> {
    let span = config.month_span()?;
    let days = span.days();
    let phase = span.first_weekday();

    let mut roster = Roster::new(days);
    if config.employees.is_empty() {
        return Ok(roster);
    }

    // Group employees by matrix, keeping declaration order.
    let mut groups: Vec<(&ShiftMatrix, Vec<&Employee>)> = Vec::new();
    for matrix in &config.matrices {
        let bound = config.employees_for_matrix(&matrix.id);
        if bound.is_empty() {
            continue;
        }
        if matrix.snake_len() == 0 {
            return Err(PlanError::NoValidBaseline(format!(
                "matrix '{}' has no cells",
                matrix.id
            )));
        }
        groups.push((matrix, bound));
    }
    for emp in &config.employees {
        if config.matrix_for(emp).is_none() {
            return Err(PlanError::NoValidBaseline(format!(
                "employee '{}' is bound to no matrix",
                emp.id
            )));
        }
    }

    // First pass: best unforced anchors, and phase votes across all
    // matrices.
    let mut votes: HashMap<usize, usize> = HashMap::new();
    let mut best_by_emp: HashMap<&str, Anchor> = HashMap::new();
    for (matrix, bound) in &groups {
        for emp in bound {
            let Some(history) = config.history_for(&emp.id) else {
                continue;
            };
            let k = history.len().min(MAX_HISTORY_DAYS);
            let tail = &history[history.len() - k..];
            let candidates = row_anchors(matrix, tail, None);
            if let Some(best) = candidates
                .iter()
                .copied()
                .max_by(|a, b| a.score.total_cmp(&b.score))
            {
                if best.score >= RELIABLE_SCORE {
                    *votes.entry(best.offset % matrix.cols()).or_insert(0) += 1;
                }
                best_by_emp.insert(emp.id.as_str(), best);
            }
        }
    }

    // Smallest phase wins ties, so equal configurations agree.
    let dominant = votes
        .iter()
        .max_by_key(|(p, n)| (**n, usize::MAX - **p))
        .filter(|(_, n)| **n >= MIN_PHASE_VOTES)
        .map(|(p, _)| *p);

    // Second pass: anchor every employee and unravel.
    for (matrix, bound) in &groups {
        let rows = matrix.rows();
        let cols = matrix.cols();
        let capacity = bound.len().div_ceil(rows);

        if phase != 0 && matrix.snake_len() % 7 != 0 {
            warn!(
                matrix = matrix.id.as_str(),
                snake_len = matrix.snake_len(),
                phase,
                "snake length is not a multiple of 7; calendar phase drifts across cycles"
            );
        }

        // Rank history-bearing employees for capacity assignment.
        let mut ranked: Vec<(usize, Vec<Anchor>, f64)> = Vec::new();
        let mut defaults: Vec<usize> = Vec::new();
        for (idx, emp) in bound.iter().enumerate() {
            let best = best_by_emp.get(emp.id.as_str()).copied();
            let reliable = match (dominant, best) {
                // A dominant phase only re-anchors well-matched histories.
                (Some(_), Some(b)) => b.score >= RELIABLE_SCORE,
                (None, Some(_)) => true,
                _ => false,
            };
            if !reliable {
                defaults.push(idx);
                continue;
            }
            let history = config.history_for(&emp.id).expect("checked above");
            let k = history.len().min(MAX_HISTORY_DAYS);
            let tail = &history[history.len() - k..];
            let mut anchors = row_anchors(matrix, tail, dominant);
            anchors.sort_by(|a, b| b.score.total_cmp(&a.score));
            let top = anchors.first().map(|a| a.score).unwrap_or(0.0);
            ranked.push((idx, anchors, top));
        }
        ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut usage = vec![0usize; rows];
        let mut assigned: HashMap<usize, Anchor> = HashMap::new();
        for (idx, anchors, _) in &ranked {
            let anchor = anchors
                .iter()
                .find(|a| usage[a.row] < capacity)
                .or_else(|| anchors.first())
                .copied();
            if let Some(a) = anchor {
                usage[a.row] += 1;
                assigned.insert(*idx, a);
            } else {
                defaults.push(*idx);
            }
        }

        for (idx, emp) in bound.iter().enumerate() {
            let anchor = assigned.get(&idx).copied().unwrap_or(Anchor {
                // Calendar default: stagger across rows, then along the
                // row when rows are shared, and apply the month phase.
                row: idx % rows,
                offset: (idx / rows + phase) % matrix.snake_len(),
                score: 0.0,
            });
            let shifts: Vec<String> = (0..days)
                .map(|d| {
                    matrix
                        .snake_at(anchor.row * cols + anchor.offset + d)
                        .to_string()
                })
                .collect();
            roster.insert(
                emp.id.clone(),
                EmployeeSchedule::new(shifts).with_placement(
                    anchor.row,
                    anchor.offset,
                    anchor.score,
                ),
            );
        }
    }

    swap_out_exclusions(&mut roster, config, rng);
    Ok(roster)
}

/// Best anchor per row for a history tail, optionally forced to a column
/// phase.
///
/// The anchor offset is already projected past the tail: an employee whose
/// last `k` days sat at `(row, o)` starts the new month at offset `o + k`.
fn row_anchors(matrix: &ShiftMatrix, tail: &[String], forced_phase: Option<usize>) -> Vec<Anchor> {
    let rows = matrix.rows();
    let cols = matrix.cols();
    let len = matrix.snake_len();
    let k = tail.len();

    let mut anchors = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut best: Option<Anchor> = None;
        for o in 0..cols {
            if let Some(p) = forced_phase {
                if (o + k) % cols != p {
                    continue;
                }
            }
            let matched = (0..k)
                .filter(|&t| matches_shift(&tail[t], matrix.snake_at(row * cols + o + t)))
                .count();
            let score = matched as f64 / k as f64;
            if best.map(|b| score > b.score).unwrap_or(true) {
                best = Some(Anchor {
                    row,
                    offset: (o + k) % len,
                    score,
                });
            }
        }
        if let Some(b) = best {
            anchors.push(b);
        }
    }
    anchors
}

/// Repairs excluded-shift assignments day by day.
///
/// Conflicted employees are processed in shuffled order; each looks for a
/// same-day partner such that both can work the other's shift, and swaps.
/// Without a partner the cell falls back to the first shift type the
/// employee may work. A cell stays only when no allowed shift exists at
/// all.
fn swap_out_exclusions(roster: &mut Roster, config: &PlanningConfig, rng: &mut SmallRng) {
    for day in 0..roster.days {
        let mut conflicts: Vec<usize> = config
            .employees
            .iter()
            .enumerate()
            .filter(|(_, emp)| {
                roster
                    .shift(&emp.id, day)
                    .map(|code| emp.is_excluded(code))
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();
        conflicts.shuffle(rng);

        for i in conflicts {
            let focal = &config.employees[i];
            let Some(focal_shift) = roster.shift(&focal.id, day).map(str::to_string) else {
                continue;
            };
            // An earlier swap this day may already have fixed this cell.
            if !focal.is_excluded(&focal_shift) {
                continue;
            }

            let partner = config.employees.iter().enumerate().find(|(j, other)| {
                if *j == i {
                    return false;
                }
                match roster.shift(&other.id, day) {
                    Some(other_shift) => {
                        !focal.is_excluded(other_shift) && !other.is_excluded(&focal_shift)
                    }
                    None => false,
                }
            });

            match partner {
                Some((_, other)) => {
                    let other_shift = roster
                        .shift(&other.id, day)
                        .expect("partner has a shift")
                        .to_string();
                    let other_id = other.id.clone();
                    roster.set_shift(&focal.id, day, other_shift);
                    roster.set_shift(&other_id, day, focal_shift);
                }
                None => {
                    if let Some(fallback) = config
                        .shift_types
                        .iter()
                        .find(|s| !focal.is_excluded(&s.id))
                    {
                        let code = fallback.id.clone();
                        roster.set_shift(&focal.id, day, code);
                    }
                }
            }
        }
    }
}
