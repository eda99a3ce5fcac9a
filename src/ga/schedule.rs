//! Schedule optimisation problem.
//!
//! The chromosome is a full monthly roster. Individual 0 of every
//! population is the untouched greedy baseline; the rest are increasingly
//! perturbed copies of it. Guided mutation pulls drifted cells back toward
//! the baseline, which is what keeps evolved schedules recognisably close
//! to the cyclic pattern.

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::runner::GaProblem;
use crate::checker::valid_next_shifts;
use crate::evaluator::{evaluate, FitnessWeights};
use crate::models::{PlanningConfig, Roster};

/// How two parent rosters are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterCrossover {
    /// Whole employee rows from either parent.
    Employee,
    /// One day cut point; left from A, right from B.
    SinglePoint,
    /// Every cell from either parent.
    Uniform,
}

/// How offspring are mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterMutation {
    /// Same-day swaps plus baseline reversion (the default pairing).
    Guided,
    /// Independent per-cell replacement.
    Point,
}

/// GA problem for evolving a monthly roster from a greedy baseline.
pub struct ScheduleProblem<'a> {
    config: &'a PlanningConfig,
    baseline: &'a Roster,
    weights: FitnessWeights,
    crossover_type: RosterCrossover,
    mutation_type: RosterMutation,
    baseline_adherence: f64,
    /// Allowed shift ids per employee (config order).
    allowed: Vec<Vec<String>>,
}

impl<'a> ScheduleProblem<'a> {
    /// Creates the problem from a baseline roster.
    pub fn new(config: &'a PlanningConfig, baseline: &'a Roster) -> Self {
        let allowed = config
            .employees
            .iter()
            .map(|e| {
                e.allowed_shifts(&config.shift_types)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        Self {
            config,
            baseline,
            weights: FitnessWeights::default(),
            crossover_type: RosterCrossover::Employee,
            mutation_type: RosterMutation::Guided,
            baseline_adherence: 0.7,
            allowed,
        }
    }

    /// Overrides the fitness weights.
    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Selects the crossover strategy.
    pub fn with_crossover(mut self, crossover_type: RosterCrossover) -> Self {
        self.crossover_type = crossover_type;
        self
    }

    /// Selects the mutation strategy.
    pub fn with_mutation(mut self, mutation_type: RosterMutation) -> Self {
        self.mutation_type = mutation_type;
        self
    }

    /// Sets the probability of reverting a drifted cell to baseline.
    pub fn with_baseline_adherence(mut self, adherence: f64) -> Self {
        self.baseline_adherence = adherence.clamp(0.0, 1.0);
        self
    }

    fn days(&self) -> usize {
        self.baseline.days
    }

    /// Swaps two employees' assignments on random days, skipping swaps
    /// that would land either on an excluded shift.
    fn swap_mutation(&self, roster: &mut Roster, rate: f64, rng: &mut SmallRng) {
        let n = self.config.employees.len();
        if n < 2 {
            return;
        }
        for day in 0..self.days() {
            if !rng.random_bool(rate) {
                continue;
            }
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let emp_i = &self.config.employees[i];
            let emp_j = &self.config.employees[j];
            let (Some(a), Some(b)) = (
                roster.shift(&emp_i.id, day).map(str::to_string),
                roster.shift(&emp_j.id, day).map(str::to_string),
            ) else {
                continue;
            };
            if emp_i.is_excluded(&b) || emp_j.is_excluded(&a) {
                continue;
            }
            roster.set_shift(&emp_i.id, day, b);
            roster.set_shift(&emp_j.id, day, a);
        }
    }

    /// Reverts drifted cells toward the baseline.
    fn guided_mutation(&self, roster: &mut Roster, rate: f64, rng: &mut SmallRng) {
        for emp in &self.config.employees {
            for day in 0..self.days() {
                if !rng.random_bool(rate) {
                    continue;
                }
                let (Some(current), Some(base)) = (
                    roster.shift(&emp.id, day).map(str::to_string),
                    self.baseline.shift(&emp.id, day).map(str::to_string),
                ) else {
                    continue;
                };
                if current != base && rng.random_bool(self.baseline_adherence) {
                    roster.set_shift(&emp.id, day, base);
                }
            }
        }
    }

    /// Replaces cells with a different allowed shift, preferring choices
    /// the sequencing rules accept around the cell; a fully constrained
    /// position falls back to an unbiased draw.
    fn point_mutation(&self, roster: &mut Roster, rate: f64, rng: &mut SmallRng) {
        let rules = self.config.enabled_rules();
        for (idx, emp) in self.config.employees.iter().enumerate() {
            let allowed = &self.allowed[idx];
            if allowed.is_empty() {
                continue;
            }
            for day in 0..self.days() {
                if !rng.random_bool(rate) {
                    continue;
                }
                let Some(entry) = roster.entry(&emp.id) else {
                    continue;
                };
                let current = entry.shifts[day].clone();
                let compatible = valid_next_shifts(&entry.shifts, day, &rules, allowed);
                let pool = if compatible.is_empty() {
                    allowed.clone()
                } else {
                    compatible
                };
                let choices: Vec<&String> = pool.iter().filter(|s| **s != current).collect();
                if let Some(pick) = choices.choose(rng) {
                    roster.set_shift(&emp.id, day, (*pick).clone());
                }
            }
        }
    }
}

impl GaProblem for ScheduleProblem<'_> {
    type Individual = Roster;

    /// Individual 0 is the exact baseline; individual `i` is the baseline
    /// perturbed per cell with probability `0.02 + 0.15 * i / size`.
    fn initial_population(&self, size: usize, rng: &mut SmallRng) -> Vec<Roster> {
        let mut population = Vec::with_capacity(size);
        population.push(self.baseline.clone());
        for i in 1..size {
            let p = 0.02 + 0.15 * i as f64 / size as f64;
            let mut individual = self.baseline.clone();
            for (idx, emp) in self.config.employees.iter().enumerate() {
                let allowed = &self.allowed[idx];
                if allowed.is_empty() {
                    continue;
                }
                for day in 0..self.days() {
                    if rng.random_bool(p) {
                        let pick = allowed[rng.random_range(0..allowed.len())].clone();
                        individual.set_shift(&emp.id, day, pick);
                    }
                }
            }
            population.push(individual);
        }
        population
    }

    fn evaluate(&self, individual: &Roster) -> f64 {
        evaluate(individual, self.config, Some(self.baseline), &self.weights).fitness
    }

    fn crossover(&self, a: &Roster, b: &Roster, rng: &mut SmallRng) -> Roster {
        let mut child = a.clone();
        match self.crossover_type {
            RosterCrossover::Employee => {
                for emp in &self.config.employees {
                    if rng.random_bool(0.5) {
                        if let Some(entry) = b.entry(&emp.id) {
                            child.insert(emp.id.clone(), entry.clone());
                        }
                    }
                }
            }
            RosterCrossover::SinglePoint => {
                let days = self.days();
                let cut = if days > 1 {
                    rng.random_range(1..days)
                } else {
                    0
                };
                for emp in &self.config.employees {
                    for day in cut..days {
                        if let Some(code) = b.shift(&emp.id, day).map(str::to_string) {
                            child.set_shift(&emp.id, day, code);
                        }
                    }
                }
            }
            RosterCrossover::Uniform => {
                for emp in &self.config.employees {
                    for day in 0..self.days() {
                        if rng.random_bool(0.5) {
                            if let Some(code) = b.shift(&emp.id, day).map(str::to_string) {
                                child.set_shift(&emp.id, day, code);
                            }
                        }
                    }
                }
            }
        }
        child
    }

    fn mutate(&self, individual: &mut Roster, rate: f64, rng: &mut SmallRng) {
        match self.mutation_type {
            RosterMutation::Guided => {
                self.swap_mutation(individual, rate, rng);
                self.guided_mutation(individual, rate, rng);
            }
            RosterMutation::Point => {
                self.swap_mutation(individual, rate, rng);
                self.point_mutation(individual, rate, rng);
            }
        }
    }

    fn is_valid(&self, individual: &Roster) -> bool {
        evaluate(individual, self.config, Some(self.baseline), &self.weights).is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline;
    use crate::ga::{GaOptions, GaRunner};
    use crate::models::{CoverageRule, Employee, ShiftMatrix, ShiftType};
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn two_line_config() -> PlanningConfig {
        PlanningConfig {
            year: 2027,
            month: 1, // 28 days, starts Monday
            employees: vec![Employee::new("e1"), Employee::new("e2")],
            shift_types: vec![
                ShiftType::new("M").with_hours(8.0),
                ShiftType::new("P").with_hours(8.0),
                ShiftType::new("RP"),
            ],
            matrices: vec![
                ShiftMatrix::new("mx1", [["M", "M", "M", "M", "M", "M", "M"]]),
                ShiftMatrix::new("mx2", [["P", "P", "P", "P", "P", "P", "P"]]),
            ],
            coverage_rules: vec![CoverageRule::new(1, ["M"]), CoverageRule::new(1, ["P"])],
            ..Default::default()
        }
    }

    fn bound_config() -> PlanningConfig {
        let mut cfg = two_line_config();
        cfg.employees = vec![
            Employee::new("e1").with_matrix("mx1"),
            Employee::new("e2").with_matrix("mx2"),
        ];
        cfg
    }

    #[test]
    fn test_individual_zero_is_baseline() {
        let cfg = bound_config();
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base);
        let pop = problem.initial_population(10, &mut rng());
        assert_eq!(pop.len(), 10);
        assert_eq!(pop[0], base);
        // Later individuals drift further on average; just assert some
        // drift exists.
        let drift: usize = cfg
            .employees
            .iter()
            .map(|e| {
                pop[9]
                    .entry(&e.id)
                    .unwrap()
                    .shifts
                    .iter()
                    .zip(&base.entry(&e.id).unwrap().shifts)
                    .filter(|(a, b)| a != b)
                    .count()
            })
            .sum();
        assert!(drift > 0);
    }

    #[test]
    fn test_perturbation_stays_allowed() {
        let mut cfg = bound_config();
        cfg.employees[1] = cfg.employees[1].clone().with_excluded_shift("M");
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base);
        let pop = problem.initial_population(20, &mut rng());
        for ind in &pop {
            for code in &ind.entry("e2").unwrap().shifts {
                assert_ne!(code, "M");
            }
        }
    }

    #[test]
    fn test_guided_mutation_full_adherence_reverts() {
        let cfg = bound_config();
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base).with_baseline_adherence(1.0);

        let mut drifted = base.clone();
        for day in 0..drifted.days {
            drifted.set_shift("e1", day, "RP");
        }
        // Rate 1 visits every cell; full adherence reverts every drift.
        problem.guided_mutation(&mut drifted, 1.0, &mut rng());
        assert_eq!(drifted, base);
    }

    #[test]
    fn test_swap_mutation_respects_exclusions() {
        let mut cfg = bound_config();
        cfg.employees[1] = cfg.employees[1].clone().with_excluded_shift("M");
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base);

        let mut ind = base.clone();
        problem.swap_mutation(&mut ind, 1.0, &mut rng());
        for code in &ind.entry("e2").unwrap().shifts {
            assert_ne!(code, "M");
        }
    }

    #[test]
    fn test_point_mutation_stays_allowed() {
        let mut cfg = bound_config();
        cfg.employees[0] = cfg.employees[0].clone().with_excluded_shift("P");
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base).with_mutation(RosterMutation::Point);

        let mut ind = base.clone();
        problem.mutate(&mut ind, 1.0, &mut rng());
        for code in &ind.entry("e1").unwrap().shifts {
            assert_ne!(code, "P");
        }
        // At rate 1 the month cannot come through untouched.
        assert_ne!(ind.entry("e1").unwrap().shifts, base.entry("e1").unwrap().shifts);
    }

    #[test]
    fn test_single_point_crossover_prefix_suffix() {
        let cfg = bound_config();
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base).with_crossover(RosterCrossover::SinglePoint);

        let mut other = base.clone();
        for day in 0..other.days {
            other.set_shift("e1", day, "RP");
            other.set_shift("e2", day, "RP");
        }
        let child = problem.crossover(&base, &other, &mut rng());
        let shifts = &child.entry("e1").unwrap().shifts;
        let cut = shifts.iter().position(|s| s == "RP").unwrap();
        assert!(cut >= 1);
        assert!(shifts[..cut].iter().all(|s| s == "M"));
        assert!(shifts[cut..].iter().all(|s| s == "RP"));
    }

    #[test]
    fn test_baseline_fitness_composability() {
        // Reverting one drifted cell changes fitness by exactly the
        // pattern weight plus the hours delta of that cell.
        let cfg = bound_config();
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base);

        let mut drifted = base.clone();
        drifted.set_shift("e1", 3, "RP"); // M -> RP: -8h on an over-worked line
        let f_drifted = problem.evaluate(&drifted);
        let f_base = problem.evaluate(&base);

        let w = FitnessWeights::default();
        // Baseline is over contract (28 days of 8h vs 40h/wk); dropping 8h
        // moves the surplus down; plus one coverage miss and one pattern
        // deviation.
        let expected_delta = w.coverage_violation + w.matrix_change - 8.0 * w.hours_over;
        assert!((f_drifted - f_base - expected_delta).abs() < 1e-6);
    }

    #[test]
    fn test_ga_keeps_valid_baseline() {
        // The baseline already satisfies everything; the GA must never
        // hand back anything worse.
        let cfg = bound_config();
        let base = baseline::build(&cfg, &mut rng()).unwrap();
        let problem = ScheduleProblem::new(&cfg, &base);
        assert!(problem.is_valid(&base));

        let options = GaOptions::default()
            .with_population_size(12)
            .with_max_generations(50)
            .with_stagnation_limit(10);
        let out = GaRunner::new(options)
            .run(&problem, &mut rng())
            .unwrap();
        // Individual 0 seeds the baseline, so the incumbent can only match
        // or beat it — and the hard terms must stay satisfied.
        assert!(out.best_fitness <= problem.evaluate(&base));
        assert!(problem.is_valid(&out.best));
    }
}
