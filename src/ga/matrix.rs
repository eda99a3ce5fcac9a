//! Matrix optimisation problem.
//!
//! Evolves the cyclic base patterns themselves, either one matrix with the
//! others held fixed, or all matrices jointly as one individual. Every
//! fitness probe is a nested evaluation: the candidate grids are spliced
//! into the configuration, a fresh greedy baseline month is built from
//! them, and the baseline is scored — a matrix is only as good as the
//! month it yields. On top of that, every row is validated as a ring so
//! wrap-around rule breaks count even before unravelling.
//!
//! Operators never place a shift outside a matrix's *allowed set*: the
//! declared shifts minus the union of exclusions of the employees bound to
//! that matrix.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};

use super::runner::GaProblem;
use crate::baseline;
use crate::checker::{valid_next_shifts_cyclic, validate, Wrap};
use crate::evaluator::{evaluate, FitnessWeights};
use crate::models::{matches_shift, PlanningConfig, RuleKind, SequenceRule, ShiftMatrix};

/// Fitness handed back when a candidate cannot produce a baseline at all.
const DEGENERATE_FITNESS: f64 = 1e18;
/// Chance that cell mutation skips the rule-compatibility bias, leaving an
/// escape hatch out of local optima.
const BIAS_BYPASS: f64 = 0.02;

/// Which matrices evolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixTarget {
    /// One matrix evolves; the rest stay fixed.
    Single(String),
    /// All matrices evolve as one individual.
    Joint,
}

/// The evolving grids, keyed by matrix id.
///
/// A `BTreeMap` keeps iteration — and therefore RNG consumption — in a
/// deterministic order.
pub type MatrixGenome = BTreeMap<String, Vec<Vec<String>>>;

/// GA problem for evolving cyclic matrices.
pub struct MatrixProblem<'a> {
    config: &'a PlanningConfig,
    target: MatrixTarget,
    weights: FitnessWeights,
    rules: Vec<SequenceRule>,
    /// Allowed shift ids per evolving matrix.
    allowed: BTreeMap<String, Vec<String>>,
    /// Employee indices (into `config.employees`) bound per evolving
    /// matrix, row-aligned.
    bound: BTreeMap<String, Vec<usize>>,
    /// `must_follow` pairs, cached for follower maintenance.
    followers: Vec<(String, String)>,
    use_current_as_seed: bool,
    /// Seed of the per-probe RNG used inside the nested baseline build,
    /// so equal genomes always score equally.
    probe_seed: u64,
}

impl<'a> MatrixProblem<'a> {
    /// Creates the problem for a target.
    pub fn new(config: &'a PlanningConfig, target: MatrixTarget) -> Self {
        let evolving: Vec<&ShiftMatrix> = config
            .matrices
            .iter()
            .filter(|m| match &target {
                MatrixTarget::Single(id) => &m.id == id,
                MatrixTarget::Joint => true,
            })
            .collect();

        let mut allowed = BTreeMap::new();
        let mut bound = BTreeMap::new();
        for matrix in &evolving {
            let employees = config.employees_for_matrix(&matrix.id);
            let ids: Vec<String> = config
                .shift_types
                .iter()
                .filter(|s| !employees.iter().any(|e| e.is_excluded(&s.id)))
                .map(|s| s.id.clone())
                .collect();
            allowed.insert(matrix.id.clone(), ids);
            bound.insert(
                matrix.id.clone(),
                config
                    .employees
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| employees.iter().any(|b| b.id == e.id))
                    .map(|(i, _)| i)
                    .collect(),
            );
        }

        let rules = config.enabled_rules();
        let followers = rules
            .iter()
            .filter_map(|r| match &r.kind {
                RuleKind::MustFollow { shift, successor } => {
                    Some((shift.clone(), successor.clone()))
                }
                _ => None,
            })
            .collect();

        Self {
            config,
            target,
            weights: FitnessWeights::default(),
            rules,
            allowed,
            bound,
            followers,
            use_current_as_seed: false,
            probe_seed: 0,
        }
    }

    /// Overrides the fitness weights.
    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Injects the current matrices as individual 0, guaranteeing the
    /// result never scores worse than the input.
    pub fn with_current_as_seed(mut self, seed: bool) -> Self {
        self.use_current_as_seed = seed;
        self
    }

    /// Sets the nested-probe RNG seed.
    pub fn with_probe_seed(mut self, seed: u64) -> Self {
        self.probe_seed = seed;
        self
    }

    /// Matrix ids that evolve, in genome order.
    pub fn evolving_ids(&self) -> Vec<&str> {
        self.allowed.keys().map(String::as_str).collect()
    }

    /// The current grids of the evolving matrices.
    fn current_genome(&self) -> MatrixGenome {
        self.config
            .matrices
            .iter()
            .filter(|m| self.allowed.contains_key(&m.id))
            .map(|m| (m.id.clone(), m.grid.clone()))
            .collect()
    }

    /// Splices a genome into a copy of the configuration.
    fn assemble(&self, genome: &MatrixGenome) -> PlanningConfig {
        let mut cfg = self.config.clone();
        for matrix in &mut cfg.matrices {
            if let Some(grid) = genome.get(&matrix.id) {
                matrix.grid = grid.clone();
            }
        }
        cfg
    }

    /// Cyclic rule violations across all evolving rows.
    fn row_violations(&self, genome: &MatrixGenome) -> usize {
        genome
            .values()
            .flat_map(|grid| grid.iter())
            .map(|row| validate(row, &self.rules, Wrap::Cyclic).len())
            .sum()
    }

    fn follower_of(&self, code: &str) -> Option<&str> {
        self.followers
            .iter()
            .find(|(shift, _)| matches_shift(code, shift))
            .map(|(_, successor)| successor.as_str())
    }

    /// Whether a shift may be placed in a matrix at all.
    fn shift_allowed(&self, matrix_id: &str, code: &str) -> bool {
        self.allowed
            .get(matrix_id)
            .map(|ids| ids.iter().any(|a| a == code || matches_shift(code, a)))
            .unwrap_or(false)
    }

    /// Whether the slot's row-aligned employee can work a shift.
    fn slot_accepts(&self, matrix_id: &str, row: usize, code: &str) -> bool {
        if !self.shift_allowed(matrix_id, code) {
            return false;
        }
        match self.bound.get(matrix_id).and_then(|b| b.get(row)) {
            Some(&emp_idx) => !self.config.employees[emp_idx].is_excluded(code),
            None => true,
        }
    }

    /// Builds one genome column by column against the coverage rules.
    ///
    /// For every column, the shifts the fixed matrices already supply are
    /// subtracted from the coverage requirements; what is missing goes to
    /// shuffled slots of the evolving matrices, the rest fills uniformly
    /// from each matrix's allowed set.
    fn smart_genome(&self, rng: &mut SmallRng) -> MatrixGenome {
        let mut genome: MatrixGenome = self
            .current_genome()
            .into_iter()
            .map(|(id, grid)| {
                let filled: Vec<Vec<String>> = grid
                    .iter()
                    .map(|row| vec![String::new(); row.len()])
                    .collect();
                (id, filled)
            })
            .collect();

        let fixed: Vec<&ShiftMatrix> = self
            .config
            .matrices
            .iter()
            .filter(|m| !self.allowed.contains_key(&m.id))
            .collect();

        let max_cols = genome
            .keys()
            .filter_map(|id| self.grid_cols(genome.get(id)))
            .max()
            .unwrap_or(0);

        for col in 0..max_cols {
            // Pool the open slots of every evolving matrix at this column.
            let mut slots: Vec<(String, usize)> = genome
                .iter()
                .flat_map(|(id, grid)| {
                    grid.iter()
                        .enumerate()
                        .filter(move |(_, row)| col < row.len())
                        .map(move |(r, _)| (id.clone(), r))
                })
                .collect();
            slots.shuffle(rng);

            // What the fixed matrices already provide at this column.
            let supplied: Vec<&str> = fixed
                .iter()
                .flat_map(|m| m.grid.iter())
                .filter_map(|row| row.get(col))
                .map(String::as_str)
                .collect();

            let mut required: Vec<String> = Vec::new();
            for rule in &self.config.coverage_rules {
                let have = supplied
                    .iter()
                    .filter(|code| rule.shifts.iter().any(|t| matches_shift(code, t)))
                    .count() as u32;
                let missing = rule.min.saturating_sub(have);
                if let Some(code) = rule.shifts.iter().find(|t| {
                    genome
                        .keys()
                        .any(|id| self.shift_allowed(id, t))
                }) {
                    for _ in 0..missing {
                        required.push(code.clone());
                    }
                }
            }

            let mut cursor = 0usize;
            for code in required {
                if let Some(pos) = slots[cursor.min(slots.len())..]
                    .iter()
                    .position(|(id, row)| self.slot_accepts(id, *row, &code))
                {
                    let (id, row) = slots[cursor + pos].clone();
                    genome.get_mut(&id).unwrap()[row][col] = code;
                    slots.swap(cursor, cursor + pos);
                    cursor += 1;
                }
            }

            // Fill whatever is left uniformly from the allowed set.
            for (id, row) in &slots[cursor.min(slots.len())..] {
                let cell = &mut genome.get_mut(id).unwrap()[*row][col];
                if cell.is_empty() {
                    *cell = self.random_allowed(id, rng);
                }
            }
        }

        genome
    }

    fn grid_cols(&self, grid: Option<&Vec<Vec<String>>>) -> Option<usize> {
        grid.and_then(|g| g.first()).map(|row| row.len())
    }

    fn random_allowed(&self, matrix_id: &str, rng: &mut SmallRng) -> String {
        match self.allowed.get(matrix_id).and_then(|ids| ids.choose(rng)) {
            Some(code) => code.clone(),
            // A matrix whose bound employees exclude everything can only
            // repeat the first declared shift.
            None => self
                .config
                .shift_types
                .first()
                .map(|s| s.id.clone())
                .unwrap_or_default(),
        }
    }

    /// Writes or clears followers around a mutated cell.
    fn maintain_follower(
        &self,
        grid: &mut [Vec<String>],
        matrix_id: &str,
        row: usize,
        col: usize,
        old: &str,
        rng: &mut SmallRng,
    ) {
        let rows = grid.len();
        let cols = grid[0].len();
        let next_index = (row * cols + col + 1) % (rows * cols);
        let (nr, nc) = (next_index / cols, next_index % cols);

        let new_code = grid[row][col].clone();
        if let Some(successor) = self.follower_of(&new_code) {
            if self.shift_allowed(matrix_id, successor) {
                grid[nr][nc] = successor.to_string();
            }
        } else if self.follower_of(old).is_some() {
            // The old cell forced its neighbour; that obligation is gone.
            grid[nr][nc] = self.random_allowed(matrix_id, rng);
        }
    }

    fn mutate_cells(
        &self,
        grid: &mut [Vec<String>],
        matrix_id: &str,
        rate: f64,
        rng: &mut SmallRng,
    ) {
        let rows = grid.len();
        let Some(allowed) = self.allowed.get(matrix_id) else {
            return;
        };
        if allowed.is_empty() {
            return;
        }
        for row in 0..rows {
            if !rng.random_bool(rate) {
                continue;
            }
            let cols = grid[row].len();
            if cols == 0 {
                continue;
            }
            let flips = rng.random_range(1..=2usize);
            for _ in 0..flips {
                let col = rng.random_range(0..cols);
                let pick = if rng.random_bool(BIAS_BYPASS) {
                    allowed.choose(rng).cloned()
                } else {
                    let compatible =
                        valid_next_shifts_cyclic(&grid[row], col, &self.rules, allowed);
                    if compatible.is_empty() {
                        allowed.choose(rng).cloned()
                    } else {
                        compatible.choose(rng).cloned()
                    }
                };
                if let Some(code) = pick {
                    let old = std::mem::replace(&mut grid[row][col], code);
                    self.maintain_follower(grid, matrix_id, row, col, &old, rng);
                }
            }
        }
    }

    /// Swaps two snake cells, carrying follower pairs along.
    fn block_swap(&self, grid: &mut [Vec<String>], rng: &mut SmallRng) {
        let rows = grid.len();
        let cols = grid[0].len();
        let len = rows * cols;
        if len < 2 {
            return;
        }
        let i1 = rng.random_range(0..len);
        let mut i2 = rng.random_range(0..len - 1);
        if i2 >= i1 {
            i2 += 1;
        }
        let at = |i: usize| (i / cols, i % cols);
        let (r1, c1) = at(i1);
        let (r2, c2) = at(i2);

        let carries_follower = self.follower_of(&grid[r1][c1]).is_some()
            || self.follower_of(&grid[r2][c2]).is_some();

        let tmp = grid[r1][c1].clone();
        grid[r1][c1] = grid[r2][c2].clone();
        grid[r2][c2] = tmp;

        if carries_follower {
            let (nr1, nc1) = at((i1 + 1) % len);
            let (nr2, nc2) = at((i2 + 1) % len);
            let tmp = grid[nr1][nc1].clone();
            grid[nr1][nc1] = grid[nr2][nc2].clone();
            grid[nr2][nc2] = tmp;
        }
    }

    /// Swaps whole rows between two evolving matrices when the widths
    /// match and each row is legal in the other matrix.
    fn joint_row_shuffle(&self, genome: &mut MatrixGenome, rng: &mut SmallRng) {
        let ids: Vec<String> = genome.keys().cloned().collect();
        if ids.len() < 2 {
            return;
        }
        let a = ids[rng.random_range(0..ids.len())].clone();
        let mut bi = rng.random_range(0..ids.len() - 1);
        if ids[bi] == a {
            bi += 1;
        }
        let b = ids[bi].clone();

        let ra = rng.random_range(0..genome[&a].len());
        let rb = rng.random_range(0..genome[&b].len());
        let row_a = genome[&a][ra].clone();
        let row_b = genome[&b][rb].clone();
        if row_a.len() != row_b.len() {
            return;
        }
        let legal = row_a.iter().all(|code| self.shift_allowed(&b, code))
            && row_b.iter().all(|code| self.shift_allowed(&a, code));
        if !legal {
            return;
        }
        genome.get_mut(&a).unwrap()[ra] = row_b;
        genome.get_mut(&b).unwrap()[rb] = row_a;
    }
}

impl GaProblem for MatrixProblem<'_> {
    type Individual = MatrixGenome;

    fn initial_population(&self, size: usize, rng: &mut SmallRng) -> Vec<MatrixGenome> {
        let mut population = Vec::with_capacity(size);
        if self.use_current_as_seed {
            population.push(self.current_genome());
        }
        while population.len() < size {
            population.push(self.smart_genome(rng));
        }
        population
    }

    fn evaluate(&self, genome: &MatrixGenome) -> f64 {
        let row_penalty = self.row_violations(genome) as f64 * self.weights.constraint_violation;
        let cfg = self.assemble(genome);
        let mut probe_rng = SmallRng::seed_from_u64(self.probe_seed);
        match baseline::build(&cfg, &mut probe_rng) {
            Ok(roster) => row_penalty + evaluate(&roster, &cfg, None, &self.weights).fitness,
            Err(_) => DEGENERATE_FITNESS,
        }
    }

    /// Row-wise uniform crossover: child rows are copied whole, so the
    /// sequences inside a row survive.
    fn crossover(&self, a: &MatrixGenome, b: &MatrixGenome, rng: &mut SmallRng) -> MatrixGenome {
        let mut child = a.clone();
        for (id, grid) in child.iter_mut() {
            if let Some(other) = b.get(id) {
                for (row, cells) in grid.iter_mut().enumerate() {
                    if row < other.len() && rng.random_bool(0.5) {
                        *cells = other[row].clone();
                    }
                }
            }
        }
        child
    }

    fn mutate(&self, genome: &mut MatrixGenome, rate: f64, rng: &mut SmallRng) {
        let ids: Vec<String> = genome.keys().cloned().collect();
        for id in &ids {
            let grid = genome.get_mut(id).expect("id from genome");
            if grid.is_empty() || grid[0].is_empty() {
                continue;
            }
            self.mutate_cells(grid, id, rate, rng);
            if rng.random_bool(rate) {
                self.block_swap(grid, rng);
            }
            if rng.random_bool(rate / 2.0) {
                let cols = grid[0].len();
                if cols > 1 {
                    let row = rng.random_range(0..grid.len());
                    let k = rng.random_range(1..cols);
                    grid[row].rotate_left(k);
                }
            }
        }
        if matches!(self.target, MatrixTarget::Joint) && rng.random_bool(rate) {
            self.joint_row_shuffle(genome, rng);
        }
    }

    fn is_valid(&self, genome: &MatrixGenome) -> bool {
        if self.row_violations(genome) > 0 {
            return false;
        }
        let cfg = self.assemble(genome);
        let mut probe_rng = SmallRng::seed_from_u64(self.probe_seed);
        match baseline::build(&cfg, &mut probe_rng) {
            Ok(roster) => evaluate(&roster, &cfg, None, &self.weights).is_valid,
            Err(_) => false,
        }
    }
}
