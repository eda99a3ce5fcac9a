//! Generic evolution loop.
//!
//! Both optimisers plug a [`GaProblem`] into the same skeleton: elitism,
//! tournament selection, crossover-or-clone breeding, a monotone incumbent,
//! and four ways out — target fitness reached, generation budget spent,
//! wall-clock timeout, or stagnation. A cooperative cancel flag is checked
//! at every generation boundary; cancellation returns the incumbent as a
//! best-effort result.
//!
//! Fitness is minimised; 0 is a perfect individual.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::options::GaOptions;
use crate::error::{PlanError, Result};

/// A problem the evolution loop can optimise.
pub trait GaProblem {
    /// One candidate solution.
    type Individual: Clone;

    /// Builds the starting population.
    fn initial_population(&self, size: usize, rng: &mut SmallRng) -> Vec<Self::Individual>;

    /// Scores an individual; lower is better, 0 is perfect.
    fn evaluate(&self, individual: &Self::Individual) -> f64;

    /// Combines two parents into a child.
    fn crossover(
        &self,
        a: &Self::Individual,
        b: &Self::Individual,
        rng: &mut SmallRng,
    ) -> Self::Individual;

    /// Mutates an individual in place at the given rate.
    fn mutate(&self, individual: &mut Self::Individual, rate: f64, rng: &mut SmallRng);

    /// Whether an individual satisfies every hard constraint.
    fn is_valid(&self, individual: &Self::Individual) -> bool;
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaStatus {
    /// Target fitness reached or generation budget spent.
    Done,
    /// Wall-clock budget spent.
    TimedOut,
    /// No incumbent improvement for the configured stretch.
    Stagnated,
    /// The host asked for the incumbent early.
    Cancelled,
}

/// Run statistics attached to the terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaStats {
    pub generations: usize,
    pub evaluations: usize,
    pub elapsed_ms: u64,
    /// Best fitness in the initial population.
    pub initial_fitness: f64,
}

/// Terminal state of a run.
#[derive(Debug, Clone)]
pub struct GaOutcome<I> {
    pub best: I,
    pub best_fitness: f64,
    pub status: GaStatus,
    pub stats: GaStats,
}

/// A periodic progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub generation: usize,
    pub max_generations: usize,
    pub best_fitness: f64,
    /// Generations since the incumbent last improved.
    pub stagnation: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_fitness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
}

/// Drives a [`GaProblem`] to a terminal state.
pub struct GaRunner<'a> {
    options: GaOptions,
    cancel: Option<&'a AtomicBool>,
    progress: Option<Box<dyn FnMut(Progress) + 'a>>,
}

impl<'a> GaRunner<'a> {
    /// Creates a runner with the given options.
    pub fn new(options: GaOptions) -> Self {
        Self {
            options: options.sanitized(),
            cancel: None,
            progress: None,
        }
    }

    /// Installs a cooperative cancel flag, checked each generation.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Installs a progress sink, fired every `progress_stride` generations.
    pub fn with_progress(mut self, sink: impl FnMut(Progress) + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Runs the evolution to a terminal state.
    pub fn run<P: GaProblem>(
        &mut self,
        problem: &P,
        rng: &mut SmallRng,
    ) -> Result<GaOutcome<P::Individual>> {
        let opts = self.options.clone();
        let start = Instant::now();
        let mut evaluations = 0usize;

        let population = problem.initial_population(opts.population_size, rng);
        if population.is_empty() {
            return Err(PlanError::Execution(
                "initial population is empty".to_string(),
            ));
        }

        let mut scored: Vec<(P::Individual, f64)> = population
            .into_iter()
            .map(|ind| {
                let fitness = problem.evaluate(&ind);
                (ind, fitness)
            })
            .collect();
        evaluations += scored.len();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut incumbent = scored[0].clone();
        let initial_fitness = incumbent.1;
        let mut stagnation = 0usize;
        let mut generation = 0usize;

        let status = loop {
            if self.cancelled() {
                break GaStatus::Cancelled;
            }
            if start.elapsed().as_millis() as u64 >= opts.timeout_ms {
                break GaStatus::TimedOut;
            }
            if incumbent.1 == 0.0 {
                break GaStatus::Done;
            }
            if stagnation >= opts.stagnation_limit {
                break GaStatus::Stagnated;
            }
            if generation >= opts.max_generations {
                break GaStatus::Done;
            }
            generation += 1;

            let mut next: Vec<P::Individual> = scored
                .iter()
                .take(opts.elite_count)
                .map(|(ind, _)| ind.clone())
                .collect();
            while next.len() < opts.population_size {
                let child = if rng.random_bool(opts.crossover_rate) {
                    let a = tournament(&scored, opts.tournament_size, rng);
                    let b = tournament(&scored, opts.tournament_size, rng);
                    let mut child = problem.crossover(a, b, rng);
                    problem.mutate(&mut child, opts.mutation_rate, rng);
                    child
                } else {
                    let mut child = tournament(&scored, opts.tournament_size, rng).clone();
                    problem.mutate(&mut child, (2.0 * opts.mutation_rate).min(1.0), rng);
                    child
                };
                next.push(child);
            }

            scored = next
                .into_iter()
                .map(|ind| {
                    let fitness = problem.evaluate(&ind);
                    (ind, fitness)
                })
                .collect();
            evaluations += scored.len();
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));

            if scored[0].1 < incumbent.1 {
                incumbent = scored[0].clone();
                stagnation = 0;
            } else {
                stagnation += 1;
            }

            if generation % opts.progress_stride == 0 {
                let avg = scored.iter().map(|(_, f)| f).sum::<f64>() / scored.len() as f64;
                let event = Progress {
                    generation,
                    max_generations: opts.max_generations,
                    best_fitness: incumbent.1,
                    stagnation,
                    avg_fitness: Some(avg),
                    is_valid: Some(problem.is_valid(&incumbent.0)),
                    time_ms: Some(start.elapsed().as_millis() as u64),
                };
                debug!(
                    generation,
                    best_fitness = incumbent.1,
                    avg_fitness = avg,
                    stagnation,
                    "evolution progress"
                );
                if let Some(sink) = self.progress.as_mut() {
                    sink(event);
                }
            }
        };

        Ok(GaOutcome {
            best: incumbent.0,
            best_fitness: incumbent.1,
            status,
            stats: GaStats {
                generations: generation,
                evaluations,
                elapsed_ms: start.elapsed().as_millis() as u64,
                initial_fitness,
            },
        })
    }
}

/// Samples `size` individuals with replacement; the lowest fitness wins.
fn tournament<'p, I>(scored: &'p [(I, f64)], size: usize, rng: &mut SmallRng) -> &'p I {
    let mut best = &scored[rng.random_range(0..scored.len())];
    for _ in 1..size {
        let contender = &scored[rng.random_range(0..scored.len())];
        if contender.1 < best.1 {
            best = contender;
        }
    }
    &best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Minimise the sum of a vector of small integers; mutation decrements
    /// random cells.
    struct SumProblem {
        len: usize,
    }

    impl GaProblem for SumProblem {
        type Individual = Vec<u32>;

        fn initial_population(&self, size: usize, rng: &mut SmallRng) -> Vec<Vec<u32>> {
            (0..size)
                .map(|_| (0..self.len).map(|_| rng.random_range(1..10)).collect())
                .collect()
        }

        fn evaluate(&self, ind: &Vec<u32>) -> f64 {
            ind.iter().sum::<u32>() as f64
        }

        fn crossover(&self, a: &Vec<u32>, b: &Vec<u32>, rng: &mut SmallRng) -> Vec<u32> {
            a.iter()
                .zip(b)
                .map(|(x, y)| if rng.random_bool(0.5) { *x } else { *y })
                .collect()
        }

        fn mutate(&self, ind: &mut Vec<u32>, rate: f64, rng: &mut SmallRng) {
            for cell in ind.iter_mut() {
                if rng.random_bool(rate) {
                    *cell = cell.saturating_sub(1);
                }
            }
        }

        fn is_valid(&self, _: &Vec<u32>) -> bool {
            true
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_reaches_target_fitness() {
        let mut runner = GaRunner::new(
            GaOptions::default()
                .with_population_size(20)
                .with_max_generations(500),
        );
        let out = runner.run(&SumProblem { len: 4 }, &mut rng()).unwrap();
        assert_eq!(out.best_fitness, 0.0);
        assert_eq!(out.status, GaStatus::Done);
        assert!(out.best.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_incumbent_monotone() {
        let fitness_log = RefCell::new(Vec::new());
        let mut runner = GaRunner::new(
            GaOptions::default()
                .with_population_size(12)
                .with_max_generations(60)
                .with_stagnation_limit(1000),
        )
        .with_progress(|p| fitness_log.borrow_mut().push(p.best_fitness));

        runner.run(&SumProblem { len: 8 }, &mut rng()).unwrap();
        drop(runner);
        let log = fitness_log.into_inner();
        assert!(!log.is_empty());
        assert!(log.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_progress_stride() {
        let count = RefCell::new(0usize);
        let options = GaOptions::default()
            .with_population_size(10)
            .with_max_generations(50)
            .with_stagnation_limit(1000)
            .with_mutation_rate(0.0)
            .with_crossover_rate(0.0);
        let mut runner =
            GaRunner::new(options).with_progress(|_| *count.borrow_mut() += 1);
        // Mutation off: the run cannot improve and spends its 50
        // generations (stagnation disabled), emitting every 5th.
        let out = runner.run(&SumProblem { len: 4 }, &mut rng()).unwrap();
        if out.best_fitness > 0.0 {
            assert_eq!(*count.borrow(), 10);
        }
    }

    #[test]
    fn test_stagnation_stops_run() {
        let options = GaOptions::default()
            .with_population_size(10)
            .with_max_generations(10_000)
            .with_mutation_rate(0.0)
            .with_crossover_rate(0.0)
            .with_stagnation_limit(10);
        let out = GaRunner::new(options)
            .run(&SumProblem { len: 4 }, &mut rng())
            .unwrap();
        if out.best_fitness > 0.0 {
            assert_eq!(out.status, GaStatus::Stagnated);
            assert_eq!(out.stats.generations, 10);
        }
    }

    #[test]
    fn test_cancel_returns_incumbent() {
        let flag = AtomicBool::new(true);
        let options = GaOptions::default()
            .with_population_size(10)
            .with_max_generations(1000);
        let out = GaRunner::new(options)
            .with_cancel_flag(&flag)
            .run(&SumProblem { len: 4 }, &mut rng())
            .unwrap();
        assert_eq!(out.status, GaStatus::Cancelled);
        assert_eq!(out.stats.generations, 0);
    }

    #[test]
    fn test_seeded_runs_reproducible() {
        let options = GaOptions::default()
            .with_population_size(10)
            .with_max_generations(50);
        let a = GaRunner::new(options.clone())
            .run(&SumProblem { len: 6 }, &mut rng())
            .unwrap();
        let b = GaRunner::new(options)
            .run(&SumProblem { len: 6 }, &mut rng())
            .unwrap();
        assert_eq!(a.best_fitness, b.best_fitness);
        assert_eq!(a.best, b.best);
    }
}
