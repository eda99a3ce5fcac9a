//! Genetic algorithm configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs shared by both optimisers.
///
/// Defaults suit the schedule optimiser; [`GaOptions::matrix_defaults`]
/// suits the matrix optimiser (larger population, longer budget, 5%
/// elitism).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaOptions {
    /// Individuals per generation (min 10).
    pub population_size: usize,
    /// Generation budget (min 50).
    pub max_generations: usize,
    /// Consecutive generations without improvement before giving up
    /// (min 10).
    pub stagnation_limit: usize,
    /// Individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Per-cell / per-row mutation probability (0..1).
    pub mutation_rate: f64,
    /// Probability of breeding by crossover rather than cloning (0..1).
    pub crossover_rate: f64,
    /// Tournament sample size (min 2); the lowest fitness wins.
    pub tournament_size: usize,
    /// Probability that guided mutation reverts a drifted cell (0..1).
    pub baseline_adherence: f64,
    /// Wall-clock budget in milliseconds.
    pub timeout_ms: u64,
    /// RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Generations between progress events.
    pub progress_stride: usize,
}

impl Default for GaOptions {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_generations: 500,
            stagnation_limit: 50,
            elite_count: 2,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            tournament_size: 5,
            baseline_adherence: 0.7,
            timeout_ms: 30 * 60 * 1000,
            seed: None,
            progress_stride: 5,
        }
    }
}

impl GaOptions {
    /// Defaults for evolving matrices rather than schedules.
    pub fn matrix_defaults() -> Self {
        Self {
            population_size: 1000,
            max_generations: 300,
            stagnation_limit: 60,
            elite_count: 50,
            timeout_ms: 3000 * 1000,
            ..Default::default()
        }
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the generation budget.
    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate;
        self
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size;
        self
    }

    /// Sets the baseline adherence.
    pub fn with_baseline_adherence(mut self, adherence: f64) -> Self {
        self.baseline_adherence = adherence;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the RNG seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Clamps every knob into its legal range. Elites are capped below
    /// the population size so every generation still breeds.
    pub fn sanitized(&self) -> Self {
        let population_size = self.population_size.max(10);
        Self {
            population_size,
            max_generations: self.max_generations.max(50),
            stagnation_limit: self.stagnation_limit.max(10),
            elite_count: self.elite_count.min(population_size / 2),
            mutation_rate: self.mutation_rate.clamp(0.0, 1.0),
            crossover_rate: self.crossover_rate.clamp(0.0, 1.0),
            tournament_size: self.tournament_size.max(2),
            baseline_adherence: self.baseline_adherence.clamp(0.0, 1.0),
            timeout_ms: self.timeout_ms,
            seed: self.seed,
            progress_stride: self.progress_stride.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = GaOptions::default();
        assert_eq!(o.population_size, 100);
        assert_eq!(o.tournament_size, 5);
        assert!((o.baseline_adherence - 0.7).abs() < 1e-10);
        assert_eq!(o.progress_stride, 5);
    }

    #[test]
    fn test_matrix_defaults() {
        let o = GaOptions::matrix_defaults();
        assert_eq!(o.population_size, 1000);
        assert_eq!(o.elite_count, 50); // 5% of the population
        assert_eq!(o.timeout_ms, 3_000_000);
    }

    #[test]
    fn test_builder_chain() {
        let o = GaOptions::default()
            .with_population_size(40)
            .with_max_generations(120)
            .with_seed(7);
        assert_eq!(o.population_size, 40);
        assert_eq!(o.max_generations, 120);
        assert_eq!(o.seed, Some(7));
    }

    #[test]
    fn test_sanitized_clamps() {
        let o = GaOptions::default()
            .with_population_size(1)
            .with_max_generations(3)
            .with_tournament_size(0)
            .with_mutation_rate(1.5)
            .sanitized();
        assert_eq!(o.population_size, 10);
        assert_eq!(o.max_generations, 50);
        assert_eq!(o.tournament_size, 2);
        assert!((o.mutation_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_sanitized_keeps_breeding_room() {
        let o = GaOptions::matrix_defaults()
            .with_population_size(10)
            .sanitized();
        assert_eq!(o.elite_count, 5);
    }
}
