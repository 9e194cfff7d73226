//! Parameters for the genetic algorithm and the solver run.

use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};

pub const DEFAULT_TEMPERATURE: f64 = 6.0;
pub const DEFAULT_ANNEALING_FACTOR: f64 = 1.0;
pub const DEFAULT_MAX_MUTATE_CLUSTER_SIZE: usize = 1;

/// Parameters of one [`GeneticAlgorithm`](crate::genetic::GeneticAlgorithm) run.
/// Build it with [`GeneticAlgorithmParameters::new`], which validates the values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeneticAlgorithmParameters {
    /// Number of generations per iteration.
    pub max_generation: usize,
    /// Number of individuals kept in the population at once.
    pub population_size: usize,
    /// Number of bits in each individual's DNA.
    pub dna_length: usize,
    /// How often worse mutations replace the original. Higher is more often.
    pub temperature: f64,
    /// Multiplied into the temperature after each generation.
    pub annealing_factor: f64,
    /// Maximum length of the bit run flipped by one mutation.
    pub max_mutate_cluster_size: usize,
}

impl GeneticAlgorithmParameters {
    pub fn new(
        max_generation: usize,
        population_size: usize,
        dna_length: usize,
        temperature: f64,
        annealing_factor: f64,
        max_mutate_cluster_size: usize,
    ) -> Result<Self> {
        check_non_negative("temperature", temperature)?;
        check_non_negative("annealing_factor", annealing_factor)?;
        if max_mutate_cluster_size < 1 {
            return Err(OptimizerError::invalid("max_mutate_cluster_size", "must be >= 1"));
        }
        Ok(Self {
            max_generation,
            population_size,
            dna_length,
            temperature,
            annealing_factor,
            max_mutate_cluster_size,
        })
    }

    /// Parameters with default temperature, annealing factor and cluster size.
    pub fn with_defaults(max_generation: usize, population_size: usize, dna_length: usize) -> Self {
        Self {
            max_generation,
            population_size,
            dna_length,
            temperature: DEFAULT_TEMPERATURE,
            annealing_factor: DEFAULT_ANNEALING_FACTOR,
            max_mutate_cluster_size: DEFAULT_MAX_MUTATE_CLUSTER_SIZE,
        }
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(OptimizerError::invalid(name, format!("must be finite and >= 0, got {value}")));
    }
    Ok(())
}

/// Configuration of a [`Solver`](crate::Solver) run.
///
/// `generations` and `population_size` are derived from the reduced search space size when left
/// unset: 100 generations and a population of 1.5 times the DNA length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub generations: Option<usize>,
    pub population_size: Option<usize>,
    pub temperature: f64,
    pub annealing_factor: f64,
    pub max_mutate_cluster_size: usize,
    /// Number of times the genetic algorithm is restarted from the seed solution.
    pub iterations: usize,
    /// Run the hill climber over the best solution after the last generation.
    pub final_hill_climb: bool,
    /// Seed for all random draws. `None` picks one from the OS.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            generations: None,
            population_size: None,
            temperature: DEFAULT_TEMPERATURE,
            annealing_factor: DEFAULT_ANNEALING_FACTOR,
            max_mutate_cluster_size: DEFAULT_MAX_MUTATE_CLUSTER_SIZE,
            iterations: 1,
            final_hill_climb: true,
            seed: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations < 1 {
            return Err(OptimizerError::invalid("iterations", "must be >= 1"));
        }
        // Same checks as the GA parameters; dimensions are only known after preprocessing.
        GeneticAlgorithmParameters::new(
            0,
            0,
            0,
            self.temperature,
            self.annealing_factor,
            self.max_mutate_cluster_size,
        )
        .map(|_| ())
    }

    /// Resolves the GA parameters for a search space with `dna_length` candidate nodes.
    pub fn ga_parameters(&self, dna_length: usize) -> Result<GeneticAlgorithmParameters> {
        let population_size = self
            .population_size
            .unwrap_or_else(|| (1.5 * dna_length as f64) as usize);
        GeneticAlgorithmParameters::new(
            self.generations.unwrap_or(100),
            population_size,
            dna_length,
            self.temperature,
            self.annealing_factor,
            self.max_mutate_cluster_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_cluster_size() {
        let err = GeneticAlgorithmParameters::new(10, 10, 10, 6.0, 1.0, 0).unwrap_err();
        assert!(matches!(
            err,
            OptimizerError::InvalidParameter { name: "max_mutate_cluster_size", .. }
        ));
    }

    #[test]
    fn rejects_negative_temperature() {
        assert!(GeneticAlgorithmParameters::new(10, 10, 10, -1.0, 1.0, 1).is_err());
        assert!(GeneticAlgorithmParameters::new(10, 10, 10, f64::NAN, 1.0, 1).is_err());
        assert!(GeneticAlgorithmParameters::new(10, 10, 10, 6.0, -0.5, 1).is_err());
    }

    #[test]
    fn derived_parameters_scale_with_dna() {
        let params = SolverConfig::default().ga_parameters(20).unwrap();
        assert_eq!(params.population_size, 30);
        assert_eq!(params.max_generation, 100);
        assert_eq!(params.dna_length, 20);
    }

    #[test]
    fn config_validation() {
        assert!(SolverConfig::default().validate().is_ok());
        let config = SolverConfig { iterations: 0, ..SolverConfig::default() };
        assert!(config.validate().is_err());
        let config = SolverConfig { max_mutate_cluster_size: 0, ..SolverConfig::default() };
        assert!(config.validate().is_err());
    }
}
