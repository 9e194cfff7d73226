//! Genetic algorithm over fixed-length DNA.
//!
//! Every generation the less fit half of the population is culled. Survivors are mutated, and a
//! mutation that lowers fitness only replaces its original with a probability that shrinks with
//! the loss in rank and the temperature. Survivors that already lived through a previous culling
//! are the parents of the crossovers refilling the population.
//!
//! The fitness function runs on many threads at once and must be pure.

mod dna;
mod individual;
mod operations;
mod sampler;

pub use dna::Dna;
pub use individual::Individual;
pub use operations::DnaOperation;
pub use sampler::WeightedSampler;

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::config::GeneticAlgorithmParameters;
use crate::error::{OptimizerError, Result};

pub struct GeneticAlgorithm<F> {
    fitness: F,
    parameters: GeneticAlgorithmParameters,
    // Fitness per DNA, cleared between iterations.
    fitness_cache: DashMap<Dna, f64>,
    initial_dna: Dna,
    population: Vec<Individual>,
    best: Individual,
    temperature: f64,
    generation: usize,
    iteration: usize,
    seed: u64,
}

impl<F> GeneticAlgorithm<F>
where
    F: Fn(&Dna) -> f64 + Sync,
{
    /// Starts the first iteration. `initial_dna` defaults to all bits unset and seeds the
    /// population; `seed` makes the run reproducible.
    pub fn new(
        fitness: F,
        parameters: GeneticAlgorithmParameters,
        initial_dna: Option<Dna>,
        seed: u64,
    ) -> Result<Self> {
        let initial_dna = initial_dna.unwrap_or_else(|| Dna::new(parameters.dna_length));
        if initial_dna.len() != parameters.dna_length {
            return Err(OptimizerError::invalid(
                "initial_dna",
                format!("expected {} bits, got {}", parameters.dna_length, initial_dna.len()),
            ));
        }
        let mut ga = GeneticAlgorithm {
            fitness,
            parameters,
            fitness_cache: DashMap::new(),
            best: Individual::new(initial_dna.clone(), 0.0),
            initial_dna,
            population: Vec::new(),
            temperature: parameters.temperature,
            generation: 0,
            iteration: 0,
            seed,
        };
        ga.population = ga.create_population()?;
        ga.update_best();
        Ok(ga)
    }

    pub fn parameters(&self) -> &GeneticAlgorithmParameters {
        &self.parameters
    }

    /// Generations evolved in the current iteration.
    pub fn generation_count(&self) -> usize {
        self.generation
    }

    pub fn max_generation(&self) -> usize {
        self.parameters.max_generation
    }

    /// Iterations started before the current one.
    pub fn current_iteration(&self) -> usize {
        self.iteration
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// The fittest DNA seen in any generation of any iteration.
    pub fn best_dna(&self) -> &Dna {
        &self.best.dna
    }

    pub fn best_fitness(&self) -> f64 {
        self.best.fitness
    }

    /// Restarts evolution around the initial DNA. The best individual is kept.
    pub fn next_iteration(&mut self) -> Result<()> {
        self.iteration += 1;
        self.generation = 0;
        self.temperature = self.parameters.temperature;
        self.fitness_cache.clear();
        self.population = self.create_population()?;
        self.update_best();
        debug!(iteration = self.iteration, best_fitness = self.best.fitness, "started iteration");
        Ok(())
    }

    /// Evolves the population by one generation and returns the generation count.
    pub fn new_generation(&mut self) -> Result<usize> {
        self.generation += 1;
        let population_size = self.parameters.population_size;
        if self.population.is_empty() {
            return Ok(self.generation);
        }

        // ----- Culling -----
        let mut sorted = std::mem::take(&mut self.population);
        sorted.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        let mut sampler = WeightedSampler::new();
        let mut survivors = Vec::with_capacity(sorted.len());
        for (position, individual) in sorted.iter().enumerate() {
            let rank = position + 1;
            if (rank as f64) < 0.5 * population_size as f64 {
                continue;
            }
            // Only individuals that survived a culling before may reproduce.
            if individual.age >= 1 {
                sampler.add_entry(individual.dna.clone(), individual.fitness)?;
            }
            let mut survivor = individual.clone();
            survivor.rank = rank;
            survivor.age += 1;
            survivors.push(survivor);
        }

        // ----- Mutation -----
        let sorted_fitness: Vec<f64> = sorted.iter().map(|i| i.fitness).collect();
        let temperature = self.temperature;
        let mutated = survivors
            .into_par_iter()
            .enumerate()
            .map(|(task, original)| {
                let mut rng = self.task_rng(task);
                let operation = DnaOperation::random_flip(
                    &mut rng,
                    self.parameters.dna_length,
                    self.parameters.max_mutate_cluster_size,
                );
                let mut mutation = self.spawn(operation.apply(&original.dna, &original.dna))?;
                mutation.age = original.age;
                mutation.rank = original.rank;
                let accepted = accept_mutation(&original, &mutation, &sorted_fitness, temperature, &mut rng);
                Ok(if accepted { mutation } else { original })
            })
            .collect::<Result<Vec<Individual>>>()?;

        if !sampler.can_sample() {
            warn!(
                generation = self.generation,
                iteration = self.iteration,
                "entire population was infertile, regenerating it"
            );
            self.population = self.create_population()?;
            return Ok(self.generation);
        }

        // ----- Crossover -----
        let offset = mutated.len();
        let children = (offset..population_size)
            .into_par_iter()
            .filter_map(|task| {
                let mut rng = self.task_rng(task);
                let first = sampler.sample(&mut rng)?;
                let second = sampler.sample(&mut rng)?;
                let operation = DnaOperation::random_crossover(&mut rng, self.parameters.dna_length);
                Some(self.spawn(operation.apply(first, second)))
            })
            .collect::<Result<Vec<Individual>>>()?;

        self.population = mutated;
        self.population.extend(children);
        self.update_best();
        self.temperature *= self.parameters.annealing_factor;

        trace!(
            generation = self.generation,
            best_fitness = self.best.fitness,
            temperature = self.temperature,
            parents = sampler.len(),
            "finished generation"
        );
        Ok(self.generation)
    }

    /// Independent random stream for one parallel task of the current generation.
    fn task_rng(&self, task: usize) -> ChaCha8Rng {
        let stream = ((self.iteration as u64) << 48) ^ ((self.generation as u64) << 32) ^ task as u64;
        ChaCha8Rng::seed_from_u64(self.seed ^ stream)
    }

    fn spawn(&self, dna: Dna) -> Result<Individual> {
        let fitness = match self.fitness_cache.get(&dna) {
            Some(fitness) => *fitness,
            None => {
                let fitness = (self.fitness)(&dna);
                if !fitness.is_finite() || fitness < 0.0 {
                    return Err(OptimizerError::NegativeFitness(fitness));
                }
                self.fitness_cache.insert(dna.clone(), fitness);
                fitness
            }
        };
        Ok(Individual::new(dna, fitness))
    }

    /// The initial DNA plus variants of it with one random bit flipped. All of them may
    /// reproduce right away.
    fn create_population(&self) -> Result<Vec<Individual>> {
        let population_size = self.parameters.population_size;
        if population_size == 0 {
            return Ok(Vec::new());
        }
        let mut seed_individual = self.spawn(self.initial_dna.clone())?;
        seed_individual.age = 1;

        let variants = (1..population_size)
            .into_par_iter()
            .map(|task| {
                let mut dna = self.initial_dna.clone();
                if !dna.is_empty() {
                    let mut rng = self.task_rng(task);
                    dna.flip(rng.gen_range(0..dna.len()));
                }
                let mut individual = self.spawn(dna)?;
                individual.age = 1;
                Ok(individual)
            })
            .collect::<Result<Vec<Individual>>>()?;

        let mut population = Vec::with_capacity(population_size);
        population.push(seed_individual);
        population.extend(variants);
        Ok(population)
    }

    fn update_best(&mut self) {
        for individual in &self.population {
            if individual.fitness > self.best.fitness {
                self.best = individual.clone();
            }
        }
    }
}

/// A mutation that is not worse than its original is always accepted. A worse one is accepted
/// with probability `exp(rank_delta / temperature)`, where `rank_delta` is the (negative) number
/// of positions it would fall in the sorted population.
fn accept_mutation<R: Rng>(
    original: &Individual,
    mutation: &Individual,
    sorted_fitness: &[f64],
    temperature: f64,
    rng: &mut R,
) -> bool {
    if mutation.fitness >= original.fitness {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    let new_rank = sorted_fitness.partition_point(|&f| f < mutation.fitness) + 1;
    let rank_delta = new_rank as f64 - original.rank as f64;
    rng.gen::<f64>() < (rank_delta / temperature).exp()
}
