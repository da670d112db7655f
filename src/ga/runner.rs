//! GA orchestration: seeding, evolution, termination.
//!
//! # Lifecycle
//!
//! Init → Evolve* → Terminate. The initial population mixes three
//! seeding heuristics (random interleavings, earliest-due-date,
//! shortest-processing-time); each generation carries elites forward and
//! refills with tournament-selected, crossed-over, mutated offspring.
//! The run stops at the generation limit or after
//! [`EARLY_STOP_GENERATIONS`] without improvement.
//!
//! # Determinism
//! All randomness flows from one `SmallRng` seeded by the config, so a
//! given seed reproduces the identical result. Parallel fitness
//! evaluation only reads the immutable job list and writes each
//! individual's own score, so it does not perturb determinism.

use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use super::chromosome::{create_random_chromosome, decode, order_groups, Chromosome};
use super::fitness::fitness;
use super::operators::{elites, tournament_select, GeneticOperators};
use crate::config::{CancelToken, ObjectiveWeights};
use crate::models::{Operation, Schedule};

/// Generations without improvement before the run stops early.
pub const EARLY_STOP_GENERATIONS: usize = 30;

/// GA runner configuration.
#[derive(Debug, Clone)]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Generation limit.
    pub max_generations: usize,
    /// Probability of crossover per parent pair.
    pub crossover_rate: f64,
    /// Probability of mutation per offspring.
    pub mutation_rate: f64,
    /// Individuals copied unchanged into the next generation.
    pub elite_size: usize,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Objective weights.
    pub weights: ObjectiveWeights,
    /// Crossover/mutation strategies.
    pub operators: GeneticOperators,
    /// Evaluate fitness in parallel.
    pub parallel: bool,
    /// Seed for the run's random source.
    pub seed: u64,
    /// Cooperative cancellation, checked between generations.
    pub cancel: CancelToken,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_size: 2,
            tournament_size: 3,
            weights: ObjectiveWeights::default(),
            operators: GeneticOperators::default(),
            parallel: false,
            seed: 42,
            cancel: CancelToken::new(),
        }
    }
}

impl GaConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the generation limit.
    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables parallel fitness evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the objective weights.
    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult {
    /// Best chromosome found across all generations.
    pub best: Chromosome,
    /// The best chromosome's decoded schedule.
    pub best_schedule: Schedule,
    /// The best fitness (lower = better).
    pub best_fitness: f64,
    /// Generations actually run.
    pub generations: usize,
    /// Best-known fitness after each generation.
    pub history: Vec<f64>,
}

/// Genetic-algorithm runner.
pub struct GaRunner;

impl GaRunner {
    /// Runs the GA over the given operations.
    ///
    /// An empty job list short-circuits to the sentinel empty result
    /// (empty schedule, zero generations) without entering the loop.
    pub fn run(operations: &[Operation], config: &GaConfig) -> GaResult {
        if operations.is_empty() {
            return GaResult {
                best: Chromosome::new(Vec::new()),
                best_schedule: Schedule::new(),
                best_fitness: f64::INFINITY,
                generations: 0,
                history: Vec::new(),
            };
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let population_size = config.population_size.max(2);
        let elite_size = config.elite_size.min(population_size - 1);

        let mut population = seed_population(operations, population_size, &mut rng);
        evaluate_population(&mut population, operations, &config.weights, config.parallel);

        let mut best = best_of(&population).clone();
        let mut best_schedule = decode(&best, operations);
        let mut history = Vec::with_capacity(config.max_generations);
        let mut stale = 0usize;
        let mut generations = 0usize;

        for generation in 0..config.max_generations {
            if config.cancel.is_cancelled() {
                debug!(generation, "cancellation requested, stopping evolution");
                break;
            }

            let mut next = elites(&population, elite_size);
            while next.len() < population_size {
                let p1 = tournament_select(&population, config.tournament_size, &mut rng);
                let p2 = tournament_select(&population, config.tournament_size, &mut rng);

                let (mut c1, mut c2) = if rng.random_bool(config.crossover_rate) {
                    config.operators.crossover(p1, p2, operations, &mut rng)
                } else {
                    (p1.clone(), p2.clone())
                };

                if rng.random_bool(config.mutation_rate) {
                    config.operators.mutate(&mut c1, operations, &mut rng);
                }
                if rng.random_bool(config.mutation_rate) {
                    config.operators.mutate(&mut c2, operations, &mut rng);
                }

                next.push(c1);
                if next.len() < population_size {
                    next.push(c2);
                }
            }

            population = next;
            evaluate_population(&mut population, operations, &config.weights, config.parallel);
            generations = generation + 1;

            let generation_best = best_of(&population);
            if generation_best.fitness < best.fitness {
                best = generation_best.clone();
                best_schedule = decode(&best, operations);
                stale = 0;
            } else {
                stale += 1;
            }
            history.push(best.fitness);
            debug!(
                generation,
                best_fitness = best.fitness,
                stale,
                "generation complete"
            );

            if stale >= EARLY_STOP_GENERATIONS {
                debug!(generation, "early stop: no improvement");
                break;
            }
        }

        GaResult {
            best_fitness: best.fitness,
            best_schedule,
            best,
            generations,
            history,
        }
    }
}

/// Builds the initial population: 50% random interleavings, 25% EDD,
/// 25% SPT.
fn seed_population<R: rand::Rng>(
    operations: &[Operation],
    population_size: usize,
    rng: &mut R,
) -> Vec<Chromosome> {
    let quarter = population_size / 4;
    let mut population = Vec::with_capacity(population_size);

    for _ in 0..quarter {
        population.push(edd_chromosome(operations));
    }
    for _ in 0..quarter {
        population.push(spt_chromosome(operations));
    }
    while population.len() < population_size {
        population.push(create_random_chromosome(operations, rng));
    }
    population
}

/// Earliest-due-date seed: orders sorted by their earliest due date
/// (orders without one go last), operations in `op_seq` order.
fn edd_chromosome(operations: &[Operation]) -> Chromosome {
    let mut groups = order_groups(operations);
    groups.sort_by_key(|(_, indices)| {
        indices
            .iter()
            .filter_map(|&i| operations[i].due_date)
            .min()
            .map_or((1, chrono::NaiveDateTime::default()), |due| (0, due))
    });
    Chromosome::new(groups.into_iter().flat_map(|(_, indices)| indices).collect())
}

/// Shortest-processing-time seed: orders sorted by ascending total
/// processing time, operations in `op_seq` order.
fn spt_chromosome(operations: &[Operation]) -> Chromosome {
    let mut groups = order_groups(operations);
    groups.sort_by_key(|(_, indices)| {
        indices
            .iter()
            .map(|&i| operations[i].duration_minutes)
            .sum::<i64>()
    });
    Chromosome::new(groups.into_iter().flat_map(|(_, indices)| indices).collect())
}

/// Evaluates every unevaluated chromosome via decode + weighted fitness.
fn evaluate_population(
    population: &mut [Chromosome],
    operations: &[Operation],
    weights: &ObjectiveWeights,
    parallel: bool,
) {
    let evaluate = |ch: &mut Chromosome| {
        if ch.fitness.is_infinite() {
            ch.fitness = fitness(&decode(ch, operations), weights);
        }
    };
    if parallel {
        population.par_iter_mut().for_each(evaluate);
    } else {
        population.iter_mut().for_each(evaluate);
    }
}

fn best_of(population: &[Chromosome]) -> &Chromosome {
    population
        .iter()
        .min_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal))
        .expect("population is never empty")
}
