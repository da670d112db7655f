//! Engine configuration.
//!
//! One configuration object drives the whole pipeline: GA parameters,
//! objective weights, local-search and constraint-repair switches, and
//! the collaborator inputs (risk table, resource calendars). All
//! randomness in the pipeline derives from `random_seed`, so identical
//! configs on identical inputs reproduce identical schedules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::{Calendar, RiskTable};

/// Weights combining the schedule objectives into one scalar cost.
///
/// Lower cost is better. Tardiness is weighted heaviest by default:
/// missing due dates hurts more than a longer makespan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Weight on makespan minutes.
    pub makespan_weight: f64,
    /// Weight on total tardiness minutes.
    pub tardiness_weight: f64,
    /// Weight on total deviation-from-plan minutes.
    pub deviation_weight: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            makespan_weight: 1.0,
            tardiness_weight: 2.0,
            deviation_weight: 0.5,
        }
    }
}

/// Cooperative cancellation flag, checked between generations and
/// between solver invocations.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for the scheduling pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// GA population size.
    pub population_size: usize,
    /// Maximum GA generations.
    pub max_generations: usize,
    /// Probability of crossover per parent pair.
    pub crossover_rate: f64,
    /// Probability of mutation per offspring.
    pub mutation_rate: f64,
    /// Individuals copied unchanged into the next generation.
    pub elite_size: usize,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Objective weights for fitness and repair.
    pub objective_weights: ObjectiveWeights,
    /// Whether to refine the GA's best schedule with local search.
    pub use_local_search: bool,
    /// Local-search iteration budget.
    pub local_search_iterations: usize,
    /// Whether to attempt constraint-programming repair.
    pub use_constraint_repair: bool,
    /// Wall-clock budget for one solver invocation.
    pub constraint_timeout_seconds: u64,
    /// Row-count guard: larger problems skip the solver entirely.
    pub max_tasks_for_repair: usize,
    /// Whether repair honors resource availability calendars.
    pub use_calendar: bool,
    /// Whether repair enforces per-resource no-overlap constraints.
    pub use_resource_constraints: bool,
    /// Per-resource down-risk scores (empty = no penalty).
    pub risk_table: RiskTable,
    /// Weight of the risk penalty in the repair objective.
    pub risk_weight: f64,
    /// Seed for all stochastic components.
    pub random_seed: u64,
    /// Resource availability calendars, keyed by resource code.
    /// Missing entries mean 24/7 availability.
    pub calendars: HashMap<String, Calendar>,
    /// Evaluate population fitness in parallel.
    pub parallel: bool,
    /// Cooperative cancellation flag.
    pub cancel: CancelToken,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_size: 2,
            tournament_size: 3,
            objective_weights: ObjectiveWeights::default(),
            use_local_search: true,
            local_search_iterations: 50,
            use_constraint_repair: true,
            constraint_timeout_seconds: 10,
            max_tasks_for_repair: 500,
            use_calendar: false,
            use_resource_constraints: true,
            risk_table: RiskTable::new(),
            risk_weight: 0.0,
            random_seed: 42,
            calendars: HashMap::new(),
            parallel: false,
            cancel: CancelToken::new(),
        }
    }
}

impl EngineConfig {
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

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_size(mut self, size: usize) -> Self {
        self.elite_size = size;
        self
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size.max(1);
        self
    }

    /// Sets the objective weights.
    pub fn with_objective_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.objective_weights = weights;
        self
    }

    /// Enables or disables local-search refinement.
    pub fn with_local_search(mut self, enabled: bool) -> Self {
        self.use_local_search = enabled;
        self
    }

    /// Sets the local-search iteration budget.
    pub fn with_local_search_iterations(mut self, iterations: usize) -> Self {
        self.local_search_iterations = iterations;
        self
    }

    /// Enables or disables constraint-programming repair.
    pub fn with_constraint_repair(mut self, enabled: bool) -> Self {
        self.use_constraint_repair = enabled;
        self
    }

    /// Sets the solver wall-clock budget in seconds.
    pub fn with_constraint_timeout_seconds(mut self, seconds: u64) -> Self {
        self.constraint_timeout_seconds = seconds;
        self
    }

    /// Sets the solver row-count guard.
    pub fn with_max_tasks_for_repair(mut self, max_tasks: usize) -> Self {
        self.max_tasks_for_repair = max_tasks;
        self
    }

    /// Enables calendar-aware repair.
    pub fn with_use_calendar(mut self, enabled: bool) -> Self {
        self.use_calendar = enabled;
        self
    }

    /// Enables or disables no-overlap constraints in repair.
    pub fn with_resource_constraints(mut self, enabled: bool) -> Self {
        self.use_resource_constraints = enabled;
        self
    }

    /// Supplies the down-risk table and its objective weight.
    pub fn with_risk(mut self, table: RiskTable, weight: f64) -> Self {
        self.risk_table = table;
        self.risk_weight = weight;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Supplies resource calendars.
    pub fn with_calendars(mut self, calendars: HashMap<String, Calendar>) -> Self {
        self.calendars = calendars;
        self
    }

    /// Enables or disables parallel fitness evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}
