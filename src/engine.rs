//! Scheduling pipeline orchestration.
//!
//! Wires the stages together: validate → GA search → local-search
//! refinement → repair → metrics. Every stage after validation is
//! total, so valid input always yields a feasible schedule — the repair
//! pass (solver or time-shift fallback) runs unconditionally to
//! guarantee resource exclusivity even after local-search moves.

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ScheduleError;
use crate::ga::{GaConfig, GaRunner};
use crate::local_search::local_search;
use crate::metrics::ScheduleMetrics;
use crate::models::{Operation, Schedule};
use crate::repair::{run_repair, time_shift_repair};
use crate::validation::validate_operations;

/// Output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// The final feasible schedule.
    pub schedule: Schedule,
    /// Reporting metrics for the final schedule.
    pub metrics: ScheduleMetrics,
    /// Whether the constraint solver (not the fallback) produced the
    /// final schedule.
    pub repair_applied: bool,
    /// GA generations actually run.
    pub generations_run: usize,
    /// Wall-clock time of the whole run in seconds.
    pub computation_time_seconds: f64,
}

/// The hybrid scheduling-optimization engine.
///
/// # Example
/// ```
/// use schedopt::engine::SchedulingEngine;
/// use schedopt::config::EngineConfig;
/// use schedopt::models::Operation;
///
/// let operations = vec![
///     Operation::new("ORD-1", 0, "M1", 60),
///     Operation::new("ORD-1", 1, "M2", 30),
///     Operation::new("ORD-2", 0, "M1", 45),
/// ];
/// let config = EngineConfig::default()
///     .with_population_size(20)
///     .with_max_generations(10);
/// let result = SchedulingEngine::new(config).run(&operations).unwrap();
/// assert_eq!(result.metrics.total_jobs, 2);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulingEngine {
    config: EngineConfig,
}

impl SchedulingEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the full pipeline over the given operations.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidInput`] for structurally invalid input
    /// (non-positive durations, duplicate or gapped `op_seq`). An empty
    /// operation list is valid and yields the empty result.
    pub fn run(&self, operations: &[Operation]) -> Result<ScheduleResult, ScheduleError> {
        validate_operations(operations).map_err(ScheduleError::InvalidInput)?;
        let started = Instant::now();

        if operations.is_empty() {
            return Ok(ScheduleResult {
                schedule: Schedule::new(),
                metrics: ScheduleMetrics::default(),
                repair_applied: false,
                generations_run: 0,
                computation_time_seconds: started.elapsed().as_secs_f64(),
            });
        }

        let ga_config = GaConfig {
            population_size: self.config.population_size,
            max_generations: self.config.max_generations,
            crossover_rate: self.config.crossover_rate,
            mutation_rate: self.config.mutation_rate,
            elite_size: self.config.elite_size,
            tournament_size: self.config.tournament_size,
            weights: self.config.objective_weights,
            operators: Default::default(),
            parallel: self.config.parallel,
            seed: self.config.random_seed,
            cancel: self.config.cancel.clone(),
        };
        let ga = GaRunner::run(operations, &ga_config);
        debug!(
            generations = ga.generations,
            best_fitness = ga.best_fitness,
            "ga search finished"
        );
        let mut schedule = ga.best_schedule;

        if self.config.use_local_search && !self.config.cancel.is_cancelled() {
            let mut rng = SmallRng::seed_from_u64(self.config.random_seed.wrapping_add(1));
            schedule = local_search(
                &schedule,
                &self.config.objective_weights,
                self.config.local_search_iterations,
                &mut rng,
            );
        }

        let (schedule, repair_applied) = if self.config.cancel.is_cancelled() {
            (time_shift_repair(&schedule), false)
        } else {
            run_repair(&schedule, &self.config)
        };

        let metrics = ScheduleMetrics::calculate(&schedule);
        Ok(ScheduleResult {
            schedule,
            metrics,
            repair_applied,
            generations_run: ga.generations,
            computation_time_seconds: started.elapsed().as_secs_f64(),
        })
    }
}
