//! Hybrid scheduling-optimization engine.
//!
//! Schedules precedence-linked operations onto capacity-limited
//! resources, minimizing a weighted mix of makespan, tardiness, and
//! deviation from the released plan. Two stages cooperate: a genetic
//! algorithm with local-search refinement finds a good schedule, and a
//! constraint-programming repair pass makes any candidate provably
//! feasible (no resource overlaps, precedence respected, calendars
//! honored), with a deterministic greedy fallback when the solver is
//! skipped, refused, or fails.
//!
//! # Modules
//!
//! - **`models`**: domain types — `Operation`, `Schedule`, `Calendar`,
//!   `RiskTable`
//! - **`ga`**: permutation encoding, genetic operators, fitness, runner
//! - **`local_search`**: swap/insertion neighborhoods, annealing, VNS
//! - **`cp`**: interval constraint model and the bounded-time solver
//! - **`repair`**: constraint repair engine, runner, time-shift fallback
//! - **`engine`**: the end-to-end pipeline
//! - **`validation`**: structural input checks
//!
//! # Example
//!
//! ```
//! use schedopt::{EngineConfig, Operation, SchedulingEngine};
//!
//! let operations = vec![
//!     Operation::new("ORD-1", 0, "CNC-1", 45),
//!     Operation::new("ORD-1", 1, "PAINT", 30),
//!     Operation::new("ORD-2", 0, "CNC-1", 60),
//! ];
//! let engine = SchedulingEngine::new(
//!     EngineConfig::default()
//!         .with_population_size(20)
//!         .with_max_generations(10)
//!         .with_seed(7),
//! );
//! let result = engine.run(&operations).unwrap();
//! assert!(!result.schedule.has_resource_overlap());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Cheng et al. (1996), "A Tutorial Survey of JSSP using GA"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod config;
pub mod cp;
pub mod engine;
pub mod error;
pub mod ga;
pub mod local_search;
pub mod metrics;
pub mod models;
pub mod repair;
pub mod validation;

pub use config::{CancelToken, EngineConfig, ObjectiveWeights};
pub use engine::{ScheduleResult, SchedulingEngine};
pub use error::{RepairOutcome, ScheduleError};
pub use metrics::ScheduleMetrics;
pub use models::{Calendar, Operation, RiskTable, Schedule, ScheduledOperation, TimeWindow};
