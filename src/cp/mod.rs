//! Constraint-programming formulation and solving.
//!
//! [`model`] describes a repair problem as interval variables over
//! integer minute offsets with no-overlap, precedence, and availability
//! constraints; [`solver`] provides the narrow [`CpSolver`] seam and the
//! bundled bounded-time constructive backend.
//!
//! # Reference
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod model;
pub mod solver;

pub use model::{CpConstraint, CpModel, CpObjective, IntervalVar};
pub use solver::{BoundedCpSolver, CpSolution, CpSolver, CpStatus, SolverConfig, SolverFailure};
