//! Schedule repair orchestration.
//!
//! [`engine`] builds and solves the constraint model; this module
//! decides when to invoke it and recovers from every failure kind with
//! the deterministic time-shift fallback, so repair as a whole is total:
//! any input schedule comes back feasible.

pub mod engine;

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::config::EngineConfig;
use crate::cp::{BoundedCpSolver, CpSolver};
use crate::error::RepairOutcome;
use crate::models::Schedule;

pub use engine::ConstraintRepairEngine;

/// Repairs a schedule per the config, using the bundled solver backend.
///
/// Returns the repaired schedule and whether the constraint solver (as
/// opposed to the fallback) produced it.
pub fn run_repair(schedule: &Schedule, config: &EngineConfig) -> (Schedule, bool) {
    run_repair_with(schedule, config, &BoundedCpSolver::new())
}

/// Repairs a schedule with a caller-supplied solver backend.
///
/// When constraint repair is disabled, or the engine reports any
/// non-success outcome, the time-shift fallback runs instead — logged as
/// a warning, never an error.
pub fn run_repair_with<S: CpSolver>(
    schedule: &Schedule,
    config: &EngineConfig,
    solver: &S,
) -> (Schedule, bool) {
    if !config.use_constraint_repair {
        return (time_shift_repair(schedule), false);
    }

    let engine = ConstraintRepairEngine::from_config(config);
    match engine.run(schedule, solver) {
        RepairOutcome::Success(repaired) => (repaired, true),
        outcome @ (RepairOutcome::Infeasible
        | RepairOutcome::Timeout
        | RepairOutcome::TooLarge
        | RepairOutcome::SolverError(_)) => {
            warn!(
                outcome = outcome.label(),
                operations = schedule.len(),
                "constraint repair unavailable, falling back to time-shift"
            );
            (time_shift_repair(schedule), false)
        }
    }
}

/// Deterministic greedy repair: replay rows in `(order_id, op_seq)`
/// order, placing each at `max(original start, order's last end,
/// resource's last end)`.
///
/// Total: terminates on any input and always yields a feasible
/// (non-overlapping, precedence-respecting) schedule, though not a
/// cost-optimized one.
pub fn time_shift_repair(schedule: &Schedule) -> Schedule {
    let mut rows = schedule.operations.clone();
    rows.sort_by(|a, b| {
        (a.operation.order_id.as_str(), a.operation.op_seq)
            .cmp(&(b.operation.order_id.as_str(), b.operation.op_seq))
    });

    let mut resource_last: HashMap<String, NaiveDateTime> = HashMap::new();
    let mut order_last: HashMap<String, NaiveDateTime> = HashMap::new();

    for row in &mut rows {
        let mut start = row.start_dt;
        if let Some(&ready) = order_last.get(&row.operation.order_id) {
            start = start.max(ready);
        }
        if let Some(&ready) = resource_last.get(&row.operation.resource_code) {
            start = start.max(ready);
        }
        row.shift_to(start);
        order_last.insert(row.operation.order_id.clone(), row.end_dt);
        resource_last.insert(row.operation.resource_code.clone(), row.end_dt);
    }

    Schedule { operations: rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpModel, CpSolution, SolverConfig, SolverFailure};
    use crate::models::{Operation, ScheduledOperation};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn overlapping_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("O1", 0, "M1", 60),
            dt(8, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("O2", 0, "M1", 60),
            dt(8, 30),
        ));
        s
    }

    #[test]
    fn test_time_shift_sequences_overlap() {
        let repaired = time_shift_repair(&overlapping_schedule());
        assert!(!repaired.has_resource_overlap());
        // O1 keeps 08:00-09:00, O2 shifts to 09:00-10:00
        let o1 = &repaired.operations_for_order("O1")[0];
        let o2 = &repaired.operations_for_order("O2")[0];
        assert_eq!(o1.start_dt, dt(8, 0));
        assert_eq!(o2.start_dt, dt(9, 0));
        assert_eq!(o2.end_dt, dt(10, 0));
    }

    #[test]
    fn test_time_shift_fixes_precedence() {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("O1", 0, "M1", 60),
            dt(10, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("O1", 1, "M2", 90),
            dt(8, 0),
        ));

        let repaired = time_shift_repair(&s);
        assert!(repaired.respects_precedence());
        let ops = repaired.operations_for_order("O1");
        let first = ops.iter().find(|o| o.operation.op_seq == 0).unwrap();
        let second = ops.iter().find(|o| o.operation.op_seq == 1).unwrap();
        assert!(second.start_dt >= first.end_dt);
    }

    #[test]
    fn test_time_shift_total_on_fully_conflicting_input() {
        // Ten operations all claiming the same slot on one machine
        let mut s = Schedule::new();
        for i in 0..10 {
            s.push(ScheduledOperation::new(
                Operation::new(format!("J{i}"), 0, "M1", 30),
                dt(8, 0),
            ));
        }
        let repaired = time_shift_repair(&s);
        assert!(!repaired.has_resource_overlap());
        assert!(repaired.respects_precedence());
        assert_eq!(repaired.makespan_minutes(), 300);
    }

    #[test]
    fn test_time_shift_idempotent_on_feasible() {
        let repaired = time_shift_repair(&overlapping_schedule());
        let again = time_shift_repair(&repaired);
        assert_eq!(again, repaired);
    }

    #[test]
    fn test_runner_uses_solver_when_enabled() {
        let config = EngineConfig::default();
        let (repaired, applied) = run_repair(&overlapping_schedule(), &config);
        assert!(applied);
        assert!(!repaired.has_resource_overlap());
    }

    #[test]
    fn test_runner_skips_solver_when_disabled() {
        let config = EngineConfig::default().with_constraint_repair(false);
        let (repaired, applied) = run_repair(&overlapping_schedule(), &config);
        assert!(!applied);
        assert!(!repaired.has_resource_overlap());
    }

    #[test]
    fn test_runner_falls_back_on_too_large() {
        let config = EngineConfig::default().with_max_tasks_for_repair(1);
        let (repaired, applied) = run_repair(&overlapping_schedule(), &config);
        assert!(!applied);
        assert!(!repaired.has_resource_overlap());
    }

    /// A backend that always crashes, to exercise the solver-error path.
    struct FailingSolver;

    impl CpSolver for FailingSolver {
        fn solve(&self, _: &CpModel, _: &SolverConfig) -> Result<CpSolution, SolverFailure> {
            Err(SolverFailure("backend crashed".into()))
        }
    }

    #[test]
    fn test_runner_falls_back_on_solver_error() {
        let config = EngineConfig::default();
        let (repaired, applied) =
            run_repair_with(&overlapping_schedule(), &config, &FailingSolver);
        assert!(!applied);
        assert!(!repaired.has_resource_overlap());
        assert!(repaired.respects_precedence());
    }
}
