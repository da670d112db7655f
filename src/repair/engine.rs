//! Constraint-repair engine.
//!
//! Turns any candidate schedule into a provably feasible one:
//! Preprocess → Model → Solve → Extract, or a failure signal the runner
//! recovers from. Timestamps are normalized to integer minute offsets
//! from the schedule's earliest start; the solved offsets are mapped
//! back to absolute times on extraction.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::config::{EngineConfig, ObjectiveWeights};
use crate::cp::{CpModel, CpObjective, CpSolver, CpStatus, IntervalVar, SolverConfig};
use crate::error::RepairOutcome;
use crate::models::{Calendar, RiskTable, Schedule};

/// Builds and solves the repair constraint model for one schedule.
#[derive(Debug, Clone)]
pub struct ConstraintRepairEngine {
    /// Objective weights shared with the metaheuristic.
    pub weights: ObjectiveWeights,
    /// Down-risk scores for the risk penalty.
    pub risk_table: RiskTable,
    /// Weight of the risk penalty.
    pub risk_weight: f64,
    /// Resource calendars, offsets relative to the schedule's earliest
    /// start.
    pub calendars: HashMap<String, Calendar>,
    /// Whether availability constraints are added.
    pub use_calendar: bool,
    /// Whether per-resource no-overlap constraints are added.
    pub use_resource_constraints: bool,
    /// Row-count guard.
    pub max_tasks: usize,
    /// Solver wall-clock budget.
    pub timeout: StdDuration,
    /// Solver restart seed.
    pub seed: u64,
}

impl ConstraintRepairEngine {
    /// Extracts the repair-relevant settings from the engine config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            weights: config.objective_weights,
            risk_table: config.risk_table.clone(),
            risk_weight: config.risk_weight,
            calendars: config.calendars.clone(),
            use_calendar: config.use_calendar,
            use_resource_constraints: config.use_resource_constraints,
            max_tasks: config.max_tasks_for_repair,
            timeout: StdDuration::from_secs(config.constraint_timeout_seconds),
            seed: config.random_seed,
        }
    }

    /// Repairs a schedule with the given solver backend.
    ///
    /// Oversized inputs are refused up front with
    /// [`RepairOutcome::TooLarge`]; every solver failure maps to the
    /// matching outcome variant, never a panic.
    pub fn run<S: CpSolver>(&self, schedule: &Schedule, solver: &S) -> RepairOutcome {
        if schedule.len() > self.max_tasks {
            return RepairOutcome::TooLarge;
        }
        if schedule.is_empty() {
            return RepairOutcome::Success(Schedule::new());
        }

        let epoch = schedule
            .earliest_start()
            .expect("non-empty schedule has an earliest start");
        let (model, row_order) = self.build_model(schedule, epoch);
        debug!(
            intervals = model.interval_count(),
            constraints = model.constraint_count(),
            horizon = model.horizon,
            "repair model built"
        );

        let solver_config = SolverConfig::default()
            .with_timeout(self.timeout)
            .with_seed(self.seed);
        let solution = match solver.solve(&model, &solver_config) {
            Ok(solution) => solution,
            Err(failure) => return RepairOutcome::SolverError(failure.to_string()),
        };

        match solution.status {
            CpStatus::Optimal | CpStatus::Feasible => {
                let mut repaired = schedule.clone();
                for (var_idx, &row_idx) in row_order.iter().enumerate() {
                    let start = epoch + Duration::minutes(solution.starts[var_idx]);
                    repaired.operations[row_idx].shift_to(start);
                }
                RepairOutcome::Success(repaired)
            }
            CpStatus::Infeasible => RepairOutcome::Infeasible,
            CpStatus::Timeout => RepairOutcome::Timeout,
        }
    }

    /// Builds the interval model. Returns the model and the schedule row
    /// index behind each interval variable.
    fn build_model(&self, schedule: &Schedule, epoch: NaiveDateTime) -> (CpModel, Vec<usize>) {
        let offset = |dt: NaiveDateTime| (dt - epoch).num_minutes();

        // Rows in (order_id, op_seq) order so precedence chains are
        // consecutive variables
        let mut row_order: Vec<usize> = (0..schedule.len()).collect();
        row_order.sort_by(|&a, &b| {
            let oa = &schedule.operations[a].operation;
            let ob = &schedule.operations[b].operation;
            (oa.order_id.as_str(), oa.op_seq).cmp(&(ob.order_id.as_str(), ob.op_seq))
        });

        let total_duration: i64 = schedule
            .operations
            .iter()
            .map(|o| o.operation.duration_minutes)
            .sum();
        let max_offset = schedule
            .operations
            .iter()
            .map(|o| offset(o.start_dt))
            .max()
            .unwrap_or(0);
        // Sequential placement after the latest original start always
        // fits without calendars. With calendars, a fully serial probe
        // through every row's calendar bounds any placement the solver's
        // construction can produce, since each real placement waits on a
        // subset of what the probe waits on.
        let mut horizon = max_offset + total_duration;
        if self.use_calendar && !self.calendars.is_empty() {
            let mut t = 0i64;
            let mut probe_complete = true;
            for &row_idx in &row_order {
                let op = &schedule.operations[row_idx].operation;
                match self.calendars.get(op.resource_code.as_str()) {
                    Some(calendar) => match calendar.next_fit(t, op.duration_minutes) {
                        Some(start) => t = start + op.duration_minutes,
                        None => {
                            // Some window layouts only work in parallel;
                            // let the solver make the infeasibility call
                            probe_complete = false;
                            break;
                        }
                    },
                    None => t += op.duration_minutes,
                }
            }
            if probe_complete {
                horizon = horizon.max(t);
            }
        }

        let mut model = CpModel::new("schedule-repair", horizon);
        let mut chain_prev: HashMap<&str, usize> = HashMap::new();
        let mut by_resource: HashMap<&str, Vec<usize>> = HashMap::new();

        for &row_idx in &row_order {
            let row = &schedule.operations[row_idx];
            let op = &row.operation;

            let mut var = IntervalVar::new(
                format!("{}#{}", op.order_id, op.op_seq),
                0,
                horizon - op.duration_minutes,
                op.duration_minutes,
            )
            .with_baseline(offset(row.start_dt))
            .with_risk(self.risk_table.risk_for(&op.resource_code));
            if let Some(due) = op.due_date {
                var = var.with_due(offset(due));
            }
            let var_idx = model.add_interval(var);

            if let Some(&prev) = chain_prev.get(op.order_id.as_str()) {
                model.add_precedence(prev, var_idx, 0);
            }
            chain_prev.insert(op.order_id.as_str(), var_idx);
            by_resource
                .entry(op.resource_code.as_str())
                .or_default()
                .push(var_idx);

            if self.use_calendar {
                if let Some(calendar) = self.calendars.get(op.resource_code.as_str()) {
                    model.add_availability(var_idx, calendar.clone());
                }
            }
        }

        if self.use_resource_constraints {
            let mut resources: Vec<&str> = by_resource.keys().copied().collect();
            resources.sort_unstable();
            for code in resources {
                let vars = &by_resource[code];
                if vars.len() > 1 {
                    model.add_no_overlap(vars.clone());
                }
            }
        }

        model.set_objective(CpObjective {
            makespan_weight: self.weights.makespan_weight,
            tardiness_weight: self.weights.tardiness_weight,
            deviation_weight: self.weights.deviation_weight,
            risk_weight: self.risk_weight,
        });

        (model, row_order)
    }
}
