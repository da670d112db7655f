//! Schedule fitness evaluation.
//!
//! Computes the objective components (makespan, tardiness, deviation
//! from plan, utilization) and combines them into one scalar cost.
//! Lower is better; an empty schedule costs `+INFINITY` so the search
//! never treats it as usable.

use std::collections::HashMap;

use crate::config::ObjectiveWeights;
use crate::models::Schedule;

/// Makespan in minutes: latest end minus earliest start, `0` when empty.
pub fn makespan_minutes(schedule: &Schedule) -> i64 {
    schedule.makespan_minutes()
}

/// Total tardiness in minutes: `Σ max(0, end - due)` over operations
/// with a due date.
pub fn total_tardiness_minutes(schedule: &Schedule) -> i64 {
    schedule
        .operations
        .iter()
        .map(|o| o.tardiness_minutes())
        .sum()
}

/// Total deviation from plan in minutes: `Σ |start - planned_start|`
/// over operations with a plan reference.
pub fn total_deviation_minutes(schedule: &Schedule) -> i64 {
    schedule
        .operations
        .iter()
        .map(|o| o.deviation_minutes())
        .sum()
}

/// Per-resource utilization as a percentage of the schedule span:
/// `busy_minutes / (latest_end - earliest_start) * 100`.
///
/// Empty map for an empty or zero-span schedule.
pub fn utilization(schedule: &Schedule) -> HashMap<String, f64> {
    let span = schedule.makespan_minutes();
    if span <= 0 {
        return HashMap::new();
    }

    let mut busy: HashMap<String, i64> = HashMap::new();
    for op in &schedule.operations {
        *busy.entry(op.operation.resource_code.clone()).or_insert(0) +=
            op.operation.duration_minutes;
    }
    busy.into_iter()
        .map(|(code, minutes)| (code, minutes as f64 / span as f64 * 100.0))
        .collect()
}

/// Weighted scalar cost of a schedule. Lower is better.
///
/// `+INFINITY` for an empty schedule.
pub fn fitness(schedule: &Schedule, weights: &ObjectiveWeights) -> f64 {
    if schedule.is_empty() {
        return f64::INFINITY;
    }
    weights.makespan_weight * makespan_minutes(schedule) as f64
        + weights.tardiness_weight * total_tardiness_minutes(schedule) as f64
        + weights.deviation_weight * total_deviation_minutes(schedule) as f64
}
