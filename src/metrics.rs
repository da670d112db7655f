//! Schedule quality metrics.
//!
//! Reporting bundle computed from a finished schedule — consumed by the
//! surrounding application layer, never by the search itself.
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest end minus earliest start (minutes) |
//! | Total tardiness | `Σ max(0, end - due)` over operations |
//! | Tardy jobs | Orders with at least one late operation |
//! | Avg utilization | Mean per-resource busy share of the span |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ga::fitness::{total_tardiness_minutes, utilization};
use crate::models::Schedule;

/// Schedule performance indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    /// Makespan in minutes.
    pub makespan_minutes: i64,
    /// Total tardiness in minutes.
    pub total_tardiness_minutes: i64,
    /// Orders with at least one operation finishing past its due date.
    pub tardy_jobs: usize,
    /// Distinct orders in the schedule.
    pub total_jobs: usize,
    /// Mean of the per-resource utilization percentages.
    pub avg_utilization: f64,
    /// Per-resource utilization (percent of the schedule span busy).
    pub resource_utilization: HashMap<String, f64>,
}

impl ScheduleMetrics {
    /// Computes all metrics from a schedule.
    ///
    /// An empty schedule yields the zero bundle.
    pub fn calculate(schedule: &Schedule) -> Self {
        let resource_utilization = utilization(schedule);
        // Sum in key order so float accumulation is reproducible
        let avg_utilization = if resource_utilization.is_empty() {
            0.0
        } else {
            let mut codes: Vec<&String> = resource_utilization.keys().collect();
            codes.sort_unstable();
            codes.iter().map(|code| resource_utilization[*code]).sum::<f64>()
                / resource_utilization.len() as f64
        };

        let order_ids = schedule.order_ids();
        let tardy_jobs = order_ids
            .iter()
            .filter(|order_id| {
                schedule
                    .operations_for_order(order_id)
                    .iter()
                    .any(|op| op.tardiness_minutes() > 0)
            })
            .count();

        Self {
            makespan_minutes: schedule.makespan_minutes(),
            total_tardiness_minutes: total_tardiness_minutes(schedule),
            tardy_jobs,
            total_jobs: order_ids.len(),
            avg_utilization,
            resource_utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operation, ScheduledOperation};
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("J1", 0, "M1", 60).with_due_date(dt(8, 30)),
            dt(8, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J1", 1, "M2", 30).with_due_date(dt(12, 0)),
            dt(9, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J2", 0, "M1", 30).with_due_date(dt(12, 0)),
            dt(9, 0),
        ));
        s
    }

    #[test]
    fn test_metrics_basic() {
        let metrics = ScheduleMetrics::calculate(&sample_schedule());
        // Span 08:00..09:30
        assert_eq!(metrics.makespan_minutes, 90);
        // Only J1#0 is late, by 30 minutes
        assert_eq!(metrics.total_tardiness_minutes, 30);
        assert_eq!(metrics.tardy_jobs, 1);
        assert_eq!(metrics.total_jobs, 2);
    }

    #[test]
    fn test_metrics_utilization() {
        let metrics = ScheduleMetrics::calculate(&sample_schedule());
        // M1 busy 90/90 = 100%, M2 busy 30/90 ≈ 33.3%
        assert!((metrics.resource_utilization["M1"] - 100.0).abs() < 1e-9);
        assert!((metrics.resource_utilization["M2"] - 100.0 / 3.0).abs() < 1e-9);
        assert!((metrics.avg_utilization - (100.0 + 100.0 / 3.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_empty() {
        let metrics = ScheduleMetrics::calculate(&Schedule::new());
        assert_eq!(metrics, ScheduleMetrics::default());
    }

    #[test]
    fn test_metrics_serialize() {
        let metrics = ScheduleMetrics::calculate(&sample_schedule());
        let json = serde_json::to_string(&metrics).unwrap();
        let back: ScheduleMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metrics);
    }
}
