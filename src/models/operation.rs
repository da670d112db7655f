//! Operation (job step) model.
//!
//! An operation is the smallest schedulable unit of work: one processing
//! step of a production order, bound to a single resource for a fixed
//! number of minutes. Operations within an order are linked by an implicit
//! precedence chain over `op_seq`.
//!
//! # Time Representation
//! Wall-clock fields use naive timestamps; durations are whole minutes.
//! The consumer defines the timezone convention.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An operation to be scheduled.
///
/// Uniquely identified by `(order_id, op_seq)`. Immutable input: the
/// optimizer never mutates operations, only produces timed copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Parent order identifier.
    pub order_id: String,
    /// Position within the order (0-indexed, ascending = precedence).
    pub op_seq: u32,
    /// Resource (machine) this operation runs on.
    pub resource_code: String,
    /// Processing time in minutes (> 0).
    pub duration_minutes: i64,
    /// Latest acceptable completion time. `None` = no due date.
    pub due_date: Option<NaiveDateTime>,
    /// Start time from the released plan. `None` = no plan reference.
    pub planned_start: Option<NaiveDateTime>,
}

impl Operation {
    /// Creates a new operation.
    pub fn new(
        order_id: impl Into<String>,
        op_seq: u32,
        resource_code: impl Into<String>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            op_seq,
            resource_code: resource_code.into(),
            duration_minutes,
            due_date: None,
            planned_start: None,
        }
    }

    /// Sets the due date.
    pub fn with_due_date(mut self, due_date: NaiveDateTime) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the planned start from the released plan.
    pub fn with_planned_start(mut self, planned_start: NaiveDateTime) -> Self {
        self.planned_start = Some(planned_start);
        self
    }

    /// Processing time as a chrono duration.
    #[inline]
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }

    /// The `(order_id, op_seq)` identity of this operation.
    #[inline]
    pub fn key(&self) -> (&str, u32) {
        (&self.order_id, self.op_seq)
    }
}

/// An operation with assigned start and end times.
///
/// Invariant: `end_dt = start_dt + duration_minutes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    /// The scheduled operation.
    pub operation: Operation,
    /// Assigned start time.
    pub start_dt: NaiveDateTime,
    /// Assigned end time.
    pub end_dt: NaiveDateTime,
}

impl ScheduledOperation {
    /// Schedules an operation at the given start; the end follows from
    /// the operation's duration.
    pub fn new(operation: Operation, start_dt: NaiveDateTime) -> Self {
        let end_dt = start_dt + operation.duration();
        Self {
            operation,
            start_dt,
            end_dt,
        }
    }

    /// Moves this operation to a new start, keeping its duration.
    pub fn shift_to(&mut self, start_dt: NaiveDateTime) {
        self.start_dt = start_dt;
        self.end_dt = start_dt + self.operation.duration();
    }

    /// Tardiness in minutes: `max(0, end - due)`, `0` without a due date.
    pub fn tardiness_minutes(&self) -> i64 {
        match self.operation.due_date {
            Some(due) if self.end_dt > due => (self.end_dt - due).num_minutes(),
            _ => 0,
        }
    }

    /// Absolute deviation from the planned start in minutes, `0` without
    /// a plan reference.
    pub fn deviation_minutes(&self) -> i64 {
        match self.operation.planned_start {
            Some(planned) => (self.start_dt - planned).num_minutes().abs(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn test_operation_builder() {
        let op = Operation::new("O1", 0, "M1", 60)
            .with_due_date(dt(12, 0))
            .with_planned_start(dt(8, 0));

        assert_eq!(op.order_id, "O1");
        assert_eq!(op.op_seq, 0);
        assert_eq!(op.resource_code, "M1");
        assert_eq!(op.duration_minutes, 60);
        assert_eq!(op.due_date, Some(dt(12, 0)));
        assert_eq!(op.planned_start, Some(dt(8, 0)));
        assert_eq!(op.key(), ("O1", 0));
    }

    #[test]
    fn test_scheduled_operation_end() {
        let op = Operation::new("O1", 0, "M1", 90);
        let sched = ScheduledOperation::new(op, dt(8, 0));
        assert_eq!(sched.end_dt, dt(9, 30));
    }

    #[test]
    fn test_shift_to() {
        let op = Operation::new("O1", 0, "M1", 45);
        let mut sched = ScheduledOperation::new(op, dt(8, 0));
        sched.shift_to(dt(10, 15));
        assert_eq!(sched.start_dt, dt(10, 15));
        assert_eq!(sched.end_dt, dt(11, 0));
    }

    #[test]
    fn test_tardiness() {
        let op = Operation::new("O1", 0, "M1", 60).with_due_date(dt(8, 30));
        let sched = ScheduledOperation::new(op, dt(8, 0));
        // Ends 09:00, due 08:30 → 30 minutes tardy
        assert_eq!(sched.tardiness_minutes(), 30);

        let on_time = Operation::new("O2", 0, "M1", 20).with_due_date(dt(8, 30));
        let sched2 = ScheduledOperation::new(on_time, dt(8, 0));
        assert_eq!(sched2.tardiness_minutes(), 0);

        let no_due = Operation::new("O3", 0, "M1", 999);
        let sched3 = ScheduledOperation::new(no_due, dt(8, 0));
        assert_eq!(sched3.tardiness_minutes(), 0);
    }

    #[test]
    fn test_deviation() {
        let op = Operation::new("O1", 0, "M1", 60).with_planned_start(dt(9, 0));
        let early = ScheduledOperation::new(op.clone(), dt(8, 0));
        assert_eq!(early.deviation_minutes(), 60);
        let late = ScheduledOperation::new(op, dt(9, 45));
        assert_eq!(late.deviation_minutes(), 45);
    }

    #[test]
    fn test_serde_round_trip() {
        let op = Operation::new("O1", 1, "M2", 30).with_due_date(dt(16, 0));
        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
