//! Schedule (solution) model.
//!
//! A schedule is an ordered list of timed operations. Feasibility
//! (no resource overlaps, precedence respected) is established by the
//! decoder and the repair pass; the container itself only stores and
//! queries assignments.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ScheduledOperation;

/// A complete schedule (solution to a scheduling problem).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Timed operations, in decode/repair emission order.
    pub operations: Vec<ScheduledOperation>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a timed operation.
    pub fn push(&mut self, operation: ScheduledOperation) {
        self.operations.push(operation);
    }

    /// Number of scheduled operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the schedule holds no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Earliest start across all operations.
    pub fn earliest_start(&self) -> Option<NaiveDateTime> {
        self.operations.iter().map(|o| o.start_dt).min()
    }

    /// Latest end across all operations.
    pub fn latest_end(&self) -> Option<NaiveDateTime> {
        self.operations.iter().map(|o| o.end_dt).max()
    }

    /// Makespan in minutes: latest end minus earliest start, `0` when empty.
    pub fn makespan_minutes(&self) -> i64 {
        match (self.earliest_start(), self.latest_end()) {
            (Some(start), Some(end)) => (end - start).num_minutes(),
            _ => 0,
        }
    }

    /// All operations scheduled on a resource.
    pub fn operations_for_resource(&self, resource_code: &str) -> Vec<&ScheduledOperation> {
        self.operations
            .iter()
            .filter(|o| o.operation.resource_code == resource_code)
            .collect()
    }

    /// All operations belonging to an order.
    pub fn operations_for_order(&self, order_id: &str) -> Vec<&ScheduledOperation> {
        self.operations
            .iter()
            .filter(|o| o.operation.order_id == order_id)
            .collect()
    }

    /// Completion time of an order (latest end of its operations).
    pub fn order_completion(&self, order_id: &str) -> Option<NaiveDateTime> {
        self.operations_for_order(order_id)
            .iter()
            .map(|o| o.end_dt)
            .max()
    }

    /// Distinct resource codes, sorted.
    pub fn resource_codes(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .operations
            .iter()
            .map(|o| o.operation.resource_code.as_str())
            .collect();
        set.into_iter().collect()
    }

    /// Distinct order IDs, sorted.
    pub fn order_ids(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .operations
            .iter()
            .map(|o| o.operation.order_id.as_str())
            .collect();
        set.into_iter().collect()
    }

    /// Whether any two operations on the same resource overlap in time.
    ///
    /// Intervals are half-open: touching end/start is not an overlap.
    pub fn has_resource_overlap(&self) -> bool {
        for code in self.resource_codes() {
            let mut ops = self.operations_for_resource(code);
            ops.sort_by_key(|o| o.start_dt);
            for pair in ops.windows(2) {
                if pair[1].start_dt < pair[0].end_dt {
                    return true;
                }
            }
        }
        false
    }

    /// Whether every order's operations run in ascending `op_seq` with
    /// each step starting no earlier than its predecessor ends.
    pub fn respects_precedence(&self) -> bool {
        for order_id in self.order_ids() {
            let mut ops = self.operations_for_order(order_id);
            ops.sort_by_key(|o| o.operation.op_seq);
            for pair in ops.windows(2) {
                if pair[1].start_dt < pair[0].end_dt {
                    return false;
                }
            }
        }
        true
    }
}
