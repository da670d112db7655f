//! Constraint model for schedule repair.
//!
//! Translates a scheduling problem into interval variables over integer
//! minute offsets with no-overlap, precedence, and availability
//! constraints, plus a weighted objective. The model is solver-agnostic:
//! it only describes the problem and can evaluate candidate assignments.
//!
//! # Reference
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

use crate::models::Calendar;

/// An interval variable: one operation's start/end over minute offsets.
///
/// The start domain is `[start_min, start_max]`; the end follows from
/// the fixed duration. Objective coefficients (due offset, baseline
/// start, risk) ride along with the variable.
#[derive(Debug, Clone)]
pub struct IntervalVar {
    /// Diagnostic label, e.g. `"J1#2"`.
    pub label: String,
    /// Earliest allowed start (minutes).
    pub start_min: i64,
    /// Latest allowed start (minutes).
    pub start_max: i64,
    /// Fixed duration (minutes).
    pub duration: i64,
    /// Due offset for the tardiness term. `None` = never tardy.
    pub due: Option<i64>,
    /// Original start offset for the deviation term.
    pub baseline_start: i64,
    /// Down-risk of the assigned resource for the risk term.
    pub risk: f64,
}

impl IntervalVar {
    /// Creates an interval variable with the given start domain.
    pub fn new(label: impl Into<String>, start_min: i64, start_max: i64, duration: i64) -> Self {
        Self {
            label: label.into(),
            start_min,
            start_max,
            duration,
            due: None,
            baseline_start: 0,
            risk: 0.0,
        }
    }

    /// Sets the due offset.
    pub fn with_due(mut self, due: i64) -> Self {
        self.due = Some(due);
        self
    }

    /// Sets the baseline (original) start offset.
    pub fn with_baseline(mut self, baseline_start: i64) -> Self {
        self.baseline_start = baseline_start;
        self
    }

    /// Sets the assigned resource's risk score.
    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = risk;
        self
    }
}

/// A constraint over interval variables (referenced by index).
#[derive(Debug, Clone)]
pub enum CpConstraint {
    /// The listed intervals may never overlap in time (disjunctive
    /// resource).
    NoOverlap { intervals: Vec<usize> },
    /// `start[after] >= end[before] + min_delay`.
    Precedence {
        before: usize,
        after: usize,
        min_delay: i64,
    },
    /// The interval must run without interruption inside the calendar's
    /// working time.
    Availability { interval: usize, calendar: Calendar },
}

/// Weighted objective over a candidate assignment. Lower is better.
#[derive(Debug, Clone, Copy)]
pub struct CpObjective {
    /// Weight on the schedule span (max end - min start).
    pub makespan_weight: f64,
    /// Weight on total tardiness.
    pub tardiness_weight: f64,
    /// Weight on total deviation from baseline starts.
    pub deviation_weight: f64,
    /// Weight on the summed risk of assigned resources.
    pub risk_weight: f64,
}

impl Default for CpObjective {
    fn default() -> Self {
        Self {
            makespan_weight: 1.0,
            tardiness_weight: 2.0,
            deviation_weight: 0.5,
            risk_weight: 0.0,
        }
    }
}

/// A constraint-satisfaction/optimization model over interval variables.
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name (diagnostics only).
    pub name: String,
    /// Planning horizon: every end offset must stay within
    /// `[0, horizon]`.
    pub horizon: i64,
    intervals: Vec<IntervalVar>,
    constraints: Vec<CpConstraint>,
    objective: CpObjective,
}

impl CpModel {
    /// Creates an empty model with the given horizon.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            intervals: Vec::new(),
            constraints: Vec::new(),
            objective: CpObjective::default(),
        }
    }

    /// Adds an interval variable, returning its index.
    pub fn add_interval(&mut self, interval: IntervalVar) -> usize {
        self.intervals.push(interval);
        self.intervals.len() - 1
    }

    /// Adds a no-overlap constraint over the given intervals.
    pub fn add_no_overlap(&mut self, intervals: Vec<usize>) {
        self.constraints.push(CpConstraint::NoOverlap { intervals });
    }

    /// Adds a precedence constraint: `after` starts no earlier than
    /// `before` ends plus `min_delay`.
    pub fn add_precedence(&mut self, before: usize, after: usize, min_delay: i64) {
        self.constraints.push(CpConstraint::Precedence {
            before,
            after,
            min_delay,
        });
    }

    /// Constrains an interval to the calendar's working time.
    pub fn add_availability(&mut self, interval: usize, calendar: Calendar) {
        self.constraints.push(CpConstraint::Availability { interval, calendar });
    }

    /// Sets the objective weights.
    pub fn set_objective(&mut self, objective: CpObjective) {
        self.objective = objective;
    }

    /// Number of interval variables.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// The interval variables.
    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    /// The constraints.
    pub fn constraints(&self) -> &[CpConstraint] {
        &self.constraints
    }

    /// The objective weights.
    pub fn objective(&self) -> &CpObjective {
        &self.objective
    }

    /// Whether a candidate start assignment satisfies every constraint
    /// and domain bound.
    pub fn is_feasible(&self, starts: &[i64]) -> bool {
        if starts.len() != self.intervals.len() {
            return false;
        }
        for (i, var) in self.intervals.iter().enumerate() {
            let start = starts[i];
            if start < var.start_min || start > var.start_max || start + var.duration > self.horizon
            {
                return false;
            }
        }
        for constraint in &self.constraints {
            match constraint {
                CpConstraint::NoOverlap { intervals } => {
                    let mut spans: Vec<(i64, i64)> = intervals
                        .iter()
                        .map(|&i| (starts[i], starts[i] + self.intervals[i].duration))
                        .collect();
                    spans.sort_unstable();
                    for pair in spans.windows(2) {
                        if pair[1].0 < pair[0].1 {
                            return false;
                        }
                    }
                }
                CpConstraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    let before_end = starts[*before] + self.intervals[*before].duration;
                    if starts[*after] < before_end + min_delay {
                        return false;
                    }
                }
                CpConstraint::Availability { interval, calendar } => {
                    if !calendar.fits(starts[*interval], self.intervals[*interval].duration) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Weighted objective value of a candidate assignment.
    pub fn objective_value(&self, starts: &[i64]) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        let min_start = self
            .intervals
            .iter()
            .enumerate()
            .map(|(i, _)| starts[i])
            .min()
            .unwrap_or(0);
        let max_end = self
            .intervals
            .iter()
            .enumerate()
            .map(|(i, var)| starts[i] + var.duration)
            .max()
            .unwrap_or(0);
        let makespan = (max_end - min_start) as f64;

        let mut tardiness = 0i64;
        let mut deviation = 0i64;
        let mut risk = 0.0f64;
        for (i, var) in self.intervals.iter().enumerate() {
            if let Some(due) = var.due {
                tardiness += (starts[i] + var.duration - due).max(0);
            }
            deviation += (starts[i] - var.baseline_start).abs();
            risk += var.risk;
        }

        self.objective.makespan_weight * makespan
            + self.objective.tardiness_weight * tardiness as f64
            + self.objective.deviation_weight * deviation as f64
            + self.objective.risk_weight * risk
    }

    /// A lower bound on the achievable makespan: the longer of the
    /// heaviest precedence chain and the busiest disjunctive resource.
    ///
    /// Assumes the precedence graph is acyclic (callers check first).
    pub fn makespan_lower_bound(&self) -> i64 {
        let n = self.intervals.len();
        let mut successors: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for constraint in &self.constraints {
            if let CpConstraint::Precedence {
                before,
                after,
                min_delay,
            } = constraint
            {
                successors[*before].push((*after, *min_delay));
                indegree[*after] += 1;
            }
        }

        // Longest chain via topological DP
        let mut chain: Vec<i64> = self.intervals.iter().map(|v| v.duration).collect();
        let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut best_chain = 0i64;
        while let Some(i) = queue.pop() {
            best_chain = best_chain.max(chain[i]);
            for &(next, delay) in &successors[i] {
                chain[next] = chain[next].max(chain[i] + delay + self.intervals[next].duration);
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        let busiest_group = self
            .constraints
            .iter()
            .filter_map(|c| match c {
                CpConstraint::NoOverlap { intervals } => Some(
                    intervals
                        .iter()
                        .map(|&i| self.intervals[i].duration)
                        .sum::<i64>(),
                ),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        best_chain.max(busiest_group)
    }
}
