//! Bounded-time solver for the repair constraint model.
//!
//! [`CpSolver`] is a deliberately narrow seam — `solve(model, config) →
//! solution` — so the concrete backend can be swapped (e.g. for a native
//! CP-SAT binding) without touching the GA or local-search code.
//!
//! The bundled [`BoundedCpSolver`] is a constructive solver: it places
//! intervals greedily along topological priority orders (baseline, due
//! date, duration, then seeded random restarts), keeping the best
//! assignment found under a wall-clock budget. Both the restart count
//! and the timeout bound the work, so a call never blocks indefinitely;
//! it returns either the best feasible solution or a definite
//! no-solution status.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use super::model::{CpConstraint, CpModel};
use crate::models::Calendar;

/// Solver run parameters.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock budget for one solve call.
    pub timeout: Duration,
    /// Seed for restart randomization.
    pub seed: u64,
    /// Randomized restarts after the deterministic heuristic orders.
    pub max_restarts: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            seed: 42,
            max_restarts: 64,
        }
    }
}

impl SolverConfig {
    /// Sets the wall-clock budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the restart seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the restart budget.
    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }
}

/// Outcome classification of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpStatus {
    /// Best solution matches the model's lower bound.
    Optimal,
    /// Feasible but not proven optimal.
    Feasible,
    /// The model admits no solution (cycle, empty domain, or every
    /// attempted construction failed with time to spare).
    Infeasible,
    /// The budget elapsed before any feasible solution was found.
    Timeout,
}

/// Result of one solve call.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Outcome classification.
    pub status: CpStatus,
    /// Start offset per interval (meaningful only when a solution was
    /// found).
    pub starts: Vec<i64>,
    /// Objective value of `starts`.
    pub objective: f64,
}

impl CpSolution {
    /// Whether this solution carries a usable assignment.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, CpStatus::Optimal | CpStatus::Feasible)
    }

    fn not_found(status: CpStatus) -> Self {
        Self {
            status,
            starts: Vec::new(),
            objective: f64::INFINITY,
        }
    }
}

/// Unexpected backend failure.
///
/// [`BoundedCpSolver`] never produces one; the variant exists so foreign
/// backends (native solver bindings) can surface crashes through the
/// same seam.
#[derive(Debug, Clone, Error)]
#[error("cp solver failure: {0}")]
pub struct SolverFailure(pub String);

/// Narrow solver interface; see the module docs.
pub trait CpSolver {
    /// Solves the model within the configured budget.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Result<CpSolution, SolverFailure>;
}

/// Deterministic constructive solver with seeded restarts.
#[derive(Debug, Clone, Default)]
pub struct BoundedCpSolver;

impl BoundedCpSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BoundedCpSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> Result<CpSolution, SolverFailure> {
        let started = Instant::now();
        let n = model.interval_count();
        if n == 0 {
            return Ok(CpSolution {
                status: CpStatus::Optimal,
                starts: Vec::new(),
                objective: 0.0,
            });
        }

        let graph = PrecedenceGraph::build(model);
        let groups = DisjunctiveGroups::build(model);
        let availability = availability_of(model);

        // Domain screening: a variable that can never fit dooms the model
        for (i, var) in model.intervals().iter().enumerate() {
            let impossible = var.start_min > var.start_max
                || var.duration > model.horizon
                || availability[i]
                    .map(|cal| cal.next_fit(var.start_min, var.duration).is_none())
                    .unwrap_or(false);
            if impossible {
                return Ok(CpSolution::not_found(CpStatus::Infeasible));
            }
        }

        // Cycle check before any construction attempt
        if graph.topo_order(&baseline_keys(model)).is_none() {
            return Ok(CpSolution::not_found(CpStatus::Infeasible));
        }

        let mut best: Option<(Vec<i64>, f64)> = None;
        let consider = |starts: Vec<i64>, objective: f64, best: &mut Option<(Vec<i64>, f64)>| {
            if best.as_ref().map_or(true, |(_, b)| objective < *b) {
                *best = Some((starts, objective));
            }
        };

        for keys in [baseline_keys(model), due_keys(model), duration_keys(model)] {
            if let Some(order) = graph.topo_order(&keys) {
                if let Some(starts) = construct(model, &order, &graph, &groups, &availability) {
                    let objective = model.objective_value(&starts);
                    consider(starts, objective, &mut best);
                }
            }
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut restarts = 0usize;
        while restarts < config.max_restarts && started.elapsed() < config.timeout {
            restarts += 1;
            let keys: Vec<(i64, usize)> = (0..n).map(|i| (rng.random::<i32>() as i64, i)).collect();
            let Some(order) = graph.topo_order(&keys) else {
                break;
            };
            if let Some(starts) = construct(model, &order, &graph, &groups, &availability) {
                let objective = model.objective_value(&starts);
                consider(starts, objective, &mut best);
            }
        }

        let elapsed = started.elapsed();
        match best {
            Some((starts, objective)) => {
                let lower_bound = model.objective().makespan_weight
                    * model.makespan_lower_bound() as f64
                    + model.objective().risk_weight
                        * model.intervals().iter().map(|v| v.risk).sum::<f64>();
                let status = if objective <= lower_bound + 1e-9 {
                    CpStatus::Optimal
                } else {
                    CpStatus::Feasible
                };
                debug!(
                    model = %model.name,
                    restarts,
                    objective,
                    ?status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "cp solve finished"
                );
                Ok(CpSolution {
                    status,
                    starts,
                    objective,
                })
            }
            None if elapsed >= config.timeout => Ok(CpSolution::not_found(CpStatus::Timeout)),
            None => Ok(CpSolution::not_found(CpStatus::Infeasible)),
        }
    }
}

struct PrecedenceGraph {
    /// `(predecessor, min_delay)` per interval.
    preds: Vec<Vec<(usize, i64)>>,
    successors: Vec<Vec<usize>>,
    indegree: Vec<usize>,
}

impl PrecedenceGraph {
    fn build(model: &CpModel) -> Self {
        let n = model.interval_count();
        let mut preds: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for constraint in model.constraints() {
            if let CpConstraint::Precedence {
                before,
                after,
                min_delay,
            } = constraint
            {
                preds[*after].push((*before, *min_delay));
                successors[*before].push(*after);
                indegree[*after] += 1;
            }
        }
        Self {
            preds,
            successors,
            indegree,
        }
    }

    /// Topological order picking the smallest key among ready intervals;
    /// `None` when the graph has a cycle.
    fn topo_order(&self, keys: &[(i64, usize)]) -> Option<Vec<usize>> {
        let n = self.indegree.len();
        let mut indegree = self.indegree.clone();
        let mut ready: BinaryHeap<Reverse<(i64, usize)>> = (0..n)
            .filter(|&i| indegree[i] == 0)
            .map(|i| Reverse(keys[i]))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse((_, i))) = ready.pop() {
            order.push(i);
            for &next in &self.successors[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(Reverse(keys[next]));
                }
            }
        }
        (order.len() == n).then_some(order)
    }
}

struct DisjunctiveGroups {
    /// Group ids each interval belongs to.
    memberships: Vec<Vec<usize>>,
    group_count: usize,
}

impl DisjunctiveGroups {
    fn build(model: &CpModel) -> Self {
        let mut memberships: Vec<Vec<usize>> = vec![Vec::new(); model.interval_count()];
        let mut group_count = 0usize;
        for constraint in model.constraints() {
            if let CpConstraint::NoOverlap { intervals } = constraint {
                for &i in intervals {
                    memberships[i].push(group_count);
                }
                group_count += 1;
            }
        }
        Self {
            memberships,
            group_count,
        }
    }
}

fn availability_of(model: &CpModel) -> Vec<Option<&Calendar>> {
    let mut availability: Vec<Option<&Calendar>> = vec![None; model.interval_count()];
    for constraint in model.constraints() {
        if let CpConstraint::Availability { interval, calendar } = constraint {
            // One calendar per interval; the last registered wins
            availability[*interval] = Some(calendar);
        }
    }
    availability
}

fn baseline_keys(model: &CpModel) -> Vec<(i64, usize)> {
    model
        .intervals()
        .iter()
        .enumerate()
        .map(|(i, v)| (v.baseline_start, i))
        .collect()
}

fn due_keys(model: &CpModel) -> Vec<(i64, usize)> {
    model
        .intervals()
        .iter()
        .enumerate()
        .map(|(i, v)| (v.due.unwrap_or(i64::MAX), i))
        .collect()
}

fn duration_keys(model: &CpModel) -> Vec<(i64, usize)> {
    model
        .intervals()
        .iter()
        .enumerate()
        .map(|(i, v)| (v.duration, i))
        .collect()
}

/// Serial schedule generation along `order`: each interval starts at the
/// earliest offset satisfying its domain, placed predecessors, group
/// trackers, and calendar. Returns `None` when a placement would exceed
/// its start bound or the horizon.
fn construct(
    model: &CpModel,
    order: &[usize],
    graph: &PrecedenceGraph,
    groups: &DisjunctiveGroups,
    availability: &[Option<&Calendar>],
) -> Option<Vec<i64>> {
    let n = model.interval_count();
    let mut starts = vec![0i64; n];
    let mut group_last = vec![i64::MIN; groups.group_count];

    for &i in order {
        let var = &model.intervals()[i];
        let mut earliest = var.start_min;
        for &(pred, delay) in &graph.preds[i] {
            earliest = earliest.max(starts[pred] + model.intervals()[pred].duration + delay);
        }
        for &g in &groups.memberships[i] {
            earliest = earliest.max(group_last[g]);
        }
        if let Some(calendar) = availability[i] {
            earliest = calendar.next_fit(earliest, var.duration)?;
        }
        if earliest > var.start_max || earliest + var.duration > model.horizon {
            return None;
        }
        starts[i] = earliest;
        for &g in &groups.memberships[i] {
            group_last[g] = group_last[g].max(earliest + var.duration);
        }
    }
    Some(starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::{CpObjective, IntervalVar};

    fn solve(model: &CpModel) -> CpSolution {
        BoundedCpSolver::new()
            .solve(model, &SolverConfig::default())
            .expect("bounded solver never fails")
    }

    #[test]
    fn test_empty_model_optimal() {
        let solution = solve(&CpModel::new("empty", 100));
        assert_eq!(solution.status, CpStatus::Optimal);
        assert!(solution.starts.is_empty());
    }

    #[test]
    fn test_sequences_conflicting_intervals() {
        let mut model = CpModel::new("overlap", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_940, 60).with_baseline(0));
        model.add_interval(IntervalVar::new("B", 0, 9_940, 60).with_baseline(30));
        model.add_no_overlap(vec![0, 1]);

        let solution = solve(&model);
        assert!(solution.is_solution_found());
        assert!(model.is_feasible(&solution.starts));
        // No overlap: one of the two runs after the other
        let (a, b) = (solution.starts[0], solution.starts[1]);
        assert!(a + 60 <= b || b + 60 <= a);
    }

    #[test]
    fn test_honors_precedence_delay() {
        let mut model = CpModel::new("chain", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_000, 100));
        model.add_interval(IntervalVar::new("B", 0, 9_000, 50));
        model.add_precedence(0, 1, 30);

        let solution = solve(&model);
        assert!(solution.is_solution_found());
        assert!(solution.starts[1] >= solution.starts[0] + 130);
    }

    #[test]
    fn test_optimal_on_unconstrained_chain() {
        let mut model = CpModel::new("chain", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_000, 100));
        model.add_interval(IntervalVar::new("B", 0, 9_000, 50));
        model.add_precedence(0, 1, 0);
        model.set_objective(CpObjective {
            makespan_weight: 1.0,
            tardiness_weight: 0.0,
            deviation_weight: 0.0,
            risk_weight: 0.0,
        });

        let solution = solve(&model);
        // Chain length 150 is the lower bound and achievable
        assert_eq!(solution.status, CpStatus::Optimal);
        assert!((solution.objective - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_is_infeasible() {
        let mut model = CpModel::new("cycle", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_000, 10));
        model.add_interval(IntervalVar::new("B", 0, 9_000, 10));
        model.add_precedence(0, 1, 0);
        model.add_precedence(1, 0, 0);

        let solution = solve(&model);
        assert_eq!(solution.status, CpStatus::Infeasible);
        assert!(!solution.is_solution_found());
    }

    #[test]
    fn test_impossible_calendar_is_infeasible() {
        let mut model = CpModel::new("cal", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_000, 120));
        model.add_availability(0, Calendar::default().with_window(0, 60));

        let solution = solve(&model);
        assert_eq!(solution.status, CpStatus::Infeasible);
    }

    #[test]
    fn test_calendar_defers_start() {
        let mut model = CpModel::new("cal", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 9_000, 60));
        model.add_availability(
            0,
            Calendar::default().with_window(480, 960).with_window(1_200, 1_680),
        );

        let solution = solve(&model);
        assert!(solution.is_solution_found());
        assert_eq!(solution.starts[0], 480);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let mut model = CpModel::new("det", 100_000);
        for i in 0..8 {
            model.add_interval(
                IntervalVar::new(format!("I{i}"), 0, 99_000, 30 + i * 7).with_baseline(i * 11),
            );
        }
        model.add_no_overlap((0..8).collect());

        let config = SolverConfig::default().with_seed(5);
        let a = BoundedCpSolver::new().solve(&model, &config).unwrap();
        let b = BoundedCpSolver::new().solve(&model, &config).unwrap();
        assert_eq!(a.starts, b.starts);
        assert_eq!(a.objective, b.objective);
    }

    #[test]
    fn test_tight_start_max_is_infeasible() {
        let mut model = CpModel::new("tight", 10_000);
        model.add_interval(IntervalVar::new("A", 0, 100, 60));
        model.add_interval(IntervalVar::new("B", 0, 100, 60));
        model.add_interval(IntervalVar::new("C", 0, 100, 60));
        // Three 60-minute runs cannot all start by offset 100 disjointly
        model.add_no_overlap(vec![0, 1, 2]);

        let solution = solve(&model);
        assert_eq!(solution.status, CpStatus::Infeasible);
    }
}
