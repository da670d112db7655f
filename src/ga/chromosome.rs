//! Permutation chromosome for operation sequencing.
//!
//! # Encoding
//!
//! A chromosome is a permutation of operation indices (gene = index into
//! the job list). The permutation is precedence-consistent: for any order,
//! its operations appear in ascending `op_seq` position order. Resource
//! assignment is fixed per operation, so sequencing is the only decision
//! the genome carries.
//!
//! # Reference
//! Bierwirth (1995), "A generalized permutation approach to JSSP"

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDateTime;
use rand::Rng;

use crate::models::{Operation, Schedule, ScheduledOperation};

/// A candidate operation sequence.
///
/// Lower fitness = better schedule (minimization convention).
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    /// Operation indices in execution order.
    pub genes: Vec<usize>,
    /// Fitness value (lower = better); `INFINITY` until evaluated.
    pub fitness: f64,
}

impl Chromosome {
    /// Creates an unevaluated chromosome from a gene sequence.
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            fitness: f64::INFINITY,
        }
    }
}

/// Operation indices grouped by order, in first-appearance order of the
/// orders, each group sorted by `op_seq`.
pub(crate) fn order_groups(operations: &[Operation]) -> Vec<(&str, Vec<usize>)> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for (idx, op) in operations.iter().enumerate() {
        let order_id = op.order_id.as_str();
        match position.get(order_id) {
            Some(&g) => groups[g].1.push(idx),
            None => {
                position.insert(order_id, groups.len());
                groups.push((order_id, vec![idx]));
            }
        }
    }
    for (_, indices) in &mut groups {
        indices.sort_by_key(|&i| operations[i].op_seq);
    }
    groups
}

/// Scheduling origin: the earliest planned start across all operations,
/// or the Unix epoch when no operation carries a plan reference.
pub fn base_time(operations: &[Operation]) -> NaiveDateTime {
    operations
        .iter()
        .filter_map(|op| op.planned_start)
        .min()
        .unwrap_or_default()
}

/// Encodes the job list into a precedence-consistent chromosome:
/// operations grouped by order, each group in `op_seq` order.
pub fn encode(operations: &[Operation]) -> Chromosome {
    let genes = order_groups(operations)
        .into_iter()
        .flat_map(|(_, indices)| indices)
        .collect();
    Chromosome::new(genes)
}

/// Creates a random chromosome by interleaving orders: repeatedly pick a
/// random still-nonempty order and emit its next pending operation.
pub fn create_random_chromosome<R: Rng>(operations: &[Operation], rng: &mut R) -> Chromosome {
    let mut queues: Vec<VecDeque<usize>> = order_groups(operations)
        .into_iter()
        .map(|(_, indices)| indices.into())
        .collect();

    let mut genes = Vec::with_capacity(operations.len());
    while genes.len() < operations.len() {
        let nonempty: Vec<usize> = (0..queues.len()).filter(|&q| !queues[q].is_empty()).collect();
        let pick = nonempty[rng.random_range(0..nonempty.len())];
        if let Some(gene) = queues[pick].pop_front() {
            genes.push(gene);
        }
    }
    Chromosome::new(genes)
}

/// Validates a chromosome against the job list.
///
/// Checks (1) permutation completeness — every operation index exactly
/// once — and (2) per-order precedence: each order's operations appear
/// in non-decreasing `op_seq` position order.
pub fn validate(chromosome: &Chromosome, operations: &[Operation]) -> bool {
    if chromosome.genes.len() != operations.len() {
        return false;
    }
    let mut seen = vec![false; operations.len()];
    for &gene in &chromosome.genes {
        if gene >= operations.len() || seen[gene] {
            return false;
        }
        seen[gene] = true;
    }

    let mut last_seq: HashMap<&str, u32> = HashMap::new();
    for &gene in &chromosome.genes {
        let op = &operations[gene];
        if let Some(&prev) = last_seq.get(op.order_id.as_str()) {
            if op.op_seq < prev {
                return false;
            }
        }
        last_seq.insert(op.order_id.as_str(), op.op_seq);
    }
    true
}

/// Deterministically rebuilds a valid permutation from a broken one.
///
/// Regroups operations by order (sorted by `op_seq`) and replays the
/// original chromosome's per-order visitation order: each gene is
/// replaced by its order's next pending operation. Omitted operations
/// are appended in group order, so any input yields a valid chromosome.
pub fn repair(chromosome: &Chromosome, operations: &[Operation]) -> Chromosome {
    let groups = order_groups(operations);
    let mut queue_of: HashMap<&str, VecDeque<usize>> = groups
        .iter()
        .map(|(order_id, indices)| (*order_id, indices.iter().copied().collect()))
        .collect();

    let mut genes = Vec::with_capacity(operations.len());
    for &gene in &chromosome.genes {
        if gene >= operations.len() {
            continue;
        }
        let order_id = operations[gene].order_id.as_str();
        if let Some(queue) = queue_of.get_mut(order_id) {
            if let Some(next) = queue.pop_front() {
                genes.push(next);
            }
        }
    }
    // Anything never visited (omissions, short chromosomes) goes last
    for (order_id, _) in &groups {
        if let Some(queue) = queue_of.get_mut(order_id) {
            genes.extend(queue.drain(..));
        }
    }
    Chromosome::new(genes)
}

/// Decodes a chromosome into a timed schedule.
///
/// Replays genes left to right; each operation starts at the earliest
/// feasible time `max(base_time, order's last end, resource's last end)`.
/// Runs in O(n) with per-call order/resource trackers.
pub fn decode(chromosome: &Chromosome, operations: &[Operation]) -> Schedule {
    let base = base_time(operations);
    let mut resource_last: HashMap<&str, NaiveDateTime> = HashMap::new();
    let mut order_last: HashMap<&str, NaiveDateTime> = HashMap::new();
    let mut schedule = Schedule::new();

    for &gene in &chromosome.genes {
        let op = match operations.get(gene) {
            Some(op) => op,
            None => continue,
        };

        let resource_ready = resource_last
            .get(op.resource_code.as_str())
            .copied()
            .unwrap_or(base);
        let order_ready = order_last.get(op.order_id.as_str()).copied().unwrap_or(base);
        let start = base.max(order_ready).max(resource_ready);

        let scheduled = ScheduledOperation::new(op.clone(), start);
        let end = scheduled.end_dt;
        resource_last.insert(op.resource_code.as_str(), end);
        order_last.insert(op.order_id.as_str(), end);
        schedule.push(scheduled);
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn sample_operations() -> Vec<Operation> {
        vec![
            Operation::new("J1", 0, "M1", 60).with_planned_start(dt(8, 0)),
            Operation::new("J1", 1, "M2", 30),
            Operation::new("J2", 0, "M1", 45),
            Operation::new("J2", 1, "M2", 90),
        ]
    }

    #[test]
    fn test_encode_is_valid() {
        let ops = sample_operations();
        let ch = encode(&ops);
        assert_eq!(ch.genes.len(), 4);
        assert!(validate(&ch, &ops));
        assert_eq!(ch.fitness, f64::INFINITY);
    }

    #[test]
    fn test_random_chromosome_valid() {
        let ops = sample_operations();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let ch = create_random_chromosome(&ops, &mut rng);
            assert!(validate(&ch, &ops));
        }
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let ops = sample_operations();
        let ch = Chromosome::new(vec![0, 0, 2, 3]);
        assert!(!validate(&ch, &ops));
    }

    #[test]
    fn test_validate_rejects_precedence_violation() {
        let ops = sample_operations();
        // J1's op 1 (index 1) before its op 0 (index 0)
        let ch = Chromosome::new(vec![1, 0, 2, 3]);
        assert!(!validate(&ch, &ops));
    }

    #[test]
    fn test_repair_restores_precedence() {
        let ops = sample_operations();
        let broken = Chromosome::new(vec![1, 3, 0, 2]);
        let fixed = repair(&broken, &ops);
        assert!(validate(&fixed, &ops));
        // Visitation order preserved: J1 first, J2 second, J1, J2
        assert_eq!(fixed.genes, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_repair_handles_duplicates_and_omissions() {
        let ops = sample_operations();
        let garbage = Chromosome::new(vec![2, 2, 2, 99]);
        let fixed = repair(&garbage, &ops);
        assert!(validate(&fixed, &ops));
    }

    #[test]
    fn test_repair_is_deterministic() {
        let ops = sample_operations();
        let broken = Chromosome::new(vec![3, 1, 2, 0]);
        assert_eq!(repair(&broken, &ops).genes, repair(&broken, &ops).genes);
    }

    #[test]
    fn test_decode_respects_precedence_and_resources() {
        let ops = sample_operations();
        let ch = encode(&ops);
        let schedule = decode(&ch, &ops);

        assert_eq!(schedule.len(), 4);
        assert!(schedule.respects_precedence());
        assert!(!schedule.has_resource_overlap());
    }

    #[test]
    fn test_decode_base_time() {
        let ops = sample_operations();
        let ch = encode(&ops);
        let schedule = decode(&ch, &ops);
        // Base time is J1 op0's planned start
        assert_eq!(schedule.earliest_start(), Some(dt(8, 0)));
    }

    #[test]
    fn test_decode_timing() {
        let ops = sample_operations();
        // encode order: J1#0, J1#1, J2#0, J2#1
        let schedule = decode(&encode(&ops), &ops);
        let j1_0 = &schedule.operations[0];
        let j1_1 = &schedule.operations[1];
        let j2_0 = &schedule.operations[2];
        let j2_1 = &schedule.operations[3];

        assert_eq!(j1_0.start_dt, dt(8, 0));
        assert_eq!(j1_0.end_dt, dt(9, 0));
        // J1#1 on M2 starts when J1#0 ends
        assert_eq!(j1_1.start_dt, dt(9, 0));
        // J2#0 on M1 waits for M1 to free up
        assert_eq!(j2_0.start_dt, dt(9, 0));
        // J2#1 on M2: M2 free at 09:30, J2#0 ends 09:45 → starts 09:45
        assert_eq!(j2_1.start_dt, dt(9, 45));
    }

    #[test]
    fn test_decode_empty() {
        let schedule = decode(&Chromosome::new(Vec::new()), &[]);
        assert!(schedule.is_empty());
        assert_eq!(schedule.makespan_minutes(), 0);
    }

    #[test]
    fn test_base_time_fallback() {
        let ops = vec![Operation::new("J1", 0, "M1", 60)];
        assert_eq!(base_time(&ops), NaiveDateTime::default());
    }
}
