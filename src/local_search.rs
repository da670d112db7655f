//! Neighborhood-based schedule refinement.
//!
//! Operates on decoded schedules, not chromosomes. Two neighborhoods are
//! used, both restricted to pairs on the *same resource* belonging to
//! *different orders* (same-order moves trivially violate precedence and
//! are never generated):
//!
//! - **Swap**: exchange the start times of two operations.
//! - **Insertion**: move one operation to start at another's start time.
//!
//! Neighbors that would start a later `op_seq` before an earlier one are
//! rejected. Sampling is capped per resource per iteration to bound the
//! cost of one step.
//!
//! Three acceptance schemes: greedy (strictly improving only), simulated
//! annealing (worsening moves accepted with probability `exp(-Δ/T)`),
//! and variable neighborhood search (restart from the first neighborhood
//! on every improvement). Greedy and VNS never return a schedule worse
//! than their input; annealing returns the best schedule seen, which the
//! current walk may have since abandoned.
//!
//! # Reference
//! - Mladenović & Hansen (1997), "Variable neighborhood search"
//! - Kirkpatrick et al. (1983), "Optimization by Simulated Annealing"

use std::collections::HashMap;

use rand::prelude::IndexedRandom;
use rand::Rng;

use crate::config::ObjectiveWeights;
use crate::ga::fitness::fitness;
use crate::models::Schedule;

/// Swap pairs sampled per resource per iteration.
const MAX_SWAPS_PER_RESOURCE: usize = 10;
/// Insertion moves sampled per resource per iteration.
const MAX_INSERTIONS_PER_RESOURCE: usize = 5;
/// Consecutive non-improving iterations before greedy search stops.
const STALE_ITERATIONS: usize = 20;

/// Which neighborhood a search step draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Neighborhood {
    Swap,
    Insertion,
    Combined,
}

/// A candidate move over schedule operation indices.
#[derive(Debug, Clone, Copy)]
enum Move {
    /// Exchange start times of two operations.
    Swap(usize, usize),
    /// Move operation `.0` to start at operation `.1`'s start time.
    Insert(usize, usize),
}

/// Greedy local search: accept the best strictly-improving sampled
/// neighbor each iteration.
///
/// Stops after `max_iterations` or [`STALE_ITERATIONS`] consecutive
/// non-improving iterations. The result never has worse fitness than
/// the input.
pub fn local_search<R: Rng>(
    schedule: &Schedule,
    weights: &ObjectiveWeights,
    max_iterations: usize,
    rng: &mut R,
) -> Schedule {
    let mut current = schedule.clone();
    let mut current_fitness = fitness(&current, weights);
    let mut stale = 0usize;

    for _ in 0..max_iterations {
        match best_neighbor(&current, Neighborhood::Combined, weights, rng) {
            Some((neighbor, neighbor_fitness)) if neighbor_fitness < current_fitness => {
                current = neighbor;
                current_fitness = neighbor_fitness;
                stale = 0;
            }
            _ => stale += 1,
        }
        if stale >= STALE_ITERATIONS {
            break;
        }
    }
    current
}

/// Simulated annealing over the combined neighborhood.
///
/// Accepts worsening moves with probability `exp(-Δ/T)`; the temperature
/// cools geometrically each iteration. Returns the best schedule seen —
/// the walk itself is free to drift worse, and an accepted-but-worse
/// state is never written into the tracked best.
pub fn simulated_annealing<R: Rng>(
    schedule: &Schedule,
    weights: &ObjectiveWeights,
    max_iterations: usize,
    initial_temperature: f64,
    cooling_rate: f64,
    rng: &mut R,
) -> Schedule {
    let mut current = schedule.clone();
    let mut current_fitness = fitness(&current, weights);
    let mut best = current.clone();
    let mut best_fitness = current_fitness;
    let mut temperature = initial_temperature.max(f64::MIN_POSITIVE);

    for _ in 0..max_iterations {
        let moves = sample_moves(&current, Neighborhood::Combined, rng);
        let Some(&chosen) = moves.choose(rng) else {
            break;
        };
        let neighbor = apply_move(&current, chosen);
        if !is_precedence_safe(&neighbor) {
            temperature *= cooling_rate;
            continue;
        }

        let neighbor_fitness = fitness(&neighbor, weights);
        let delta = neighbor_fitness - current_fitness;
        if delta < 0.0 || rng.random::<f64>() < (-delta / temperature).exp() {
            current = neighbor;
            current_fitness = neighbor_fitness;
        }
        if current_fitness < best_fitness {
            best = current.clone();
            best_fitness = current_fitness;
        }
        temperature *= cooling_rate;
    }
    best
}

/// Variable neighborhood search: cycle swap-only → insertion-only →
/// combined, restarting from the first neighborhood whenever an
/// improvement is found.
///
/// The result never has worse fitness than the input.
pub fn variable_neighborhood_search<R: Rng>(
    schedule: &Schedule,
    weights: &ObjectiveWeights,
    max_iterations: usize,
    rng: &mut R,
) -> Schedule {
    const NEIGHBORHOODS: [Neighborhood; 3] = [
        Neighborhood::Swap,
        Neighborhood::Insertion,
        Neighborhood::Combined,
    ];

    let mut current = schedule.clone();
    let mut current_fitness = fitness(&current, weights);
    let mut k = 0usize;

    for _ in 0..max_iterations {
        match best_neighbor(&current, NEIGHBORHOODS[k], weights, rng) {
            Some((neighbor, neighbor_fitness)) if neighbor_fitness < current_fitness => {
                current = neighbor;
                current_fitness = neighbor_fitness;
                k = 0;
            }
            _ => {
                k += 1;
                if k >= NEIGHBORHOODS.len() {
                    break;
                }
            }
        }
    }
    current
}

/// Rejects any schedule where, for some order, a later `op_seq` starts
/// before an earlier one.
fn is_precedence_safe(schedule: &Schedule) -> bool {
    for order_id in schedule.order_ids() {
        let mut ops = schedule.operations_for_order(order_id);
        ops.sort_by_key(|o| o.operation.op_seq);
        for pair in ops.windows(2) {
            if pair[1].start_dt < pair[0].start_dt {
                return false;
            }
        }
    }
    true
}

/// Best precedence-safe sampled neighbor and its fitness, if any.
fn best_neighbor<R: Rng>(
    schedule: &Schedule,
    neighborhood: Neighborhood,
    weights: &ObjectiveWeights,
    rng: &mut R,
) -> Option<(Schedule, f64)> {
    let mut best: Option<(Schedule, f64)> = None;
    for mv in sample_moves(schedule, neighborhood, rng) {
        let neighbor = apply_move(schedule, mv);
        if !is_precedence_safe(&neighbor) {
            continue;
        }
        let neighbor_fitness = fitness(&neighbor, weights);
        match &best {
            Some((_, incumbent)) if *incumbent <= neighbor_fitness => {}
            _ => best = Some((neighbor, neighbor_fitness)),
        }
    }
    best
}

/// Samples candidate moves: per resource, up to
/// [`MAX_SWAPS_PER_RESOURCE`] cross-order swap pairs and/or
/// [`MAX_INSERTIONS_PER_RESOURCE`] insertions.
fn sample_moves<R: Rng>(
    schedule: &Schedule,
    neighborhood: Neighborhood,
    rng: &mut R,
) -> Vec<Move> {
    let mut by_resource: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, op) in schedule.operations.iter().enumerate() {
        by_resource
            .entry(op.operation.resource_code.as_str())
            .or_default()
            .push(idx);
    }
    let mut resources: Vec<&str> = by_resource.keys().copied().collect();
    resources.sort_unstable();

    let mut moves = Vec::new();
    for code in resources {
        let indices = &by_resource[code];

        if neighborhood != Neighborhood::Insertion {
            let mut pairs = Vec::new();
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[a + 1..] {
                    if schedule.operations[i].operation.order_id
                        != schedule.operations[j].operation.order_id
                    {
                        pairs.push(Move::Swap(i, j));
                    }
                }
            }
            sample_into(&mut moves, pairs, MAX_SWAPS_PER_RESOURCE, rng);
        }

        if neighborhood != Neighborhood::Swap {
            let mut pairs = Vec::new();
            for &i in indices {
                for &j in indices {
                    if i != j
                        && schedule.operations[i].operation.order_id
                            != schedule.operations[j].operation.order_id
                    {
                        pairs.push(Move::Insert(i, j));
                    }
                }
            }
            sample_into(&mut moves, pairs, MAX_INSERTIONS_PER_RESOURCE, rng);
        }
    }
    moves
}

fn sample_into<R: Rng>(moves: &mut Vec<Move>, pairs: Vec<Move>, cap: usize, rng: &mut R) {
    if pairs.len() <= cap {
        moves.extend(pairs);
    } else {
        moves.extend(pairs.choose_multiple(rng, cap).copied());
    }
}

/// Applies a move to a copy of the schedule; end times follow each
/// operation's own duration.
fn apply_move(schedule: &Schedule, mv: Move) -> Schedule {
    let mut next = schedule.clone();
    match mv {
        Move::Swap(i, j) => {
            let start_i = next.operations[i].start_dt;
            let start_j = next.operations[j].start_dt;
            next.operations[i].shift_to(start_j);
            next.operations[j].shift_to(start_i);
        }
        Move::Insert(i, j) => {
            let target = next.operations[j].start_dt;
            next.operations[i].shift_to(target);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operation, ScheduledOperation};
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn dt(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    /// Deliberately poor schedule: late jobs first, everything deviating
    /// from plan, all on two resources.
    fn messy_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("J1", 0, "M1", 60)
                .with_due_date(dt(9, 0))
                .with_planned_start(dt(8, 0)),
            dt(11, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J2", 0, "M1", 30).with_planned_start(dt(11, 0)),
            dt(8, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J3", 0, "M1", 45).with_planned_start(dt(9, 0)),
            dt(9, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J4", 0, "M2", 90).with_due_date(dt(10, 0)),
            dt(12, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J5", 0, "M2", 60).with_planned_start(dt(12, 0)),
            dt(8, 0),
        ));
        s
    }

    #[test]
    fn test_greedy_never_worsens() {
        let schedule = messy_schedule();
        let weights = ObjectiveWeights::default();
        let before = fitness(&schedule, &weights);

        for seed in 0..10u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let refined = local_search(&schedule, &weights, 30, &mut rng);
            assert!(fitness(&refined, &weights) <= before);
        }
    }

    #[test]
    fn test_greedy_improves_messy_schedule() {
        let schedule = messy_schedule();
        let weights = ObjectiveWeights::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let refined = local_search(&schedule, &weights, 50, &mut rng);
        assert!(fitness(&refined, &weights) < fitness(&schedule, &weights));
    }

    #[test]
    fn test_vns_never_worsens() {
        let schedule = messy_schedule();
        let weights = ObjectiveWeights::default();
        let before = fitness(&schedule, &weights);

        for seed in 0..10u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let refined = variable_neighborhood_search(&schedule, &weights, 30, &mut rng);
            assert!(fitness(&refined, &weights) <= before);
        }
    }

    #[test]
    fn test_annealing_best_never_worse_than_input() {
        let schedule = messy_schedule();
        let weights = ObjectiveWeights::default();
        let before = fitness(&schedule, &weights);

        for seed in 0..10u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let refined =
                simulated_annealing(&schedule, &weights, 60, 100.0, 0.95, &mut rng);
            assert!(fitness(&refined, &weights) <= before);
        }
    }

    #[test]
    fn test_moves_never_pair_same_order() {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("J1", 0, "M1", 60),
            dt(8, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J1", 1, "M1", 30),
            dt(9, 0),
        ));
        let mut rng = SmallRng::seed_from_u64(1);
        // Only one order on M1 → no legal moves at all
        assert!(sample_moves(&s, Neighborhood::Combined, &mut rng).is_empty());
    }

    #[test]
    fn test_precedence_safety_filter() {
        let mut s = Schedule::new();
        s.push(ScheduledOperation::new(
            Operation::new("J1", 0, "M1", 60),
            dt(10, 0),
        ));
        s.push(ScheduledOperation::new(
            Operation::new("J1", 1, "M2", 30),
            dt(8, 0),
        ));
        assert!(!is_precedence_safe(&s));

        s.operations[1].shift_to(dt(11, 0));
        assert!(is_precedence_safe(&s));
    }

    #[test]
    fn test_apply_swap_recomputes_ends() {
        let s = messy_schedule();
        // J1 (60 min) and J2 (30 min) on M1
        let swapped = apply_move(&s, Move::Swap(0, 1));
        assert_eq!(swapped.operations[0].start_dt, dt(8, 0));
        assert_eq!(swapped.operations[0].end_dt, dt(9, 0));
        assert_eq!(swapped.operations[1].start_dt, dt(11, 0));
        assert_eq!(swapped.operations[1].end_dt, dt(11, 30));
    }

    #[test]
    fn test_empty_schedule_is_fixed_point() {
        let weights = ObjectiveWeights::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let refined = local_search(&Schedule::new(), &weights, 10, &mut rng);
        assert!(refined.is_empty());
    }

    #[test]
    fn test_deterministic_given_seed() {
        let schedule = messy_schedule();
        let weights = ObjectiveWeights::default();
        let mut rng_a = SmallRng::seed_from_u64(11);
        let mut rng_b = SmallRng::seed_from_u64(11);
        let a = local_search(&schedule, &weights, 25, &mut rng_a);
        let b = local_search(&schedule, &weights, 25, &mut rng_b);
        assert_eq!(a, b);
    }
}
