//! Genetic operators for the sequencing GA.
//!
//! Selection, elitism, crossover, and mutation over permutation
//! chromosomes. Operators that can break per-order precedence hand the
//! child to the deterministic [`repair`](super::repair) pass, so every
//! chromosome entering the population is valid.
//!
//! # Reference
//! - Bierwirth et al. (1996), precedence-preservative crossover
//! - Davis (1985), order crossover

use std::collections::HashSet;

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::chromosome::{repair, validate, Chromosome};
use crate::models::Operation;

/// Crossover strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverType {
    /// Two-point order crossover; children are repaired afterwards.
    Order,
    /// Order-subset crossover: each order's genes come wholly from one
    /// parent, so precedence survives without repair.
    Precedence,
}

/// Mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    /// Swap two random gene positions.
    Swap,
    /// Remove a gene and reinsert it at a random position.
    Insert,
}

/// Runtime-selectable genetic operators.
///
/// Wraps crossover and mutation strategy selection so callers can switch
/// operators via configuration without touching the runner.
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Mutation strategy.
    pub mutation_type: MutationType,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::Order,
            mutation_type: MutationType::Swap,
        }
    }
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy, repairing any
    /// child that violates precedence.
    pub fn crossover<R: Rng>(
        &self,
        p1: &Chromosome,
        p2: &Chromosome,
        operations: &[Operation],
        rng: &mut R,
    ) -> (Chromosome, Chromosome) {
        let (mut c1, mut c2) = match self.crossover_type {
            CrossoverType::Order => order_crossover(p1, p2, rng),
            CrossoverType::Precedence => precedence_crossover(p1, p2, operations, rng),
        };
        if !validate(&c1, operations) {
            c1 = repair(&c1, operations);
        }
        if !validate(&c2, operations) {
            c2 = repair(&c2, operations);
        }
        (c1, c2)
    }

    /// Performs mutation using the configured strategy, repairing the
    /// chromosome when the move breaks precedence.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut Chromosome,
        operations: &[Operation],
        rng: &mut R,
    ) {
        match self.mutation_type {
            MutationType::Swap => swap_mutation(chromosome, rng),
            MutationType::Insert => insert_mutation(chromosome, rng),
        }
        if !validate(chromosome, operations) {
            *chromosome = repair(chromosome, operations);
        }
    }
}

/// Tournament selection: draw `tournament_size` chromosomes uniformly at
/// random and return the one with the lowest fitness.
pub fn tournament_select<'a, R: Rng>(
    population: &'a [Chromosome],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Chromosome {
    let mut best = population
        .choose(rng)
        .expect("tournament on empty population");
    for _ in 1..tournament_size {
        let challenger = &population[rng.random_range(0..population.len())];
        if challenger.fitness < best.fitness {
            best = challenger;
        }
    }
    best
}

/// The `elite_size` best chromosomes by fitness, cloned.
pub fn elites(population: &[Chromosome], elite_size: usize) -> Vec<Chromosome> {
    let mut ranked: Vec<&Chromosome> = population.iter().collect();
    ranked.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(elite_size).cloned().collect()
}

/// Two-point order crossover (OX).
///
/// Each child copies one parent's segment verbatim and fills the
/// remaining positions with the other parent's genes in their relative
/// order. The result is always a permutation; precedence may still
/// break, which the caller repairs.
pub fn order_crossover<R: Rng>(
    p1: &Chromosome,
    p2: &Chromosome,
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    let len = p1.genes.len();
    if len < 2 {
        return (p1.clone(), p2.clone());
    }
    let mut i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len);
    if i > j {
        std::mem::swap(&mut i, &mut j);
    }

    (
        ox_build_child(&p1.genes, &p2.genes, i, j),
        ox_build_child(&p2.genes, &p1.genes, i, j),
    )
}

fn ox_build_child(template: &[usize], donor: &[usize], i: usize, j: usize) -> Chromosome {
    let segment: HashSet<usize> = template[i..=j].iter().copied().collect();
    let mut filler = donor.iter().filter(|g| !segment.contains(*g));

    let genes = (0..template.len())
        .map(|pos| {
            if pos >= i && pos <= j {
                template[pos]
            } else {
                *filler.next().expect("donor covers remaining genes")
            }
        })
        .collect();
    Chromosome::new(genes)
}

/// Order-subset crossover adapted from precedence-preservative POX.
///
/// Selects a random subset of orders; each child keeps one parent's
/// genes for the selected orders at their positions and fills the rest
/// from the other parent in order. Per-order gene order comes wholly
/// from a single parent, so precedence is preserved by construction.
pub fn precedence_crossover<R: Rng>(
    p1: &Chromosome,
    p2: &Chromosome,
    operations: &[Operation],
    rng: &mut R,
) -> (Chromosome, Chromosome) {
    let mut order_ids: Vec<&str> = Vec::new();
    for op in operations {
        if !order_ids.contains(&op.order_id.as_str()) {
            order_ids.push(&op.order_id);
        }
    }
    if order_ids.is_empty() {
        return (p1.clone(), p2.clone());
    }

    let subset_size = rng.random_range(1..=order_ids.len());
    let selected: HashSet<&str> = order_ids
        .choose_multiple(rng, subset_size)
        .copied()
        .collect();

    (
        pox_build_child(&p1.genes, &p2.genes, operations, &selected),
        pox_build_child(&p2.genes, &p1.genes, operations, &selected),
    )
}

fn pox_build_child(
    template: &[usize],
    donor: &[usize],
    operations: &[Operation],
    selected: &HashSet<&str>,
) -> Chromosome {
    let in_selected = |gene: usize| selected.contains(operations[gene].order_id.as_str());
    let mut filler = donor.iter().filter(|&&g| !in_selected(g));

    let genes = template
        .iter()
        .map(|&gene| {
            if in_selected(gene) {
                gene
            } else {
                *filler.next().expect("donor covers unselected genes")
            }
        })
        .collect();
    Chromosome::new(genes)
}

/// Swap mutation: exchanges two random gene positions.
pub fn swap_mutation<R: Rng>(chromosome: &mut Chromosome, rng: &mut R) {
    let len = chromosome.genes.len();
    if len < 2 {
        return;
    }
    let i = rng.random_range(0..len);
    let j = rng.random_range(0..len);
    chromosome.genes.swap(i, j);
    chromosome.fitness = f64::INFINITY;
}

/// Insert mutation: removes a gene and reinserts it at a random position.
pub fn insert_mutation<R: Rng>(chromosome: &mut Chromosome, rng: &mut R) {
    let len = chromosome.genes.len();
    if len < 2 {
        return;
    }
    let from = rng.random_range(0..len);
    let to = rng.random_range(0..len);
    let gene = chromosome.genes.remove(from);
    chromosome.genes.insert(to, gene);
    chromosome.fitness = f64::INFINITY;
}
