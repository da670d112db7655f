//! GA-based scheduling optimization.
//!
//! Permutation encoding over operation indices, precedence-aware genetic
//! operators, weighted fitness evaluation, and the generational runner.
//!
//! # Encoding
//!
//! A chromosome is a permutation of operation indices. For any order,
//! its operations appear in ascending `op_seq` position order, so every
//! valid chromosome decodes to a precedence-respecting schedule.
//!
//! # Submodules
//!
//! - [`operators`]: runtime-selectable crossover and mutation strategies
//! - [`fitness`]: objective components and the weighted scalar cost
//!
//! # Reference
//! - Cheng et al. (1996), "A Tutorial Survey of JSSP using GA"
//! - Bierwirth (1995), "A generalized permutation approach to JSSP"

mod chromosome;
pub mod fitness;
pub mod operators;
mod runner;

pub use chromosome::{
    base_time, create_random_chromosome, decode, encode, repair, validate, Chromosome,
};
pub use runner::{GaConfig, GaResult, GaRunner, EARLY_STOP_GENERATIONS};
