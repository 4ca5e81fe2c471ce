//! # tbn-ibot
//!
//! The Iterative Balancing of Off-Target (IBOT) algorithm: assigns a
//! concentration exponent `mu` to every off-target polymer reachable from
//! the on-target polymers (fixed at `mu = 1`) through the irreducible
//! canonical reactions, by repeatedly taking the reaction with the smallest
//! imbalance-per-novel-polymer ratio.

pub mod algorithm;
pub mod output;

pub use algorithm::{IBOTAlgorithm, IterationInfo, ReactionMetrics};
