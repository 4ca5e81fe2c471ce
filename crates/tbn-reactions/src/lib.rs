//! # tbn-reactions
//!
//! Irreducible canonical reactions between on-target and off-target
//! polymers: mass-conserving, canonical (no off-target reactants)
//! generators of the reaction lattice, found by lifting the on-target
//! variables into positive/negative parts and taking a Hilbert basis.

pub mod computer;
pub mod error;
pub mod reaction;

pub use computer::CanonicalReactionsComputer;
pub use error::{ReactionError, Result};
pub use reaction::Reaction;
