//! # tbn-core
//!
//! The stoichiometry data model for Thermodynamics of Binding Networks:
//! binding sites, monomers, the TBN matrix and its star-limiting invariant,
//! polymers, concentration units, the shared error taxonomy, and the
//! process-lifetime solver configuration.
//!
//! ## Data model
//!
//! | Type | Role |
//! |------|------|
//! | [`BindingSite`] | a label plus star flag |
//! | [`Monomer`] | an ordered multiset of binding sites |
//! | [`Tbn`] | the parsed network: monomers, matrix A, concentrations |
//! | [`Polymer`] | a nonnegative integer combination of monomers |
//! | [`SolverConfig`] | resolved paths to the four external oracle executables |

pub mod config;
pub mod error;
pub mod index;
pub mod monomer;
pub mod polymer;
pub mod site;
pub mod tbn;
pub mod units;

pub use config::SolverConfig;
pub use error::{Result, TbnError};
pub use index::BindingSiteIndex;
pub use monomer::Monomer;
pub use polymer::Polymer;
pub use site::BindingSite;
pub use tbn::Tbn;
pub use units::Unit;
