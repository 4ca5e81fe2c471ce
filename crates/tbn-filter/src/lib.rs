//! # tbn-filter
//!
//! Queries a polymer basis (as cached in a `.tbnpolymat` file) by monomer
//! composition: `CONTAINS`/`EXACTLY` constraints, percent-of-total
//! concentration limits, and result-count truncation.

pub mod error;
pub mod filter;

pub use error::{FilterError, Result};
pub use filter::{parse_constraints_file, Constraint, FilteredPolymer, PolymerFilter};
