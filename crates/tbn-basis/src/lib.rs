//! # tbn-basis
//!
//! The polymer-basis pipeline: matrix augmentation (via `tbn-core`),
//! Hilbert-basis solver invocation (via `tbn-solver`), deduplication, and
//! `.tbnpolymat` caching (via `tbn-io`).

pub mod error;
pub mod pipeline;

pub use error::{BasisError, Result};
pub use pipeline::{compute_polymer_basis, load_cached, save_polymat, save_polymer_basis_user_friendly};
