//! # tbn-solver
//!
//! The Hilbert-basis solver oracle capability interface, with Normaliz and
//! 4ti2 subprocess adapters. Every solver call serializes a matrix to a
//! scoped temporary directory, invokes an external executable, and parses
//! its output back into nonnegative integer vectors.

pub mod error;
pub mod fourtitwo;
pub mod normaliz;

pub use error::{Result, SolverError};
pub use fourtitwo::FourTiTwoSolver;
pub use normaliz::NormalizSolver;

use ndarray::{Array1, Array2};

/// A Hilbert-basis oracle: given the linear system `A·x = 0, x >= 0`,
/// returns the minimal generating set of that monoid.
pub trait HilbertBasisSolver {
    /// Computes the Hilbert basis of `{x >= 0 : matrix * x = 0}`.
    fn hilbert_basis(&self, matrix: &Array2<i64>) -> Result<Vec<Array1<i64>>>;

    /// Computes the module generators (minimal inhomogeneous solutions) of
    /// `{x >= 0 : equations * x = 0, slice * x >= 1}`.
    fn module_generators_with_slice(&self, equations: &Array2<i64>, slice: &Array1<i64>) -> Result<Vec<Array1<i64>>>;

    /// Cheap liveness probe: is the solver executable present and runnable?
    fn available(&self) -> bool;

    /// Human-readable name, used in error messages and CLI summaries.
    fn name(&self) -> &'static str;
}
