//! # tbn-equilibrium
//!
//! The equilibrium-solver capability interface: given a polymer basis,
//! its free energies, and monomer concentrations, compute each polymer's
//! equilibrium concentration. COFFEE and NUPACK-concentrations adapters
//! implement the same contract over different subprocess wire formats.

pub mod coffee;
pub mod error;
pub mod nupack;

pub use coffee::CoffeeSolver;
pub use error::{EquilibriumError, Result};
pub use nupack::NupackSolver;

/// One basis polymer's monomer-count vector plus its free energy, the unit
/// of exchange between `tbn-basis`/`tbn-energy` and this crate.
#[derive(Debug, Clone)]
pub struct PolymerInput {
    pub monomer_counts: Vec<i64>,
    pub free_energy: f64,
}

pub trait EquilibriumSolver {
    /// Computes equilibrium concentrations (Molar), one per entry of
    /// `polymers`, preserving input order. `monomer_concentrations_molar`
    /// is indexed by monomer, in TBN column order.
    fn compute(
        &self,
        polymers: &[PolymerInput],
        monomer_concentrations_molar: &[f64],
        temp_c: f64,
    ) -> Result<Vec<f64>>;

    fn available(&self) -> bool;

    fn name(&self) -> &'static str;
}
