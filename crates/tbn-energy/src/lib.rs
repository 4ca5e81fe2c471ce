//! # tbn-energy
//!
//! Per-polymer free energy: bond counting from the stoichiometry matrix,
//! and the bimolecular association-penalty term used when `(G_assoc,
//! H_assoc)` parameters are supplied.

use std::collections::HashMap;
use std::sync::Mutex;

use ndarray::Array2;
use rayon::prelude::*;
use tbn_core::polymer::Polymer;

/// Gas constant in kcal/(mol*K), matching the reference fixture's units.
pub const R: f64 = 0.001987204259;
pub const T_REF: f64 = 310.15;

/// Association parameters `(G_assoc, H_assoc)` for the bimolecular penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssocParams {
    pub g_assoc: f64,
    pub h_assoc: f64,
}

/// Number of bonds in `p`: `(sum(|A|.p) - sum(A.p)) / 2`.
pub fn bonds(matrix_a: &Array2<i64>, polymer: &Polymer) -> f64 {
    let p = &polymer.monomer_counts;
    let mut total_binding_sites: i64 = 0;
    let mut excess_unstar: i64 = 0;
    for row in matrix_a.outer_iter() {
        let mut row_total = 0i64;
        let mut row_excess = 0i64;
        for (a, &count) in row.iter().zip(p.iter()) {
            row_total += a.abs() * count;
            row_excess += a * count;
        }
        total_binding_sites += row_total;
        excess_unstar += row_excess;
    }
    (total_binding_sites - excess_unstar) as f64 / 2.0
}

/// Kell-equation-style polynomial approximation of water's molar density
/// (mol/L) as a function of Celsius temperature.
pub fn water_density_mol_per_l(temp_c: f64) -> f64 {
    let numerator = (temp_c - 3.9863).powi(2) * (temp_c + 288.9414);
    let denominator = 508929.2 * (temp_c + 68.12963);
    (1.0 - numerator / denominator) * 1000.0 / 18.0153
}

/// `bimol(T_c, G, H) = (G - H)*T_k/T_ref + H - R*T_k*ln(rho(T_c))`.
pub fn bimol(temp_c: f64, g_assoc: f64, h_assoc: f64) -> f64 {
    let t_k = temp_c + 273.15;
    let rho = water_density_mol_per_l(temp_c);
    (g_assoc - h_assoc) * t_k / T_REF + h_assoc - R * t_k * rho.ln()
}

/// Computes `G_bond(p) + penalty(p)`, where the penalty is zero when no
/// association parameters are supplied.
pub fn compute_free_energy(matrix_a: &Array2<i64>, polymer: &Polymer, assoc: Option<AssocParams>, temp_c: f64) -> f64 {
    let Some(assoc) = assoc else {
        return 0.0;
    };
    let g_bond = -bonds(matrix_a, polymer);
    let m: i64 = polymer.monomer_counts.iter().sum();
    let penalty = bimol(temp_c, assoc.g_assoc, assoc.h_assoc) * (m - 1) as f64;
    g_bond + penalty
}

type CacheKey = (Vec<i64>, u64, u64, u64);

/// Memoises free-energy results per `(polymer vector, G_assoc, H_assoc,
/// T_c)`, since the same association parameters are typically reused
/// across an entire polymer basis.
#[derive(Default)]
pub struct FreeEnergyCache {
    entries: Mutex<HashMap<CacheKey, f64>>,
}

impl FreeEnergyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(polymer: &Polymer, assoc: Option<AssocParams>, temp_c: f64) -> CacheKey {
        let (g, h) = assoc.map(|a| (a.g_assoc, a.h_assoc)).unwrap_or((0.0, 0.0));
        (polymer.monomer_counts.clone(), g.to_bits(), h.to_bits(), temp_c.to_bits())
    }

    pub fn get_or_compute(&self, matrix_a: &Array2<i64>, polymer: &Polymer, assoc: Option<AssocParams>, temp_c: f64) -> f64 {
        let key = Self::key(polymer, assoc, temp_c);
        if let Some(&value) = self.entries.lock().unwrap().get(&key) {
            return value;
        }
        let value = compute_free_energy(matrix_a, polymer, assoc, temp_c);
        self.entries.lock().unwrap().insert(key, value);
        value
    }
}

/// Computes free energy for every polymer in parallel — the one place the
/// concurrency model permits parallelism, since the computation is a pure
/// function of each polymer's own vector.
pub fn compute_free_energies_parallel(matrix_a: &Array2<i64>, polymers: &[Polymer], assoc: Option<AssocParams>, temp_c: f64) -> Vec<f64> {
    polymers.par_iter().map(|p| compute_free_energy(matrix_a, p, assoc, temp_c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;
    use tbn_core::tbn::Tbn;

    fn dimer_tbn() -> Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        let m1 = Monomer::new(vec![BindingSite::new("a", false)], None);
        let m2 = Monomer::new(vec![BindingSite::new("a", true)], None);
        Tbn::build(vec![m1, m2], idx, None).unwrap()
    }

    #[test]
    fn bare_dimer_with_one_bond_and_no_params_has_zero_free_energy() {
        let tbn = dimer_tbn();
        let polymer = Polymer::new(vec![1, 1]);
        assert_eq!(bonds(tbn.matrix_a(), &polymer), 1.0);
        assert_eq!(compute_free_energy(tbn.matrix_a(), &polymer, None, 37.0), 0.0);
    }

    #[test]
    fn free_energy_with_association_params_matches_formula() {
        let tbn = dimer_tbn();
        let polymer = Polymer::new(vec![1, 1]);
        let assoc = AssocParams { g_assoc: -3.0, h_assoc: -8.0 };
        let fe = compute_free_energy(tbn.matrix_a(), &polymer, Some(assoc), 37.0);
        let expected = bimol(37.0, -3.0, -8.0) * 1.0 - 1.0;
        assert!((fe - expected).abs() < 1e-9);
    }

    #[test]
    fn water_density_matches_reference_checkpoints_within_tolerance() {
        assert!((water_density_mol_per_l(25.0) - 55.5).abs() < 0.5);
        assert!((water_density_mol_per_l(37.0) - 55.14).abs() < 0.5);
    }

    #[test]
    fn cache_returns_identical_value_without_recomputation_error() {
        let tbn = dimer_tbn();
        let polymer = Polymer::new(vec![1, 1]);
        let cache = FreeEnergyCache::new();
        let a = cache.get_or_compute(tbn.matrix_a(), &polymer, None, 37.0);
        let b = cache.get_or_compute(tbn.matrix_a(), &polymer, None, 37.0);
        assert_eq!(a, b);
    }
}
