use ndarray::{Array1, Array2};
use sha2::{Digest, Sha256};

use crate::error::{Result, TbnError};
use crate::index::BindingSiteIndex;
use crate::monomer::Monomer;
use crate::units::{to_molar, Unit};

const RESERVED_NAMES: [&str; 2] = ["UNITS", "MATRIX-HASH"];

/// An ordered list of monomers plus the binding-site index and optional unit
/// tag they were parsed against. The stoichiometry matrix and Molar
/// concentrations are derived once at construction time and cached.
#[derive(Debug, Clone)]
pub struct Tbn {
    pub monomers: Vec<Monomer>,
    pub binding_site_index: BindingSiteIndex,
    pub concentration_units: Option<Unit>,
    matrix_a: Array2<i64>,
    concentrations_molar: Option<Vec<f64>>,
}

impl Tbn {
    /// Validates reserved keywords and name collisions, then builds the
    /// stoichiometry matrix and Molar concentration vector.
    pub fn build(
        monomers: Vec<Monomer>,
        binding_site_index: BindingSiteIndex,
        concentration_units: Option<Unit>,
    ) -> Result<Self> {
        for monomer in &monomers {
            if let Some(name) = &monomer.name {
                if name.starts_with('\\') || RESERVED_NAMES.contains(&name.as_str()) {
                    return Err(TbnError::Semantics(format!(
                        "monomer name '{name}' is reserved (cannot start with '\\\\' or equal UNITS/MATRIX-HASH)"
                    )));
                }
                if binding_site_index.index_of(name).is_some() {
                    return Err(TbnError::Semantics(format!(
                        "monomer name '{name}' collides with a binding-site name"
                    )));
                }
            }
        }

        let n_sites = binding_site_index.len();
        let n_monomers = monomers.len();
        let mut matrix_a = Array2::<i64>::zeros((n_sites, n_monomers));
        for (col, monomer) in monomers.iter().enumerate() {
            let vector = monomer.to_vector(&binding_site_index);
            for (row, value) in vector.into_iter().enumerate() {
                matrix_a[[row, col]] = value;
            }
        }

        let concentrations_molar = if concentration_units.is_some() {
            let unit = concentration_units.unwrap();
            Some(
                monomers
                    .iter()
                    .map(|m| to_molar(m.concentration.unwrap_or(0.0), unit))
                    .collect(),
            )
        } else {
            None
        };

        Ok(Self {
            monomers,
            binding_site_index,
            concentration_units,
            matrix_a,
            concentrations_molar,
        })
    }

    pub fn matrix_a(&self) -> &Array2<i64> {
        &self.matrix_a
    }

    pub fn concentrations(&self) -> Option<&[f64]> {
        self.concentrations_molar.as_deref()
    }

    /// Tests `A . c >= 0` row-wise, where `c` is the Molar concentration
    /// vector if present, else the all-ones vector. Returns the list of
    /// `(row_index, excess)` for every violating row.
    pub fn check_star_limiting(&self) -> std::result::Result<(), Vec<(usize, f64)>> {
        let n = self.monomers.len();
        let c: Array1<f64> = match &self.concentrations_molar {
            Some(conc) => Array1::from(conc.clone()),
            None => Array1::from_elem(n, 1.0),
        };

        let mut violations = Vec::new();
        for row in 0..self.binding_site_index.len() {
            let excess: f64 = (0..n).map(|col| self.matrix_a[[row, col]] as f64 * c[col]).sum();
            if excess < 0.0 {
                violations.push((row, excess));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Appends a synthetic `-e_x` column for every base name `x` whose
    /// singleton-star column is not already present, producing the matrix
    /// handed to the Hilbert-basis solver. Returns `(A', n)` where `n` is
    /// the original monomer count.
    pub fn augmented_for_basis(&self) -> (Array2<i64>, usize) {
        let n = self.monomers.len();
        let n_sites = self.binding_site_index.len();

        let mut extra_columns = Vec::new();
        for row in 0..n_sites {
            let has_singleton_star = (0..n).any(|col| {
                self.matrix_a[[row, col]] == -1
                    && (0..n_sites).all(|r2| r2 == row || self.matrix_a[[r2, col]] == 0)
            });
            if !has_singleton_star {
                extra_columns.push(row);
            }
        }

        let mut augmented = Array2::<i64>::zeros((n_sites, n + extra_columns.len()));
        augmented.slice_mut(ndarray::s![.., 0..n]).assign(&self.matrix_a);
        for (k, &row) in extra_columns.iter().enumerate() {
            augmented[[row, n + k]] = -1;
        }

        (augmented, n)
    }

    /// SHA-256 over (rows as u64-LE, cols as u64-LE, row-major i64-LE cells).
    pub fn matrix_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        let (rows, cols) = self.matrix_a.dim();
        hasher.update((rows as u64).to_le_bytes());
        hasher.update((cols as u64).to_le_bytes());
        for row in 0..rows {
            for col in 0..cols {
                hasher.update(self.matrix_a[[row, col]].to_le_bytes());
            }
        }
        hasher.finalize().into()
    }

    pub fn matrix_hash_hex(&self) -> String {
        self.matrix_hash().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::BindingSite;

    fn index_with(names: &[&str]) -> BindingSiteIndex {
        let mut idx = BindingSiteIndex::new();
        for n in names {
            idx.get_or_insert(n);
        }
        idx
    }

    #[test]
    fn star_limiting_reports_negative_excess_row() {
        let idx = index_with(&["a", "b"]);
        let m1 = Monomer::new(vec![BindingSite::new("a", true), BindingSite::new("a", true)], None);
        let m2 = Monomer::new(vec![BindingSite::new("b", false)], None);
        let tbn = Tbn::build(vec![m1, m2], idx, None).unwrap();

        let result = tbn.check_star_limiting();
        let violations = result.unwrap_err();
        assert_eq!(violations, vec![(0, -2.0)]);
    }

    #[test]
    fn matrix_hash_changes_on_monomer_reorder() {
        let idx = index_with(&["a", "b"]);
        let m1 = Monomer::new(vec![BindingSite::new("a", false)], None);
        let m2 = Monomer::new(vec![BindingSite::new("b", false)], None);

        let tbn1 = Tbn::build(vec![m1.clone(), m2.clone()], idx.clone(), None).unwrap();
        let tbn2 = Tbn::build(vec![m2, m1], idx, None).unwrap();

        assert_ne!(tbn1.matrix_hash(), tbn2.matrix_hash());
    }

    #[test]
    fn matrix_hash_stable_across_recomputation() {
        let idx = index_with(&["a"]);
        let m1 = Monomer::new(vec![BindingSite::new("a", false)], None);
        let tbn1 = Tbn::build(vec![m1.clone()], idx.clone(), None).unwrap();
        let tbn2 = Tbn::build(vec![m1], idx, None).unwrap();
        assert_eq!(tbn1.matrix_hash(), tbn2.matrix_hash());
    }

    #[test]
    fn augmentation_adds_missing_singleton_star_columns() {
        let idx = index_with(&["a", "b"]);
        // Only "a" has a pure -a* singleton; "b" does not, so it gets augmented.
        let m1 = Monomer::new(vec![BindingSite::new("a", true)], None);
        let m2 = Monomer::new(vec![BindingSite::new("b", false)], None);
        let tbn = Tbn::build(vec![m1, m2], idx, None).unwrap();

        let (augmented, n) = tbn.augmented_for_basis();
        assert_eq!(n, 2);
        assert_eq!(augmented.ncols(), 3);
        assert_eq!(augmented[[1, 2]], -1);
    }

    #[test]
    fn reserved_monomer_name_is_rejected() {
        let idx = index_with(&["a"]);
        let m = Monomer::new(vec![BindingSite::new("a", false)], Some("UNITS".into()));
        assert!(Tbn::build(vec![m], idx, None).is_err());
    }

    #[test]
    fn monomer_name_colliding_with_site_is_rejected() {
        let idx = index_with(&["a"]);
        let m = Monomer::new(vec![BindingSite::new("a", false)], Some("a".into()));
        assert!(Tbn::build(vec![m], idx, None).is_err());
    }
}
