//! The polymer-basis pipeline: augment, invoke the Hilbert-basis solver,
//! deduplicate preserving first occurrence, and cache the result in
//! `.tbnpolymat` keyed by the stoichiometry matrix hash.

use std::collections::HashSet;
use std::path::Path;

use tbn_core::polymer::Polymer;
use tbn_core::tbn::Tbn;
use tbn_core::units::Unit;
use tbn_io::tbnpolymat::{self, PolymatHeader, PolymatRow};
use tbn_solver::HilbertBasisSolver;

use crate::error::{BasisError, Result};

/// Computes the polymer basis for `tbn` by invoking `solver` on the
/// augmented stoichiometry matrix, then dropping exact-duplicate rows,
/// keeping the first occurrence of each.
pub fn compute_polymer_basis(tbn: &Tbn, solver: &dyn HilbertBasisSolver) -> Result<Vec<Polymer>> {
    let (augmented, n_original) = tbn.augmented_for_basis();
    let hilbert_basis = solver.hilbert_basis(&augmented)?;

    let mut polymers = Vec::new();
    let mut seen: HashSet<Vec<i64>> = HashSet::new();
    for vector in hilbert_basis {
        let counts: Vec<i64> = vector.iter().take(n_original).copied().collect();
        if seen.insert(counts.clone()) {
            polymers.push(Polymer::new(counts));
        }
    }

    Ok(polymers)
}

/// Attempts to load a cached polymer basis from a `.tbnpolymat` file,
/// validated by matrix-hash equality. Any mismatch, missing file, or parse
/// failure is treated as a cache miss (`None`), never a hard error.
pub fn load_cached(tbn: &Tbn, polymat_path: &Path) -> Option<Vec<Polymer>> {
    let content = std::fs::read_to_string(polymat_path).ok()?;
    let expected_hash = tbn.matrix_hash_hex();
    if !tbnpolymat::matches_hash(&content, &expected_hash, &polymat_path.display().to_string()) {
        return None;
    }
    let (header, rows) = tbnpolymat::parse(&content, &polymat_path.display().to_string()).ok()?;
    if header.n_monomers != tbn.monomers.len() {
        return None;
    }
    Some(rows.into_iter().map(|row| Polymer::new(row.counts)).collect())
}

/// Writes `polymers` (with optional free energies / concentrations) as a
/// `.tbnpolymat` file, atomically (write-to-temp-then-rename in the same
/// directory) so concurrent readers never observe a partial file. When
/// `concentrations` is present, rows are emitted sorted by descending
/// concentration (ties broken by the input order) rather than basis order.
pub fn save_polymat(
    tbn: &Tbn,
    polymers: &[Polymer],
    path: &Path,
    free_energies: Option<&[f64]>,
    concentrations: Option<&[f64]>,
    units: Option<Unit>,
) -> Result<()> {
    let header = PolymatHeader {
        n_monomers: tbn.monomers.len(),
        n_polymers: polymers.len(),
        matrix_hash: Some(tbn.matrix_hash_hex()),
        concentration_units: units,
        has_free_energies: free_energies.is_some(),
        has_concentrations: concentrations.is_some(),
    };

    let mut order: Vec<usize> = (0..polymers.len()).collect();
    if let Some(concentrations) = concentrations {
        sort_by_concentration_desc(&mut order, concentrations);
    }

    let rows: Vec<PolymatRow> = order
        .into_iter()
        .map(|i| PolymatRow {
            counts: polymers[i].monomer_counts.clone(),
            free_energy: free_energies.map(|fe| fe[i]),
            concentration: concentrations.map(|c| c[i]),
        })
        .collect();

    let rendered = tbnpolymat::format_polymat(&header, &rows);
    write_atomic(path, &rendered)
}

/// Stable-sorts `(polymer, free_energy, concentration)` triples by
/// descending concentration, ties broken by original input order — Rust's
/// `sort_by` is inherently stable, satisfying the ordering invariant.
pub fn sort_by_concentration_desc(order: &mut [usize], concentrations: &[f64]) {
    order.sort_by(|&a, &b| concentrations[b].partial_cmp(&concentrations[a]).unwrap_or(std::cmp::Ordering::Equal));
}

/// Writes the "user-friendly" polymer basis listing: one `# Polymer i`
/// block per polymer, blank-line separated, each monomer line prefixed by
/// its multiplicity.
pub fn save_polymer_basis_user_friendly(tbn: &Tbn, polymers: &[Polymer], path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str(&format!("# Polymer basis - {} polymers\n", polymers.len()));
    out.push_str("#\n");

    for (i, polymer) in polymers.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("# Polymer {}\n", i + 1));
        for (idx, count) in polymer.present_monomers() {
            let monomer = &tbn.monomers[idx];
            let spec = monomer.name.clone().unwrap_or_else(|| monomer.binding_sites_str());
            out.push_str(&format!("{count} | {spec}\n"));
        }
    }

    write_atomic(path, &out)
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("tbn-basis-output")
    ));
    std::fs::write(&tmp_path, content).map_err(|e| BasisError::Io { path: tmp_path.display().to_string(), source: e })?;
    std::fs::rename(&tmp_path, path).map_err(|e| BasisError::Io { path: path.display().to_string(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;
    use tbn_solver::Result as SolverResult;

    struct StubSolver(Vec<Vec<i64>>);

    impl HilbertBasisSolver for StubSolver {
        fn hilbert_basis(&self, _matrix: &ndarray::Array2<i64>) -> SolverResult<Vec<Array1<i64>>> {
            Ok(self.0.iter().map(|v| Array1::from(v.clone())).collect())
        }
        fn module_generators_with_slice(&self, _: &ndarray::Array2<i64>, _: &Array1<i64>) -> SolverResult<Vec<Array1<i64>>> {
            unimplemented!()
        }
        fn available(&self) -> bool {
            true
        }
        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn toy_tbn() -> Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        idx.get_or_insert("b");
        let m1 = Monomer::new(vec![BindingSite::new("a", false), BindingSite::new("b", false)], None);
        let m2 = Monomer::new(vec![BindingSite::new("a", true), BindingSite::new("b", true)], None);
        Tbn::build(vec![m1, m2], idx, None).unwrap()
    }

    #[test]
    fn dedupes_preserving_first_occurrence() {
        let tbn = toy_tbn();
        let solver = StubSolver(vec![vec![1, 1, 0], vec![1, 1, 0], vec![2, 2, 0]]);
        let basis = compute_polymer_basis(&tbn, &solver).unwrap();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[0].monomer_counts, vec![1, 1]);
        assert_eq!(basis[1].monomer_counts, vec![2, 2]);
    }

    #[test]
    fn cache_round_trips_through_hash_match() {
        let tbn = toy_tbn();
        let dir = std::env::temp_dir().join(format!("tbn-basis-cache-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.tbnpolymat");

        let polymers = vec![Polymer::new(vec![1, 1])];
        save_polymat(&tbn, &polymers, &path, None, None, None).unwrap();

        let loaded = load_cached(&tbn, &path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].monomer_counts, vec![1, 1]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_polymat_orders_rows_by_descending_concentration() {
        let tbn = toy_tbn();
        let dir = std::env::temp_dir().join(format!("tbn-basis-sort-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.tbnpolymat");

        let polymers = vec![Polymer::new(vec![1, 1]), Polymer::new(vec![2, 2]), Polymer::new(vec![3, 3])];
        let concentrations = [0.5, 2.0, 1.0];
        save_polymat(&tbn, &polymers, &path, None, Some(&concentrations), None).unwrap();

        let (_, rows) = tbnpolymat::parse(&std::fs::read_to_string(&path).unwrap(), "test").unwrap();
        assert_eq!(rows[0].counts, vec![2, 2]);
        assert_eq!(rows[1].counts, vec![3, 3]);
        assert_eq!(rows[2].counts, vec![1, 1]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn tampered_hash_is_a_cache_miss() {
        let tbn = toy_tbn();
        let dir = std::env::temp_dir().join(format!("tbn-basis-tamper-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.tbnpolymat");
        std::fs::write(&path, "# Number of monomers: 2\n\\MATRIX-HASH: deadbeef\n1 1\n").unwrap();

        assert!(load_cached(&tbn, &path).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
