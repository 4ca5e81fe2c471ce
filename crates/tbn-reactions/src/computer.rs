use std::collections::BTreeSet;

use ndarray::Array2;
use tbn_core::tbn::Tbn;
use tbn_solver::HilbertBasisSolver;

use crate::error::{ReactionError, Result};
use crate::reaction::Reaction;

/// Computes irreducible canonical reactions for a TBN's polymer basis:
/// reactions that conserve mass (`B*r = 0`), are canonical (no off-target
/// reactants, `S*r >= 0`), and cannot be written as the sum of two other
/// canonical reactions.
pub struct CanonicalReactionsComputer<'a> {
    tbn: &'a Tbn,
    polymers: Vec<Vec<i64>>,
    on_target_indices: BTreeSet<usize>,
    off_target_indices: BTreeSet<usize>,
    b_matrix: Array2<i64>,
    s_matrix: Array2<i64>,
}

impl<'a> CanonicalReactionsComputer<'a> {
    /// Identifies, within `polymer_basis`, the indices of the polymers
    /// whose monomer-count vectors match those parsed from an on-target
    /// `.tbnpolys` file.
    pub fn find_on_target_indices(
        on_target_polymers: &[Vec<i64>],
        polymer_basis: &[Vec<i64>],
    ) -> Result<BTreeSet<usize>> {
        let mut indices = BTreeSet::new();
        for on_target in on_target_polymers {
            let found = polymer_basis.iter().position(|p| p == on_target);
            match found {
                Some(idx) => {
                    indices.insert(idx);
                }
                None => return Err(ReactionError::OnTargetPolymerNotFound(on_target.clone())),
            }
        }
        Ok(indices)
    }

    pub fn setup_matrices(tbn: &'a Tbn, polymer_basis: Vec<Vec<i64>>, on_target_indices: BTreeSet<usize>) -> Self {
        let n_monomers = tbn.monomers.len();
        let n_polymers = polymer_basis.len();
        let off_target_indices: BTreeSet<usize> =
            (0..n_polymers).filter(|i| !on_target_indices.contains(i)).collect();
        let n_off_target = off_target_indices.len();

        let mut b_matrix = Array2::<i64>::zeros((n_monomers, n_polymers));
        for (p, polymer) in polymer_basis.iter().enumerate() {
            for (row, &count) in b_matrix.column_mut(p).iter_mut().zip(polymer.iter()) {
                *row = count;
            }
        }

        let mut s_matrix = Array2::<i64>::zeros((n_off_target, n_polymers));
        for (i, &p) in off_target_indices.iter().enumerate() {
            s_matrix[[i, p]] = 1;
        }

        Self {
            tbn,
            polymers: polymer_basis,
            on_target_indices,
            off_target_indices,
            b_matrix,
            s_matrix,
        }
    }

    pub fn on_target_indices(&self) -> &BTreeSet<usize> {
        &self.on_target_indices
    }

    pub fn off_target_indices(&self) -> &BTreeSet<usize> {
        &self.off_target_indices
    }

    fn lift(&self) -> (Array2<i64>, Vec<usize>, Vec<usize>) {
        let on_target_list: Vec<usize> = self.on_target_indices.iter().copied().collect();
        let off_target_list: Vec<usize> = self.off_target_indices.iter().copied().collect();
        let n_on_target = on_target_list.len();
        let n_off_target = off_target_list.len();

        let mut b_lifted = Array2::<i64>::zeros((self.b_matrix.nrows(), 2 * n_on_target + n_off_target));
        for (i, &p) in on_target_list.iter().enumerate() {
            let col = self.b_matrix.column(p).to_owned();
            b_lifted.column_mut(i).assign(&col);
            b_lifted.column_mut(n_on_target + i).assign(&(-&col));
        }
        for (i, &p) in off_target_list.iter().enumerate() {
            let col = self.b_matrix.column(p).to_owned();
            b_lifted.column_mut(2 * n_on_target + i).assign(&col);
        }
        (b_lifted, on_target_list, off_target_list)
    }

    fn unlift(&self, h_vector: &ndarray::Array1<i64>, on_target_list: &[usize], off_target_list: &[usize]) -> Vec<i64> {
        let n_on_target = on_target_list.len();
        let mut reaction = vec![0i64; self.polymers.len()];
        for (i, &p) in on_target_list.iter().enumerate() {
            reaction[p] = h_vector[i] - h_vector[n_on_target + i];
        }
        for (i, &p) in off_target_list.iter().enumerate() {
            reaction[p] = h_vector[2 * n_on_target + i];
        }
        reaction
    }

    /// Computes all irreducible canonical reactions: the Hilbert basis of
    /// `{ r : B*r = 0, S*r >= 0 }`, found by lifting on-target variables
    /// into positive/negative parts so the whole system becomes a
    /// nonnegative-orthant cone.
    pub fn compute_irreducible_canonical_reactions(&self, solver: &dyn HilbertBasisSolver) -> Result<Vec<Reaction>> {
        let (b_lifted, on_target_list, off_target_list) = self.lift();
        let hilbert_basis = solver.hilbert_basis(&b_lifted)?;

        let mut reactions = Vec::new();
        for h_vector in &hilbert_basis {
            let reaction = self.unlift(h_vector, &on_target_list, &off_target_list);
            if reaction.iter().any(|&v| v != 0) {
                reactions.push(Reaction::new(reaction));
            }
        }
        Ok(reactions)
    }

    /// Computes irreducible canonical reactions that produce at least one
    /// of `target_polymer_indices` (which must all be off-target). Used for
    /// upper bounds on specific off-target polymer concentrations; only
    /// supported with the Normaliz solver since it requires filtering the
    /// full Hilbert basis for a strict-inequality condition 4ti2 cannot
    /// express directly.
    pub fn compute_irreducible_canonical_reactions_for_targets(
        &self,
        solver: &dyn HilbertBasisSolver,
        target_polymer_indices: &BTreeSet<usize>,
    ) -> Result<Vec<Reaction>> {
        if solver.name() != "normaliz" {
            return Err(ReactionError::UnsupportedSolver);
        }

        let invalid_targets: Vec<usize> = target_polymer_indices
            .intersection(&self.on_target_indices)
            .copied()
            .collect();
        if !invalid_targets.is_empty() {
            return Err(ReactionError::TargetsMustBeOffTarget(invalid_targets));
        }

        let n_polymers = self.polymers.len();
        let out_of_range: Vec<usize> = target_polymer_indices.iter().copied().filter(|&i| i >= n_polymers).collect();
        if !out_of_range.is_empty() {
            return Err(ReactionError::TargetIndicesOutOfRange(out_of_range));
        }

        let (b_lifted, on_target_list, off_target_list) = self.lift();
        let n_on_target = on_target_list.len();

        let mut p_lifted = vec![0i64; 2 * n_on_target + off_target_list.len()];
        for (i, &p) in off_target_list.iter().enumerate() {
            if target_polymer_indices.contains(&p) {
                p_lifted[2 * n_on_target + i] = 1;
            }
        }

        let hilbert_basis_raw = solver.hilbert_basis(&b_lifted)?;

        let mut reactions = Vec::new();
        for h_vector in &hilbert_basis_raw {
            let dot: i64 = p_lifted.iter().zip(h_vector.iter()).map(|(a, b)| a * b).sum();
            if dot > 0 {
                let reaction = self.unlift(h_vector, &on_target_list, &off_target_list);
                if reaction.iter().any(|&v| v != 0) {
                    reactions.push(Reaction::new(reaction));
                }
            }
        }
        Ok(reactions)
    }

    /// Returns the first reaction, among those entirely over on-target
    /// polymers, whose reactant and product multiplicities differ — a
    /// violation of detailed balance.
    pub fn check_on_target_detailed_balance<'r>(&self, reactions: &'r [Reaction]) -> Option<&'r Reaction> {
        reactions.iter().find(|reaction| {
            let (reactants, products) = reaction.get_reactants_and_products();
            let all_on_target = reactants
                .iter()
                .chain(products.iter())
                .all(|&(idx, _)| self.on_target_indices.contains(&idx));
            all_on_target && !reaction.is_balanced()
        })
    }

    pub fn b_matrix(&self) -> &Array2<i64> {
        &self.b_matrix
    }

    pub fn s_matrix(&self) -> &Array2<i64> {
        &self.s_matrix
    }

    pub fn tbn(&self) -> &Tbn {
        self.tbn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;
    use tbn_solver::SolverError;

    struct StubSolver {
        basis: Vec<Array1<i64>>,
    }

    impl HilbertBasisSolver for StubSolver {
        fn hilbert_basis(&self, _matrix: &Array2<i64>) -> tbn_solver::Result<Vec<Array1<i64>>> {
            Ok(self.basis.clone())
        }
        fn module_generators_with_slice(&self, _equations: &Array2<i64>, _slice: &Array1<i64>) -> tbn_solver::Result<Vec<Array1<i64>>> {
            Err(SolverError::EmptyBasis)
        }
        fn available(&self) -> bool {
            true
        }
        fn name(&self) -> &'static str {
            "normaliz"
        }
    }

    fn two_monomer_tbn() -> Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        let m1 = Monomer::new(vec![BindingSite::new("a", false)], None);
        let m2 = Monomer::new(vec![BindingSite::new("a", true)], None);
        Tbn::build(vec![m1, m2], idx, None).unwrap()
    }

    #[test]
    fn find_on_target_indices_locates_matching_vectors() {
        let basis = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
        let on_target = vec![vec![1, 1]];
        let indices = CanonicalReactionsComputer::find_on_target_indices(&on_target, &basis).unwrap();
        assert_eq!(indices, BTreeSet::from([2]));
    }

    #[test]
    fn find_on_target_indices_errors_when_missing() {
        let basis = vec![vec![1, 0]];
        let on_target = vec![vec![0, 5]];
        assert!(CanonicalReactionsComputer::find_on_target_indices(&on_target, &basis).is_err());
    }

    #[test]
    fn setup_matrices_splits_on_and_off_target() {
        let tbn = two_monomer_tbn();
        let basis = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
        let on_target = BTreeSet::from([2]);
        let computer = CanonicalReactionsComputer::setup_matrices(&tbn, basis, on_target);
        assert_eq!(computer.on_target_indices(), &BTreeSet::from([2]));
        assert_eq!(computer.off_target_indices(), &BTreeSet::from([0, 1]));
        assert_eq!(computer.s_matrix().shape(), &[2, 3]);
    }

    #[test]
    fn trivial_all_zero_hilbert_vectors_produce_no_reactions() {
        let tbn = two_monomer_tbn();
        let basis = vec![vec![1, 0], vec![0, 1]];
        let computer = CanonicalReactionsComputer::setup_matrices(&tbn, basis, BTreeSet::new());
        let solver = StubSolver { basis: vec![Array1::from(vec![0, 0])] };
        let reactions = computer.compute_irreducible_canonical_reactions(&solver).unwrap();
        assert!(reactions.is_empty());
    }

    #[test]
    fn for_targets_rejects_on_target_requests() {
        let tbn = two_monomer_tbn();
        let basis = vec![vec![1, 0], vec![0, 1]];
        let computer = CanonicalReactionsComputer::setup_matrices(&tbn, basis, BTreeSet::from([0]));
        let solver = StubSolver { basis: vec![] };
        let err = computer
            .compute_irreducible_canonical_reactions_for_targets(&solver, &BTreeSet::from([0]))
            .unwrap_err();
        assert!(matches!(err, ReactionError::TargetsMustBeOffTarget(_)));
    }

    #[test]
    fn for_targets_rejects_non_normaliz_solver() {
        struct FourTiTwoStub;
        impl HilbertBasisSolver for FourTiTwoStub {
            fn hilbert_basis(&self, _m: &Array2<i64>) -> tbn_solver::Result<Vec<Array1<i64>>> {
                Ok(vec![])
            }
            fn module_generators_with_slice(&self, _e: &Array2<i64>, _s: &Array1<i64>) -> tbn_solver::Result<Vec<Array1<i64>>> {
                Ok(vec![])
            }
            fn available(&self) -> bool {
                true
            }
            fn name(&self) -> &'static str {
                "4ti2"
            }
        }
        let tbn = two_monomer_tbn();
        let basis = vec![vec![1, 0], vec![0, 1]];
        let computer = CanonicalReactionsComputer::setup_matrices(&tbn, basis, BTreeSet::from([0]));
        let solver = FourTiTwoStub;
        let err = computer
            .compute_irreducible_canonical_reactions_for_targets(&solver, &BTreeSet::from([1]))
            .unwrap_err();
        assert!(matches!(err, ReactionError::UnsupportedSolver));
    }

    #[test]
    fn detailed_balance_flags_unbalanced_on_target_reaction() {
        let tbn = two_monomer_tbn();
        let basis = vec![vec![1, 0], vec![0, 1]];
        let computer = CanonicalReactionsComputer::setup_matrices(&tbn, basis, BTreeSet::from([0, 1]));
        let reactions = vec![Reaction::new(vec![-1, 2])];
        let violation = computer.check_on_target_detailed_balance(&reactions);
        assert!(violation.is_some());
    }
}
