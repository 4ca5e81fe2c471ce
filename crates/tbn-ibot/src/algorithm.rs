use std::collections::{BTreeSet, HashMap};

use tbn_core::tbn::Tbn;
use tbn_reactions::Reaction;

/// Novelty, imbalance, and their ratio for one reaction at a given point in
/// the IBOT loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionMetrics {
    /// Number of unassigned off-target polymers the reaction touches.
    pub novelty: usize,
    /// `sum(|count| * mu)` over reactants minus the same over products.
    pub imbalance: f64,
    /// `imbalance / novelty`, or `f64::INFINITY` when `novelty == 0`.
    pub ratio: f64,
}

/// One fixed-point iteration: the minimum ratio found, the reactions that
/// achieved it (within tolerance), and the polymers newly assigned a
/// concentration exponent as a result.
#[derive(Debug, Clone)]
pub struct IterationInfo {
    pub iteration: usize,
    pub mu_min: f64,
    pub reactions: Vec<Reaction>,
    pub assigned_polymers: BTreeSet<usize>,
}

const RATIO_TOLERANCE: f64 = 1e-10;

/// Assigns concentration exponents `mu` to off-target polymers: on-target
/// polymers are fixed at `mu = 1`; off-target polymers are assigned the
/// smallest `imbalance/novelty` ratio among reactions that still reference
/// an unassigned polymer, iterated to a fixed point.
pub struct IBOTAlgorithm<'a> {
    pub(crate) tbn: &'a Tbn,
    pub(crate) polymers: Vec<Vec<i64>>,
    pub(crate) on_target_indices: BTreeSet<usize>,
    off_target_indices: BTreeSet<usize>,
    reactions: Vec<Reaction>,
    pub(crate) mu: Vec<f64>,
    unassigned_off_target: BTreeSet<usize>,
    pub(crate) iteration_info: Vec<IterationInfo>,
}

impl<'a> IBOTAlgorithm<'a> {
    pub fn new(tbn: &'a Tbn, polymers: Vec<Vec<i64>>, on_target_indices: BTreeSet<usize>, reactions: Vec<Reaction>) -> Self {
        let n = polymers.len();
        let off_target_indices: BTreeSet<usize> = (0..n).filter(|i| !on_target_indices.contains(i)).collect();
        let mut mu = vec![0.0; n];
        for &idx in &on_target_indices {
            mu[idx] = 1.0;
        }
        let unassigned_off_target = off_target_indices.clone();

        Self {
            tbn,
            polymers,
            on_target_indices,
            off_target_indices,
            reactions,
            mu,
            unassigned_off_target,
            iteration_info: Vec::new(),
        }
    }

    pub fn on_target_indices(&self) -> &BTreeSet<usize> {
        &self.on_target_indices
    }

    pub fn off_target_indices(&self) -> &BTreeSet<usize> {
        &self.off_target_indices
    }

    pub fn iteration_info(&self) -> &[IterationInfo] {
        &self.iteration_info
    }

    pub fn tbn(&self) -> &Tbn {
        self.tbn
    }

    pub fn polymers(&self) -> &[Vec<i64>] {
        &self.polymers
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn compute_reaction_metrics(&self, reaction: &Reaction) -> ReactionMetrics {
        let mut novelty = 0usize;
        let mut imbalance = 0.0f64;

        for (i, &count) in reaction.vector.iter().enumerate() {
            if count == 0 {
                continue;
            }
            if self.unassigned_off_target.contains(&i) {
                novelty += 1;
            }
            if count < 0 {
                imbalance += (-count) as f64 * self.mu[i];
            } else {
                imbalance -= count as f64 * self.mu[i];
            }
        }

        let ratio = if novelty > 0 { imbalance / novelty as f64 } else { f64::INFINITY };
        ReactionMetrics { novelty, imbalance, ratio }
    }

    /// Runs the fixed-point loop to completion, returning the polymer index
    /// to `mu` map for every on-target polymer and every off-target polymer
    /// that could be reached (`mu > 0`). Unreached off-target polymers are
    /// dropped.
    pub fn run(&mut self) -> HashMap<usize, f64> {
        let mut iteration = 0usize;

        while !self.unassigned_off_target.is_empty() {
            iteration += 1;

            let active_reactions: Vec<(&Reaction, ReactionMetrics)> = self
                .reactions
                .iter()
                .map(|r| (r, self.compute_reaction_metrics(r)))
                .filter(|(_, m)| m.novelty > 0)
                .collect();

            if active_reactions.is_empty() {
                break;
            }

            let min_ratio = active_reactions
                .iter()
                .map(|(_, m)| m.ratio)
                .fold(f64::INFINITY, f64::min);

            let min_reactions: Vec<Reaction> = active_reactions
                .iter()
                .filter(|(_, m)| (m.ratio - min_ratio).abs() < RATIO_TOLERANCE)
                .map(|(r, _)| (*r).clone())
                .collect();

            let mut polymers_to_assign = BTreeSet::new();
            for reaction in &min_reactions {
                for (i, &count) in reaction.vector.iter().enumerate() {
                    if count != 0 && self.unassigned_off_target.contains(&i) {
                        polymers_to_assign.insert(i);
                    }
                }
            }

            self.iteration_info.push(IterationInfo {
                iteration,
                mu_min: min_ratio,
                reactions: min_reactions,
                assigned_polymers: polymers_to_assign.clone(),
            });

            for &p in &polymers_to_assign {
                self.mu[p] = min_ratio;
                self.unassigned_off_target.remove(&p);
            }
        }

        let mut assigned = HashMap::new();
        for i in 0..self.polymers.len() {
            if self.on_target_indices.contains(&i) || self.mu[i] > 0.0 {
                assigned.insert(i, self.mu[i]);
            }
        }
        assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;

    fn dummy_tbn() -> Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        let m = Monomer::new(vec![BindingSite::new("a", false)], None);
        Tbn::build(vec![m], idx, None).unwrap()
    }

    #[test]
    fn on_target_polymers_start_at_mu_one() {
        let tbn = dummy_tbn();
        let polymers = vec![vec![1], vec![2]];
        let algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), vec![]);
        assert_eq!(algo.mu(), &[1.0, 0.0]);
    }

    #[test]
    fn no_active_reactions_leaves_off_target_unassigned() {
        let tbn = dummy_tbn();
        let polymers = vec![vec![1], vec![2]];
        let mut algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), vec![]);
        let assigned = algo.run();
        assert_eq!(assigned, HashMap::from([(0, 1.0)]));
    }

    #[test]
    fn single_reaction_assigns_ratio_to_off_target_polymer() {
        let tbn = dummy_tbn();
        // on-target polymer 0 (mu=1), off-target polymer 1.
        // Reaction: 2*P0 -> 1*P1  => imbalance = 2*1 - 1*mu1; novelty=1 (only P1 unassigned)
        // ratio = imbalance (since novelty=1), solved when assigned: mu1 is set to ratio computed from imbalance before assignment (imbalance=2).
        let polymers = vec![vec![1], vec![2]];
        let reactions = vec![Reaction::new(vec![-2, 1])];
        let mut algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), reactions);
        let assigned = algo.run();
        assert_eq!(assigned.get(&1), Some(&2.0));
    }

    #[test]
    fn metrics_ratio_is_infinite_when_novelty_is_zero() {
        let tbn = dummy_tbn();
        let polymers = vec![vec![1]];
        let algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), vec![]);
        let metrics = algo.compute_reaction_metrics(&Reaction::new(vec![-1]));
        assert_eq!(metrics.novelty, 0);
        assert!(metrics.ratio.is_infinite());
    }
}
