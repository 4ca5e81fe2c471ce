use std::hash::{Hash, Hasher};

/// A nonnegative integer combination of monomers, identified purely by its
/// monomer-count vector. Free energy and concentration are memoised scalars
/// filled in by later pipeline stages.
#[derive(Debug, Clone)]
pub struct Polymer {
    pub monomer_counts: Vec<i64>,
    pub free_energy: Option<f64>,
    pub concentration: Option<f64>,
}

impl Polymer {
    pub fn new(monomer_counts: Vec<i64>) -> Self {
        Self {
            monomer_counts,
            free_energy: None,
            concentration: None,
        }
    }

    pub fn total_monomer_count(&self) -> i64 {
        self.monomer_counts.iter().sum()
    }

    /// Monomer index/count pairs for every monomer present with count > 0.
    pub fn present_monomers(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.monomer_counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, &c)| (i, c))
    }
}

impl PartialEq for Polymer {
    fn eq(&self, other: &Self) -> bool {
        self.monomer_counts == other.monomer_counts
    }
}

impl Eq for Polymer {}

impl Hash for Polymer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.monomer_counts.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_memoised_scalars() {
        let mut a = Polymer::new(vec![1, 0, 2]);
        let mut b = Polymer::new(vec![1, 0, 2]);
        a.free_energy = Some(-3.0);
        b.free_energy = Some(5.0);
        assert_eq!(a, b);
    }

    #[test]
    fn present_monomers_skips_zero_counts() {
        let p = Polymer::new(vec![0, 2, 0, 1]);
        let present: Vec<_> = p.present_monomers().collect();
        assert_eq!(present, vec![(1, 2), (3, 1)]);
    }
}
