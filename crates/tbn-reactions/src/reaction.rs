use std::fmt;

/// A reaction over polymer-basis indices: negative entries are reactants,
/// positive entries are products, both given as multiplicities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub vector: Vec<i64>,
    pub polymer_names: Option<Vec<String>>,
}

impl Reaction {
    pub fn new(vector: Vec<i64>) -> Self {
        Self { vector, polymer_names: None }
    }

    pub fn with_names(vector: Vec<i64>, polymer_names: Vec<String>) -> Self {
        Self { vector, polymer_names: Some(polymer_names) }
    }

    /// Splits the reaction vector into `(polymer_index, multiplicity)` pairs
    /// for reactants (negative entries) and products (positive entries).
    pub fn get_reactants_and_products(&self) -> (Vec<(usize, i64)>, Vec<(usize, i64)>) {
        let mut reactants = Vec::new();
        let mut products = Vec::new();
        for (i, &count) in self.vector.iter().enumerate() {
            if count < 0 {
                reactants.push((i, -count));
            } else if count > 0 {
                products.push((i, count));
            }
        }
        (reactants, products)
    }

    /// True if total reactant multiplicity equals total product multiplicity.
    pub fn is_balanced(&self) -> bool {
        let (reactants, products) = self.get_reactants_and_products();
        let reactant_count: i64 = reactants.iter().map(|&(_, m)| m).sum();
        let product_count: i64 = products.iter().map(|&(_, m)| m).sum();
        reactant_count == product_count
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (reactants, products) = self.get_reactants_and_products();
        let format_side = |side: &[(usize, i64)]| -> String {
            if side.is_empty() {
                return "0".to_string();
            }
            side.iter()
                .map(|&(idx, mult)| {
                    let name = self
                        .polymer_names
                        .as_ref()
                        .and_then(|names| names.get(idx).cloned())
                        .unwrap_or_else(|| format!("P{idx}"));
                    if mult == 1 {
                        name
                    } else {
                        format!("{mult} {name}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        write!(f, "{} -> {}", format_side(&reactants), format_side(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_positive_and_negative_entries() {
        let r = Reaction::new(vec![-2, 0, 1, 1]);
        let (reactants, products) = r.get_reactants_and_products();
        assert_eq!(reactants, vec![(0, 2)]);
        assert_eq!(products, vec![(2, 1), (3, 1)]);
    }

    #[test]
    fn balanced_when_multiplicities_match() {
        assert!(Reaction::new(vec![-1, -1, 2]).is_balanced());
        assert!(!Reaction::new(vec![-1, 2]).is_balanced());
    }

    #[test]
    fn display_uses_names_when_present() {
        let r = Reaction::with_names(vec![-1, 1], vec!["A".into(), "B".into()]);
        assert_eq!(format!("{r}"), "A -> B");
    }

    #[test]
    fn display_falls_back_to_index_labels() {
        let r = Reaction::new(vec![-1, 1]);
        assert_eq!(format!("{r}"), "P0 -> P1");
    }
}
