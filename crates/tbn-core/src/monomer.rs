use crate::index::BindingSiteIndex;
use crate::site::BindingSite;

/// An ordered multiset of binding sites, plus optional name and concentration.
#[derive(Debug, Clone)]
pub struct Monomer {
    pub binding_sites: Vec<BindingSite>,
    pub name: Option<String>,
    /// True if `name` was written as the `sites >name` suffix form rather than `name: sites`.
    pub name_is_suffix: bool,
    /// Declared concentration in the TBN file's own units (not yet converted to Molar).
    pub concentration: Option<f64>,
    pub original_line: String,
}

impl Monomer {
    pub fn new(binding_sites: Vec<BindingSite>, name: Option<String>) -> Self {
        Self {
            binding_sites,
            name,
            name_is_suffix: false,
            concentration: None,
            original_line: String::new(),
        }
    }

    /// Canonical integer vector over the binding-site index: +1 per unstarred
    /// occurrence, -1 per starred occurrence, summed per base name.
    pub fn to_vector(&self, index: &BindingSiteIndex) -> Vec<i64> {
        let mut v = vec![0i64; index.len()];
        for site in &self.binding_sites {
            let row = index
                .index_of(&site.name)
                .expect("binding site must already be registered in the index");
            v[row] += if site.is_star { -1 } else { 1 };
        }
        v
    }

    /// Binding sites joined in original order, e.g. "a a* b".
    pub fn binding_sites_str(&self) -> String {
        self.binding_sites
            .iter()
            .map(BindingSite::to_token)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Binding sites as a sorted multiset of tokens, for order-insensitive matching.
    pub fn sorted_binding_site_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.binding_sites.iter().map(BindingSite::to_token).collect();
        tokens.sort();
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_vector_sums_star_and_unstar() {
        let mut index = BindingSiteIndex::new();
        index.get_or_insert("a");
        index.get_or_insert("b");

        let monomer = Monomer::new(
            vec![
                BindingSite::new("a", false),
                BindingSite::new("a", true),
                BindingSite::new("b", false),
            ],
            Some("monomer1".into()),
        );

        assert_eq!(monomer.to_vector(&index), vec![0, 1]);
    }

    #[test]
    fn binding_site_order_does_not_affect_sorted_tokens() {
        let m1 = Monomer::new(vec![BindingSite::new("a", false), BindingSite::new("b", true)], None);
        let m2 = Monomer::new(vec![BindingSite::new("b", true), BindingSite::new("a", false)], None);
        assert_eq!(m1.sorted_binding_site_tokens(), m2.sorted_binding_site_tokens());
    }
}
