use std::collections::HashMap;

use tbn_core::tbn::Tbn;
use tbn_core::units::Unit;
use tbn_io::tbnpolymat;

use crate::error::{FilterError, Result};

/// One matching polymer, carrying whatever optional columns the underlying
/// `.tbnpolymat` file had.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPolymer {
    pub index: usize,
    pub counts: Vec<i64>,
    pub free_energy: Option<f64>,
    pub concentration: Option<f64>,
}

/// A single `CONTAINS`/`EXACTLY` constraint line. Monomer names may repeat
/// to request multiplicity.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Contains(Vec<String>),
    Exactly(Vec<String>),
}

impl Constraint {
    /// Parses one nonempty, non-comment constraints-file line.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Constraint> {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().ok_or_else(|| FilterError::Constraint {
            line: line_no,
            message: "empty constraint line".to_string(),
        })?;
        let names: Vec<String> = parts.map(str::to_string).collect();
        if names.is_empty() {
            return Err(FilterError::Constraint {
                line: line_no,
                message: "constraint line names at least one monomer".to_string(),
            });
        }
        match keyword.to_ascii_uppercase().as_str() {
            "CONTAINS" => Ok(Constraint::Contains(names)),
            "EXACTLY" => Ok(Constraint::Exactly(names)),
            other => Err(FilterError::Constraint {
                line: line_no,
                message: format!("unknown constraint keyword '{other}', expected CONTAINS or EXACTLY"),
            }),
        }
    }
}

/// Parses a constraints file's body into its OR-ed constraint list,
/// skipping blank lines and `#`-prefixed comments.
pub fn parse_constraints_file(content: &str) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();
    for (i, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        constraints.push(Constraint::parse_line(line, i + 1)?);
    }
    Ok(constraints)
}

fn required_counts(names: &[String]) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for name in names {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
    counts
}

/// Queries a polymer basis (as loaded from a `.tbnpolymat` file) by monomer
/// composition. Requires the backing `.tbn` file to declare `\UNITS` and
/// per-monomer concentrations, since percent-of-total filtering and
/// concentration-sorted output both depend on it.
#[derive(Debug)]
pub struct PolymerFilter {
    tbn: Tbn,
    units: Unit,
    polymers: Vec<Vec<i64>>,
    free_energies: Option<Vec<f64>>,
    concentrations: Option<Vec<f64>>,
}

impl PolymerFilter {
    pub fn load(tbn: Tbn, polymat_content: &str, polymat_path: &str) -> Result<Self> {
        let units = tbn
            .concentration_units
            .ok_or_else(|| FilterError::MissingUnits { path: polymat_path.to_string() })?;

        let (header, rows) = tbnpolymat::parse(polymat_content, polymat_path)?;
        if header.n_monomers != tbn.monomers.len() {
            return Err(FilterError::Tbn(tbn_core::error::TbnError::Semantics(format!(
                "{polymat_path}: polymer matrix has {} monomer columns but the TBN file has {}",
                header.n_monomers,
                tbn.monomers.len()
            ))));
        }

        let mut polymers = Vec::with_capacity(rows.len());
        let mut free_energies = Vec::with_capacity(rows.len());
        let mut concentrations = Vec::with_capacity(rows.len());
        for row in rows {
            polymers.push(row.counts);
            if let Some(fe) = row.free_energy {
                free_energies.push(fe);
            }
            if let Some(c) = row.concentration {
                concentrations.push(c);
            }
        }

        Ok(Self {
            tbn,
            units,
            free_energies: (!free_energies.is_empty()).then_some(free_energies),
            concentrations: (!concentrations.is_empty()).then_some(concentrations),
            polymers,
        })
    }

    pub fn units(&self) -> Unit {
        self.units
    }

    fn identifier(&self, monomer_idx: usize) -> String {
        let monomer = &self.tbn.monomers[monomer_idx];
        monomer.name.clone().unwrap_or_else(|| monomer.binding_sites_str())
    }

    fn identifier_to_indices(&self) -> HashMap<String, Vec<usize>> {
        let mut map: HashMap<String, Vec<usize>> = HashMap::new();
        for i in 0..self.tbn.monomers.len() {
            map.entry(self.identifier(i)).or_default().push(i);
        }
        map
    }

    /// Sums, per identifier, the monomer counts present in `counts`.
    fn identifier_counts(&self, counts: &[i64]) -> HashMap<String, i64> {
        let mut totals: HashMap<String, i64> = HashMap::new();
        for (idx, &count) in counts.iter().enumerate() {
            if count > 0 {
                *totals.entry(self.identifier(idx)).or_insert(0) += count;
            }
        }
        totals
    }

    fn row(&self, i: usize) -> FilteredPolymer {
        FilteredPolymer {
            index: i,
            counts: self.polymers[i].clone(),
            free_energy: self.free_energies.as_ref().map(|v| v[i]),
            concentration: self.concentrations.as_ref().map(|v| v[i]),
        }
    }

    fn total_concentration(&self) -> Option<f64> {
        self.concentrations.as_ref().map(|v| v.iter().sum())
    }

    fn sort_and_truncate(&self, mut matches: Vec<FilteredPolymer>, max_count: Option<usize>) -> Vec<FilteredPolymer> {
        if self.concentrations.is_some() {
            matches.sort_by(|a, b| {
                let ca = a.concentration.unwrap_or(0.0);
                let cb = b.concentration.unwrap_or(0.0);
                cb.partial_cmp(&ca).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if let Some(max_count) = max_count {
            matches.truncate(max_count);
        }
        matches
    }

    /// Retains polymers with at least the requested multiplicity of each
    /// named monomer. An empty `monomer_names` matches every polymer.
    /// `percent_limit` (0-100) drops polymers whose share of total
    /// concentration falls below the threshold.
    pub fn filter_by_monomers(
        &self,
        monomer_names: &[String],
        percent_limit: Option<f64>,
        max_count: Option<usize>,
    ) -> Vec<FilteredPolymer> {
        let required = required_counts(monomer_names);
        if !required.is_empty() {
            let identifier_to_indices = self.identifier_to_indices();
            for name in required.keys() {
                if !identifier_to_indices.contains_key(name) {
                    return Vec::new();
                }
            }
        }

        let total_concentration = self.total_concentration();

        let mut matches = Vec::new();
        for (i, counts) in self.polymers.iter().enumerate() {
            if !required.is_empty() {
                let present = self.identifier_counts(counts);
                let satisfies = required.iter().all(|(name, &need)| present.get(name).copied().unwrap_or(0) >= need);
                if !satisfies {
                    continue;
                }
            }

            let concentration = self.concentrations.as_ref().map(|v| v[i]);
            if let (Some(limit), Some(conc), Some(total)) = (percent_limit, concentration, total_concentration) {
                if total > 0.0 && (conc / total) * 100.0 < limit {
                    continue;
                }
            }

            matches.push(self.row(i));
        }

        self.sort_and_truncate(matches, max_count)
    }

    /// Retains polymers satisfying at least one OR-ed `CONTAINS`/`EXACTLY`
    /// constraint. `CONTAINS` is the same subset test as
    /// [`Self::filter_by_monomers`]; `EXACTLY` additionally requires the
    /// polymer's entire nonzero composition to equal the constraint's
    /// multiset.
    pub fn filter_by_constraints(&self, constraints: &[Constraint], max_count: Option<usize>) -> Vec<FilteredPolymer> {
        let mut matches = Vec::new();
        for (i, counts) in self.polymers.iter().enumerate() {
            let present = self.identifier_counts(counts);
            let satisfies = constraints.iter().any(|c| match c {
                Constraint::Contains(names) => {
                    let required = required_counts(names);
                    required.iter().all(|(name, &need)| present.get(name).copied().unwrap_or(0) >= need)
                }
                Constraint::Exactly(names) => {
                    let required = required_counts(names);
                    required == present
                }
            });
            if satisfies {
                matches.push(self.row(i));
            }
        }
        self.sort_and_truncate(matches, max_count)
    }

    /// Formats `value` without scientific notation where the magnitude
    /// permits, bucketed analogously to [`tbn_io::tbnpolys::format_concentration`]
    /// but tuned for human-facing filter output.
    pub fn format_concentration_nicely(value: f64, units: Unit) -> String {
        let unit_str = units.token();
        if value == 0.0 {
            return format!("0.00 {unit_str}");
        }
        let sign = if value < 0.0 { "-" } else { "" };
        let abs_value = value.abs();
        let body = if abs_value < 0.001 {
            format!("{abs_value:.2e}")
        } else if abs_value < 0.01 {
            format!("{abs_value:.4}")
        } else if abs_value < 0.1 {
            format!("{abs_value:.3}")
        } else if abs_value < 1000.0 {
            format!("{abs_value:.1}")
        } else if abs_value < 10000.0 {
            format!("{abs_value:.0}")
        } else {
            format!("{abs_value:.2e}")
        };
        format!("{sign}{body} {unit_str}")
    }

    /// Renders matched polymers as a `#`-commented human-readable report.
    pub fn format_output(&self, matches: &[FilteredPolymer], monomer_names: &[String], percent_limit: Option<f64>, max_count: Option<usize>) -> String {
        let mut lines = Vec::new();

        if monomer_names.is_empty() {
            lines.push("# All polymers".to_string());
        } else {
            lines.push(format!("# Filtered polymers containing: {}", monomer_names.join(" ")));
        }
        if let Some(limit) = percent_limit {
            lines.push(format!("# Percent limit: {limit}%"));
        }
        if let Some(max_count) = max_count {
            lines.push(format!("# Maximum count limit: {max_count}"));
        }
        lines.push(format!("# Number of matching polymers: {}", matches.len()));

        if let Some(total) = self.total_concentration() {
            let matching: f64 = matches.iter().filter_map(|m| m.concentration).sum();
            let percentage = if total > 0.0 { matching / total * 100.0 } else { 0.0 };
            lines.push(format!("# Total concentration fraction: {percentage:.2}%"));
            lines.push(format!("# Concentration units: {}", self.units.token()));
        }

        lines.push("#".to_string());

        for (display_idx, polymer) in matches.iter().enumerate() {
            lines.push(format!("# Polymer {}", display_idx + 1));
            for (monomer_idx, &count) in polymer.counts.iter().enumerate() {
                if count > 0 {
                    let label = self.identifier(monomer_idx);
                    lines.push(format!("{count} | {label}"));
                }
            }
            if let Some(conc) = polymer.concentration {
                lines.push(format!("Concentration: {}", Self::format_concentration_nicely(conc, self.units)));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;

    fn toy_tbn() -> Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        idx.get_or_insert("b");
        let mut m1 = Monomer::new(vec![BindingSite::new("a", false)], Some("m1".into()));
        m1.concentration = Some(10.0);
        let mut m2 = Monomer::new(vec![BindingSite::new("b", false)], Some("m2".into()));
        m2.concentration = Some(20.0);
        Tbn::build(vec![m1, m2], idx, Some(Unit::NanoMolar)).unwrap()
    }

    fn sample_polymat() -> String {
        "# TBN Polymer Matrix\n\
         # Number of polymers: 3\n\
         # Number of monomers: 2\n\
         # Columns: monomer_counts[1..2] concentration\n\
         #\n\
         1 0 1.0e-8\n\
         0 1 3.0e-8\n\
         1 1 2.0e-8\n"
            .to_string()
    }

    #[test]
    fn missing_units_is_rejected() {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        let m = Monomer::new(vec![BindingSite::new("a", false)], None);
        let tbn = Tbn::build(vec![m], idx, None).unwrap();
        let err = PolymerFilter::load(tbn, "# Number of monomers: 1\n", "x").unwrap_err();
        assert!(matches!(err, FilterError::MissingUnits { .. }));
    }

    #[test]
    fn filter_by_monomers_with_empty_names_returns_all_sorted_by_concentration() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let matches = filter.filter_by_monomers(&[], None, None);
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].index, 1);
        assert_eq!(matches[1].index, 2);
        assert_eq!(matches[2].index, 0);
    }

    #[test]
    fn filter_by_monomers_requires_subset_multiplicity() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let matches = filter.filter_by_monomers(&["m1".to_string()], None, None);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.counts[0] >= 1));
    }

    #[test]
    fn filter_by_monomers_unknown_name_returns_empty() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        assert!(filter.filter_by_monomers(&["nonexistent".to_string()], None, None).is_empty());
    }

    #[test]
    fn percent_limit_excludes_small_shares() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let matches = filter.filter_by_monomers(&[], Some(40.0), None);
        // Total = 6e-8; shares are ~16.7%, 50%, 33.3% -> only the 50% one survives a 40% cutoff.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 1);
    }

    #[test]
    fn max_count_truncates_after_sorting() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let matches = filter.filter_by_monomers(&[], None, Some(1));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 1);
    }

    #[test]
    fn exactly_constraint_requires_full_composition_match() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let constraints = vec![Constraint::Exactly(vec!["m1".to_string()])];
        let matches = filter.filter_by_constraints(&constraints, None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 0);
    }

    #[test]
    fn contains_and_exactly_constraints_are_or_ed() {
        let filter = PolymerFilter::load(toy_tbn(), &sample_polymat(), "x").unwrap();
        let constraints = vec![
            Constraint::Exactly(vec!["m1".to_string()]),
            Constraint::Contains(vec!["m2".to_string()]),
        ];
        let matches = filter.filter_by_constraints(&constraints, None);
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn parse_constraints_file_skips_blank_and_comment_lines() {
        let content = "# comment\n\nCONTAINS m1\nEXACTLY m1 m2\n";
        let constraints = parse_constraints_file(content).unwrap();
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0], Constraint::Contains(vec!["m1".to_string()]));
        assert_eq!(constraints[1], Constraint::Exactly(vec!["m1".to_string(), "m2".to_string()]));
    }

    #[test]
    fn unknown_constraint_keyword_is_rejected() {
        assert!(parse_constraints_file("MAYBE m1\n").is_err());
    }

    #[test]
    fn nicely_formatted_concentration_avoids_scientific_notation_in_normal_range() {
        assert_eq!(PolymerFilter::format_concentration_nicely(99.9, Unit::NanoMolar), "99.9 nM");
        assert_eq!(PolymerFilter::format_concentration_nicely(0.0, Unit::NanoMolar), "0.00 nM");
    }
}
