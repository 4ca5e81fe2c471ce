use std::fs;
use std::path::Path;

use tbn_core::error::{Result, TbnError};
use tbn_core::units::{from_molar, to_molar, Unit};

use crate::algorithm::IBOTAlgorithm;

fn monomer_spec(tbn: &tbn_core::tbn::Tbn, monomer_idx: usize) -> String {
    let monomer = &tbn.monomers[monomer_idx];
    match &monomer.name {
        Some(name) => name.clone(),
        None => monomer.binding_sites_str(),
    }
}

fn polymer_representation(tbn: &tbn_core::tbn::Tbn, counts: &[i64]) -> String {
    let specs: Vec<String> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .map(|(idx, &count)| {
            let spec = monomer_spec(tbn, idx);
            if count > 1 {
                format!("{count} {spec}")
            } else {
                spec
            }
        })
        .collect();
    format!("{{{}}}", specs.join("; "))
}

fn format_single_polymer_lines(tbn: &tbn_core::tbn::Tbn, counts: &[i64]) -> Vec<String> {
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .map(|(idx, &count)| {
            let spec = monomer_spec(tbn, idx);
            if count == 1 {
                spec
            } else {
                format!("{count} | {spec}")
            }
        })
        .collect()
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| TbnError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

impl<'a> IBOTAlgorithm<'a> {
    /// Writes a `.tbnpolys`-style file: on-target polymers first (each
    /// tagged with its `mu`), then off-target polymers sorted by ascending
    /// `mu`. Unassigned off-target polymers (`mu == 0`) are omitted.
    pub fn generate_tbnpolys_output(&self, output_file: &Path) -> Result<()> {
        let mut on_target: Vec<(usize, f64)> = Vec::new();
        let mut off_target: Vec<(usize, f64)> = Vec::new();

        for (i, _) in self.polymers.iter().enumerate() {
            if !self.on_target_indices.contains(&i) && self.mu[i] == 0.0 {
                continue;
            }
            if self.on_target_indices.contains(&i) {
                on_target.push((i, self.mu[i]));
            } else {
                off_target.push((i, self.mu[i]));
            }
        }
        off_target.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let mut lines = Vec::new();
        lines.push("# IBOT Results - Concentration Exponents".to_string());
        lines.push(format!("# Total polymers: {}", self.polymers.len()));
        lines.push(format!("# On-target polymers: {}", on_target.len()));
        lines.push(format!("# Off-target polymers: {}", off_target.len()));
        lines.push(String::new());

        lines.push("# === ON-TARGET POLYMERS ===".to_string());
        lines.push(String::new());
        for &(idx, mu_val) in &on_target {
            lines.extend(format_single_polymer_lines(self.tbn, &self.polymers[idx]));
            lines.push(format!("# mu: {mu_val:.6}"));
            lines.push(String::new());
        }

        if !off_target.is_empty() {
            lines.push("# === OFF-TARGET POLYMERS ===".to_string());
            lines.push("# (sorted by concentration exponent)".to_string());
            lines.push(String::new());
            for &(idx, mu_val) in &off_target {
                lines.extend(format_single_polymer_lines(self.tbn, &self.polymers[idx]));
                lines.push(format!("# mu: {mu_val:.6}"));
                lines.push(String::new());
            }
        }

        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }

        write_file(output_file, &lines.join("\n"))
    }

    /// Writes a text report of the irreducible canonical reactions grouped
    /// by the IBOT iteration in which they belonged to the active set,
    /// marking polymers newly assigned `mu` in that iteration with `^`.
    pub fn generate_reactions_output(&self, output_file: &Path) -> Result<()> {
        let total_reactions: usize = self.iteration_info.iter().map(|it| it.reactions.len()).sum();

        let mut lines = Vec::new();
        lines.push("# Irreducible Canonical Reactions from IBOT Algorithm".to_string());
        lines.push(format!("# Total reactions: {total_reactions}"));
        lines.push(format!("# Total iterations: {}", self.iteration_info.len()));
        lines.push("#".to_string());
        lines.push("# Notation:".to_string());
        lines.push("#   - Polymers are shown in brackets: {monomer1; monomer2; ...}".to_string());
        lines.push("#   - Monomer multiplicities shown as prefix: {2 monomer1; monomer2}".to_string());
        lines.push("#   - Polymers marked with ^ were assigned mu in that iteration".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());

        for iter_info in &self.iteration_info {
            lines.push(format!("## Iteration {}", iter_info.iteration));
            lines.push(format!("## mu_min = {:.6}", iter_info.mu_min));
            lines.push(format!("## Number of reactions in R: {}", iter_info.reactions.len()));
            lines.push(format!(
                "## Polymers assigned mu in this iteration: {}",
                iter_info.assigned_polymers.len()
            ));
            lines.push(String::new());

            for reaction in &iter_info.reactions {
                let (reactants, products) = reaction.get_reactants_and_products();
                let format_side = |side: &[(usize, i64)]| -> String {
                    if side.is_empty() {
                        return "0".to_string();
                    }
                    side.iter()
                        .map(|&(idx, mult)| {
                            let mut rep = polymer_representation(self.tbn, &self.polymers[idx]);
                            if iter_info.assigned_polymers.contains(&idx) {
                                rep.push('^');
                            }
                            if mult == 1 {
                                rep
                            } else {
                                format!("{mult} {rep}")
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" + ")
                };
                lines.push(format!("{} -> {}", format_side(&reactants), format_side(&products)));
            }

            lines.push(String::new());
            lines.push("-".repeat(40));
            lines.push(String::new());
        }

        while lines.last().is_some_and(|l| l.is_empty() || l == &"-".repeat(40)) {
            lines.pop();
        }

        write_file(output_file, &lines.join("\n"))
    }

    /// Writes a `.tbn` file whose monomer concentrations are derived from
    /// the assigned `mu` exponents: each polymer `p` with `mu(p) > 0 ` (or
    /// any on-target polymer) contributes
    /// `((c'/rho_H2O)^mu(p)) * rho_H2O` to every monomer it contains, where
    /// `c'` is the base concentration `c` converted to Molar and
    /// `rho_H2O = 55.14` M is water's density at 37C.
    pub fn generate_tbn_output(&self, output_file: &Path, c: f64, units: Unit) -> Result<()> {
        const RHO_H2O: f64 = 55.14;
        let c_molar = to_molar(c, units);

        let mut monomer_concentrations_molar = vec![0.0f64; self.tbn.monomers.len()];
        for (p_idx, polymer) in self.polymers.iter().enumerate() {
            if !self.on_target_indices.contains(&p_idx) && self.mu[p_idx] == 0.0 {
                continue;
            }
            let mu_p = self.mu[p_idx];
            let concentration_factor = (c_molar / RHO_H2O).powf(mu_p) * RHO_H2O;
            for (m_idx, &count) in polymer.iter().enumerate() {
                if count > 0 {
                    monomer_concentrations_molar[m_idx] += count as f64 * concentration_factor;
                }
            }
        }

        let monomer_concentrations: Vec<f64> =
            monomer_concentrations_molar.into_iter().map(|v| from_molar(v, units)).collect();

        write_file(output_file, &tbn_io::format_tbn(self.tbn, &monomer_concentrations, units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::IBOTAlgorithm;
    use std::collections::BTreeSet;
    use tbn_core::index::BindingSiteIndex;
    use tbn_core::monomer::Monomer;
    use tbn_core::site::BindingSite;

    fn dummy_tbn() -> tbn_core::tbn::Tbn {
        let mut idx = BindingSiteIndex::new();
        idx.get_or_insert("a");
        let m = Monomer::new(vec![BindingSite::new("a", false)], Some("m1".into()));
        tbn_core::tbn::Tbn::build(vec![m], idx, None).unwrap()
    }

    #[test]
    fn tbnpolys_output_writes_file_with_on_target_section() {
        let tbn = dummy_tbn();
        let polymers = vec![vec![1]];
        let algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), vec![]);
        let dir = tempfile_dir();
        let path = dir.join("out.tbnpolys");
        algo.generate_tbnpolys_output(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ON-TARGET POLYMERS"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn tbn_output_applies_mole_fraction_formula() {
        let tbn = dummy_tbn();
        let polymers = vec![vec![1]];
        let algo = IBOTAlgorithm::new(&tbn, polymers, BTreeSet::from([0]), vec![]);
        let dir = tempfile_dir();
        let path = dir.join("out.tbn");
        algo.generate_tbn_output(&path, 100.0, Unit::NanoMolar).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("\\UNITS: nM"));
        std::fs::remove_dir_all(dir).ok();
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("tbn-ibot-test-{:p}", &0u8 as *const u8));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
