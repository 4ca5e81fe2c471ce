//! Parsing and emission of the `.tbn` text format: binding-site monomer lists
//! with an optional `\UNITS:` directive and `{{expr}}` concentration markers.

use std::collections::{HashMap, HashSet};

use tbn_core::error::{Result, TbnError};
use tbn_core::index::BindingSiteIndex;
use tbn_core::monomer::Monomer;
use tbn_core::site::BindingSite;
use tbn_core::tbn::Tbn;
use tbn_core::units::Unit;

use crate::expr;

const NAME_FORBIDDEN_CHARS: [char; 6] = ['>', ',', '*', '|', ':', '\\'];

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parses `.tbn` source text into a [`Tbn`]. `path` is used only for error
/// messages; `vars` supplies identifiers available to `{{expr}}` markers.
pub fn parse_str(content: &str, path: &str, vars: &HashMap<String, f64>) -> Result<Tbn> {
    let units = scan_units_directive(content, path)?;

    let mut binding_site_index = BindingSiteIndex::new();
    let mut monomer_names: HashSet<String> = HashSet::new();
    let mut monomers = Vec::new();

    for (line_no, raw_line) in content.lines().enumerate() {
        let line_number = line_no + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() || line.starts_with("\\UNITS:") {
            continue;
        }

        let parsed = parse_monomer_line(line, path, line_number, units.is_some(), vars)?;
        let Some((name, name_is_suffix, binding_sites, concentration)) = parsed else {
            continue;
        };

        match (units, concentration) {
            (Some(_), None) => {
                return Err(TbnError::syntax(
                    path,
                    line_number,
                    "\\UNITS specified but monomer lacks a concentration",
                ))
            }
            (None, Some(_)) => {
                return Err(TbnError::syntax(
                    path,
                    line_number,
                    "monomer has a concentration but no \\UNITS was specified",
                ))
            }
            _ => {}
        }

        if let Some(name) = &name {
            if name.starts_with('\\') || name == "UNITS" || name == "MATRIX-HASH" {
                return Err(TbnError::syntax(
                    path,
                    line_number,
                    format!("monomer name '{name}' is reserved"),
                ));
            }
            if binding_site_index.index_of(name).is_some() {
                return Err(TbnError::syntax(
                    path,
                    line_number,
                    format!("monomer name '{name}' conflicts with a binding-site name"),
                ));
            }
            monomer_names.insert(name.clone());
        }

        for site in &binding_sites {
            if monomer_names.contains(&site.name) {
                return Err(TbnError::syntax(
                    path,
                    line_number,
                    format!("binding site '{}' conflicts with a monomer name", site.name),
                ));
            }
            binding_site_index.get_or_insert(&site.name);
        }

        let mut monomer = Monomer::new(binding_sites, name);
        monomer.name_is_suffix = name_is_suffix;
        monomer.concentration = concentration;
        monomer.original_line = raw_line.to_string();
        monomers.push(monomer);
    }

    if monomers.is_empty() {
        return Err(TbnError::syntax(path, 0, "no valid monomers found in file"));
    }

    let monomers = if units.is_some() {
        aggregate_identical_monomers(monomers, &binding_site_index, path)?
    } else {
        monomers
    };

    Tbn::build(monomers, binding_site_index, units)
}

fn scan_units_directive(content: &str, path: &str) -> Result<Option<Unit>> {
    let mut units = None;
    for (line_no, raw_line) in content.lines().enumerate() {
        let line_number = line_no + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("\\UNITS:") {
            if units.is_some() {
                return Err(TbnError::syntax(path, line_number, "multiple \\UNITS specifications found"));
            }
            units = Some(Unit::parse(rest.trim()).map_err(|_| {
                TbnError::syntax(path, line_number, format!("invalid units '{}'", rest.trim()))
            })?);
            continue;
        }
        break;
    }
    Ok(units)
}

fn validate_name(name: &str, path: &str, line_number: usize) -> Result<()> {
    if name.chars().any(|c| NAME_FORBIDDEN_CHARS.contains(&c)) {
        return Err(TbnError::syntax(
            path,
            line_number,
            format!("invalid monomer name '{name}' - cannot contain > , * | : \\"),
        ));
    }
    if name.contains(' ') {
        return Err(TbnError::syntax(
            path,
            line_number,
            format!("invalid monomer name '{name}' - cannot contain spaces"),
        ));
    }
    Ok(())
}

#[allow(clippy::type_complexity)]
fn parse_monomer_line(
    line: &str,
    path: &str,
    line_number: usize,
    has_units: bool,
    vars: &HashMap<String, f64>,
) -> Result<Option<(Option<String>, bool, Vec<BindingSite>, Option<f64>)>> {
    let mut name_prefix = None;
    let mut remaining = line;

    if let Some(idx) = line.find(':') {
        let prefix = line[..idx].trim();
        name_prefix = Some(prefix.to_string());
        remaining = line[idx + 1..].trim();
        validate_name(prefix, path, line_number)?;
    }

    let mut name_suffix = None;
    let mut remaining = remaining.to_string();

    if let Some(idx) = remaining.find('>') {
        let before = remaining[..idx].trim().to_string();
        let after = remaining[idx + 1..].trim().to_string();

        let suffix = if let Some(comma_idx) = after.rfind(',') {
            let potential = after[comma_idx + 1..].trim();
            if potential.parse::<f64>().is_ok() || is_expr_marker(potential) {
                let name_part = after[..comma_idx].trim().to_string();
                remaining = format!("{before},{potential}");
                name_part
            } else {
                remaining = before;
                after.clone()
            }
        } else {
            remaining = before;
            after.clone()
        };

        if suffix.is_empty() {
            return Err(TbnError::syntax(path, line_number, "empty monomer name after '>'"));
        }
        validate_name(&suffix, path, line_number)?;
        name_suffix = Some(suffix);
    }

    let mut concentration = None;
    if let Some(idx) = remaining.rfind(',') {
        let head = remaining[..idx].trim().to_string();
        let tail = remaining[idx + 1..].trim().to_string();
        remaining = head;

        let value = if is_expr_marker(&tail) {
            let inner = &tail[2..tail.len() - 2];
            expr::evaluate(inner, vars).map_err(|e| TbnError::syntax(path, line_number, e.to_string()))?
        } else {
            tail.parse::<f64>()
                .map_err(|_| TbnError::syntax(path, line_number, format!("invalid concentration value '{tail}'")))?
        };

        if value < 0.0 && !has_units {
            return Err(TbnError::syntax(path, line_number, "negative concentration not allowed"));
        }
        concentration = Some(value);
    }

    if name_prefix.is_some() && name_suffix.is_some() {
        return Err(TbnError::syntax(
            path,
            line_number,
            "cannot use both 'name:' prefix and '>name' suffix on the same line",
        ));
    }

    let (name, name_is_suffix) = match (name_prefix, name_suffix) {
        (Some(n), None) => (Some(n), false),
        (None, Some(n)) => (Some(n), true),
        (None, None) => (None, false),
        _ => unreachable!(),
    };

    let site_strings: Vec<&str> = remaining.split_whitespace().collect();
    if site_strings.is_empty() {
        return Ok(None);
    }

    let mut binding_sites = Vec::with_capacity(site_strings.len());
    for site_str in site_strings {
        if site_str.chars().any(|c| [',', '|', ':'].contains(&c)) {
            return Err(TbnError::syntax(path, line_number, format!("invalid binding site '{site_str}'")));
        }
        if let Some(base) = site_str.strip_prefix('\\') {
            let _ = base;
            return Err(TbnError::syntax(
                path,
                line_number,
                format!("binding site '{site_str}' cannot start with backslash"),
            ));
        }
        let site = BindingSite::parse(site_str);
        if site.name.is_empty() {
            return Err(TbnError::syntax(path, line_number, format!("invalid binding site '{site_str}'")));
        }
        binding_sites.push(site);
    }

    Ok(Some((name, name_is_suffix, binding_sites, concentration)))
}

fn is_expr_marker(s: &str) -> bool {
    s.starts_with("{{") && s.ends_with("}}") && s.len() > 4
}

fn aggregate_identical_monomers(monomers: Vec<Monomer>, index: &BindingSiteIndex, path: &str) -> Result<Vec<Monomer>> {
    let mut groups: Vec<(Vec<i64>, Vec<Monomer>)> = Vec::new();
    for monomer in monomers {
        let vector = monomer.to_vector(index);
        if let Some(group) = groups.iter_mut().find(|(v, _)| *v == vector) {
            group.1.push(monomer);
        } else {
            groups.push((vector, vec![monomer]));
        }
    }

    let mut aggregated = Vec::with_capacity(groups.len());
    for (_, group) in groups {
        if group.len() == 1 {
            aggregated.push(group.into_iter().next().unwrap());
            continue;
        }

        let names: Vec<&str> = group.iter().filter_map(|m| m.name.as_deref()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        if unique.len() > 1 {
            return Err(TbnError::syntax(
                path,
                0,
                format!("duplicate monomers with different names: {}", unique.into_iter().collect::<Vec<_>>().join(", ")),
            ));
        }

        let total: f64 = group.iter().filter_map(|m| m.concentration).sum();
        if total < 0.0 {
            return Err(TbnError::syntax(path, 0, "aggregated concentration is negative"));
        }

        let mut representative = group.into_iter().next().unwrap();
        representative.concentration = Some(total);
        aggregated.push(representative);
    }

    Ok(aggregated)
}

/// Renders `tbn`'s monomers back into `.tbn` text, substituting
/// `concentrations` (already expressed in `units`) for the declared ones.
/// Used by IBOT's synthesized-concentration output.
pub fn format_tbn(tbn: &Tbn, concentrations: &[f64], units: Unit) -> String {
    let mut out = String::new();
    out.push_str(&format!("\\UNITS: {}\n\n", units.token()));

    for (monomer, &conc) in tbn.monomers.iter().zip(concentrations.iter()) {
        let sites = monomer.binding_sites_str();
        let line = match (&monomer.name, monomer.name_is_suffix) {
            (Some(name), false) => format!("{name}: {sites}, {conc:.6e}"),
            (Some(name), true) => format!("{sites} >{name}, {conc:.6e}"),
            (None, _) => format!("{sites}, {conc:.6e}"),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, f64> {
        HashMap::new()
    }

    #[test]
    fn parses_named_monomer_with_concentration() {
        let content = "\\UNITS: nM\nmonomer1: a a* b, 100\n";
        let tbn = parse_str(content, "test.tbn", &vars()).unwrap();
        assert_eq!(tbn.monomers.len(), 1);
        assert_eq!(tbn.monomers[0].name.as_deref(), Some("monomer1"));
        let conc = tbn.concentrations().unwrap()[0];
        assert!((conc - 1e-7).abs() < 1e-15);
    }

    #[test]
    fn star_limiting_violation_is_detectable_after_parse() {
        let content = "a* a*\nb\n";
        let tbn = parse_str(content, "test.tbn", &vars()).unwrap();
        let violations = tbn.check_star_limiting().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].0, 0);
        assert!((violations[0].1 - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn units_without_concentration_is_rejected() {
        let content = "\\UNITS: nM\na b\n";
        assert!(parse_str(content, "test.tbn", &vars()).is_err());
    }

    #[test]
    fn concentration_without_units_is_rejected() {
        let content = "a b, 5\n";
        assert!(parse_str(content, "test.tbn", &vars()).is_err());
    }

    #[test]
    fn aggregates_identical_monomers_by_summed_concentration() {
        let content = "\\UNITS: nM\na b, 100\na b, -30\na b, 50\n";
        let tbn = parse_str(content, "test.tbn", &vars()).unwrap();
        assert_eq!(tbn.monomers.len(), 1);
        let conc_nm = tbn.monomers[0].concentration.unwrap();
        assert!((conc_nm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_rejects_negative_total() {
        let content = "\\UNITS: nM\na b, 50\na b, -100\n";
        assert!(parse_str(content, "test.tbn", &vars()).is_err());
    }

    #[test]
    fn expr_marker_is_evaluated_with_supplied_variables() {
        let content = "\\UNITS: nM\na b, {{2 * X}}\n";
        let mut v = HashMap::new();
        v.insert("X".to_string(), 50.0);
        let tbn = parse_str(content, "test.tbn", &v).unwrap();
        let conc_nm = tbn.monomers[0].concentration.unwrap();
        assert!((conc_nm - 100.0).abs() < 1e-9);
    }

    #[test]
    fn both_naming_forms_on_one_line_is_rejected() {
        let content = "\\UNITS: nM\nfoo: a b >bar, 10\n";
        assert!(parse_str(content, "test.tbn", &vars()).is_err());
    }
}
