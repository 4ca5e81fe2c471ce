//! Parsing and emission of the `.tbnpolys` format: human-readable polymer
//! lists, one monomer per line, blank-line separated, with an optional
//! `n | ` multiplicity prefix.

use tbn_core::error::{Result, TbnError};
use tbn_core::polymer::Polymer;
use tbn_core::tbn::Tbn;
use tbn_core::units::Unit;

/// One raw monomer reference within a `.tbnpolys` polymer block, before
/// resolution against a [`Tbn`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawMonomerRef {
    pub multiplicity: u32,
    pub spec: String,
}

/// Splits `.tbnpolys` content into polymers, each a list of raw monomer
/// references, without resolving them against any [`Tbn`].
pub fn parse_content(content: &str) -> Vec<Vec<RawMonomerRef>> {
    let mut polymers = Vec::new();
    let mut current: Vec<RawMonomerRef> = Vec::new();

    for raw_line in content.lines() {
        let is_comment_only = raw_line.trim_start().starts_with('#');
        let line = if is_comment_only {
            raw_line.trim().to_string()
        } else {
            match raw_line.find('#') {
                Some(idx) => raw_line[..idx].trim().to_string(),
                None => raw_line.trim().to_string(),
            }
        };

        if line.is_empty() && !is_comment_only {
            if !current.is_empty() {
                polymers.push(std::mem::take(&mut current));
            }
            continue;
        }
        if is_comment_only || line.is_empty() {
            continue;
        }

        current.push(parse_monomer_line(&line));
    }

    if !current.is_empty() {
        polymers.push(current);
    }

    polymers
}

fn parse_monomer_line(line: &str) -> RawMonomerRef {
    if let Some(bar_idx) = line.find('|') {
        let prefix = line[..bar_idx].trim();
        if let Ok(multiplicity) = prefix.parse::<u32>() {
            return RawMonomerRef {
                multiplicity,
                spec: line[bar_idx + 1..].trim().to_string(),
            };
        }
    }
    RawMonomerRef {
        multiplicity: 1,
        spec: line.to_string(),
    }
}

/// Resolves a raw monomer spec (`name`, `name: sites`, or bare binding-site
/// tokens) to an index into `tbn.monomers`.
pub fn resolve_monomer(spec: &str, tbn: &Tbn, path: &str) -> Result<usize> {
    if let Some(idx) = spec.find(':') {
        let name = spec[..idx].trim();
        let sites_str = spec[idx + 1..].trim();
        let (pos, monomer) = tbn
            .monomers
            .iter()
            .enumerate()
            .find(|(_, m)| m.name.as_deref() == Some(name))
            .ok_or_else(|| TbnError::ReferenceMiss(format!("monomer with name '{name}' not found in TBN file")))?;

        let mut provided: Vec<&str> = sites_str.split_whitespace().collect();
        provided.sort_unstable();
        let mut expected = monomer.sorted_binding_site_tokens();
        expected.sort();
        if provided != expected.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(TbnError::syntax(
                path,
                0,
                format!("monomer '{name}' exists but its binding sites don't match"),
            ));
        }
        return Ok(pos);
    }

    if let Some((pos, _)) = tbn.monomers.iter().enumerate().find(|(_, m)| m.name.as_deref() == Some(spec)) {
        return Ok(pos);
    }

    let mut query: Vec<&str> = spec.split_whitespace().collect();
    query.sort_unstable();
    for (pos, monomer) in tbn.monomers.iter().enumerate() {
        let tokens = monomer.sorted_binding_site_tokens();
        if query == tokens.iter().map(String::as_str).collect::<Vec<_>>() {
            return Ok(pos);
        }
    }

    Err(TbnError::ReferenceMiss(format!("cannot resolve monomer: {spec}")))
}

/// Parses `.tbnpolys` content into [`Polymer`] vectors over `tbn`'s monomer
/// ordering.
pub fn parse_polymers(content: &str, tbn: &Tbn, path: &str) -> Result<Vec<Polymer>> {
    let blocks = parse_content(content);
    let n = tbn.monomers.len();
    let mut polymers = Vec::with_capacity(blocks.len());

    for block in blocks {
        let mut counts = vec![0i64; n];
        for monomer_ref in block {
            let idx = resolve_monomer(&monomer_ref.spec, tbn, path)?;
            counts[idx] += monomer_ref.multiplicity as i64;
        }
        polymers.push(Polymer::new(counts));
    }

    Ok(polymers)
}

fn monomer_spec(tbn: &Tbn, monomer_idx: usize) -> String {
    let monomer = &tbn.monomers[monomer_idx];
    match &monomer.name {
        Some(name) => name.clone(),
        None => monomer.binding_sites_str(),
    }
}

fn format_single_polymer(tbn: &Tbn, polymer: &Polymer) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, count) in polymer.present_monomers() {
        let spec = monomer_spec(tbn, idx);
        if count == 1 {
            lines.push(spec);
        } else {
            lines.push(format!("{count} | {spec}"));
        }
    }
    lines
}

/// Formats concentration the way the original writer does: increasingly
/// many decimal places as the magnitude shrinks, scientific notation at the
/// extremes.
pub fn format_concentration(concentration: f64, units: Option<Unit>) -> String {
    let mut s = if concentration == 0.0 {
        "0".to_string()
    } else if concentration >= 1000.0 {
        format!("{concentration:.1e}")
    } else if concentration >= 100.0 {
        format!("{concentration:.1}")
    } else if concentration >= 10.0 {
        format!("{concentration:.2}")
    } else if concentration >= 1.0 {
        format!("{concentration:.3}")
    } else if concentration >= 0.01 {
        format!("{concentration:.4}")
    } else {
        format!("{concentration:.2e}")
    };
    if let Some(units) = units {
        s.push(' ');
        s.push_str(units.token());
    }
    s
}

/// Renders `polymers` (with optional per-polymer concentrations and a
/// header comment) as `.tbnpolys` text.
pub fn format_polymers(
    tbn: &Tbn,
    polymers: &[Polymer],
    concentrations: Option<&[f64]>,
    units: Option<Unit>,
    header_comment: Option<&str>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(comment) = header_comment {
        for line in comment.lines() {
            lines.push(format!("# {line}"));
        }
        lines.push(String::new());
    }

    for (i, polymer) in polymers.iter().enumerate() {
        let mut polymer_lines = format_single_polymer(tbn, polymer);
        if let Some(concs) = concentrations {
            if i < concs.len() {
                lines_push_concentration(&mut polymer_lines, concs[i], units);
            }
        }
        lines.extend(polymer_lines);
        lines.push(String::new());
    }

    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines.join("\n")
}

fn lines_push_concentration(lines: &mut Vec<String>, concentration: f64, units: Option<Unit>) {
    lines.push(format!("# Concentration: {}", format_concentration(concentration, units)));
}
