//! Parsing and emission of the `.tbnpolymat` polymer-matrix cache format.
//!
//! Header lines begin with `#` (free-form metadata) or `\` (the single
//! required `\MATRIX-HASH:` keyword record). The first line matching
//! neither prefix ends the header and begins the data section: one line
//! per polymer, `n` whitespace-separated integer monomer counts optionally
//! followed by a free-energy float and a `%.2e`-formatted concentration.

use tbn_core::error::{Result, TbnError};
use tbn_core::units::Unit;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolymatHeader {
    pub n_monomers: usize,
    pub n_polymers: usize,
    pub matrix_hash: Option<String>,
    pub concentration_units: Option<Unit>,
    pub has_free_energies: bool,
    pub has_concentrations: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolymatRow {
    pub counts: Vec<i64>,
    pub free_energy: Option<f64>,
    pub concentration: Option<f64>,
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('\\')
}

pub fn parse_header(content: &str, path: &str) -> Result<PolymatHeader> {
    let mut header = PolymatHeader::default();
    let mut n_monomers_found = false;

    for line in content.lines() {
        if !is_header_line(line) {
            break;
        }
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("\\MATRIX-HASH:") {
            header.matrix_hash = Some(rest.trim().to_string());
        } else if let Some(idx) = line.find("Number of monomers:") {
            let value = line[idx + "Number of monomers:".len()..].trim();
            header.n_monomers = value
                .parse()
                .map_err(|_| TbnError::syntax(path, 0, format!("invalid monomer count '{value}'")))?;
            n_monomers_found = true;
        } else if let Some(idx) = line.find("Number of polymers:") {
            let value = line[idx + "Number of polymers:".len()..].trim();
            header.n_polymers = value
                .parse()
                .map_err(|_| TbnError::syntax(path, 0, format!("invalid polymer count '{value}'")))?;
        } else if let Some(idx) = line.find("Concentration units:") {
            let value = line[idx + "Concentration units:".len()..].trim();
            header.concentration_units = Some(Unit::parse(value)?);
        } else if let Some(idx) = line.find("Columns:") {
            let value = line[idx + "Columns:".len()..].trim();
            header.has_free_energies = value.contains("free_energy");
            header.has_concentrations = value.contains("concentration");
        }
    }

    if !n_monomers_found {
        return Err(TbnError::syntax(path, 0, "missing 'Number of monomers' header"));
    }

    Ok(header)
}

fn parse_data_line(line: &str, header: &PolymatHeader, path: &str) -> Result<Option<PolymatRow>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(None);
    }
    if parts.len() < header.n_monomers {
        return Ok(None);
    }

    let mut counts = Vec::with_capacity(header.n_monomers);
    for token in &parts[..header.n_monomers] {
        let v: i64 = token
            .parse()
            .map_err(|_| TbnError::syntax(path, 0, format!("invalid monomer count '{token}'")))?;
        counts.push(v);
    }

    let mut col = header.n_monomers;
    let mut free_energy = None;
    if header.has_free_energies {
        if let Some(token) = parts.get(col) {
            free_energy = token.parse::<f64>().ok();
        }
        col += 1;
    }

    let mut concentration = None;
    if header.has_concentrations {
        if let Some(token) = parts.get(col) {
            concentration = token.parse::<f64>().ok();
        }
    }

    Ok(Some(PolymatRow { counts, free_energy, concentration }))
}

/// Parses the header and every data row, eagerly.
pub fn parse(content: &str, path: &str) -> Result<(PolymatHeader, Vec<PolymatRow>)> {
    let header = parse_header(content, path)?;
    let mut rows = Vec::new();
    for line in content.lines() {
        if is_header_line(line) || line.trim().is_empty() {
            continue;
        }
        if let Some(row) = parse_data_line(line, &header, path)? {
            rows.push(row);
        }
    }
    Ok((header, rows))
}

/// Parses the header, then returns a lazy row iterator over `content` —
/// a single-pass reader for polymer bases too large to hold comfortably
/// as a `Vec`.
pub fn iter_rows<'a>(
    content: &'a str,
    path: &'a str,
) -> Result<(PolymatHeader, impl Iterator<Item = Result<PolymatRow>> + 'a)> {
    let header = parse_header(content, path)?;
    let header_for_iter = header.clone();
    let iter = content.lines().filter_map(move |line| {
        if is_header_line(line) || line.trim().is_empty() {
            return None;
        }
        parse_data_line(line, &header_for_iter, path).transpose()
    });
    Ok((header, iter))
}

/// Renders a header plus rows as `.tbnpolymat` text.
pub fn format_polymat(header: &PolymatHeader, rows: &[PolymatRow]) -> String {
    let mut out = String::new();
    out.push_str("# TBN Polymer Matrix\n");
    out.push_str(&format!("# Number of polymers: {}\n", header.n_polymers));
    out.push_str(&format!("# Number of monomers: {}\n", header.n_monomers));
    if let Some(hash) = &header.matrix_hash {
        out.push_str(&format!("\\MATRIX-HASH: {hash}\n"));
    }
    if let Some(units) = header.concentration_units {
        out.push_str(&format!("# Concentration units: {}\n", units.token()));
    }
    let mut columns = vec![format!("monomer_counts[1..{}]", header.n_monomers)];
    if header.has_free_energies {
        columns.push("free_energy".to_string());
    }
    if header.has_concentrations {
        columns.push("concentration".to_string());
    }
    out.push_str(&format!("# Columns: {}\n", columns.join(" ")));
    out.push_str("#\n");

    for row in rows {
        let mut fields: Vec<String> = row.counts.iter().map(|c| c.to_string()).collect();
        if header.has_free_energies {
            if let Some(fe) = row.free_energy {
                fields.push(format!("{fe}"));
            }
        }
        if header.has_concentrations {
            if let Some(conc) = row.concentration {
                fields.push(if conc == 0.0 { "0.00e0".to_string() } else { format!("{conc:.2e}") });
            }
        }
        out.push_str(&fields.join(" "));
        out.push('\n');
    }

    out
}

/// Tests whether `content`'s header carries `expected_hash` (hex, 64 chars).
pub fn matches_hash(content: &str, expected_hash: &str, path: &str) -> bool {
    match parse_header(content, path) {
        Ok(header) => header.matrix_hash.as_deref() == Some(expected_hash),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        "# TBN Polymer Matrix\n\
         # Number of polymers: 2\n\
         # Number of monomers: 3\n\
         \\MATRIX-HASH: abc123\n\
         # Concentration units: nM\n\
         # Columns: monomer_counts[1..3] free_energy concentration\n\
         #\n\
         1 0 2 -3.5 1.23e-7\n\
         0 1 1 -1.0 4.56e-8\n"
            .to_string()
    }

    #[test]
    fn parses_header_fields() {
        let header = parse_header(&sample(), "x").unwrap();
        assert_eq!(header.n_monomers, 3);
        assert_eq!(header.n_polymers, 2);
        assert_eq!(header.matrix_hash.as_deref(), Some("abc123"));
        assert!(header.has_free_energies);
        assert!(header.has_concentrations);
        assert_eq!(header.concentration_units, Some(Unit::NanoMolar));
    }

    #[test]
    fn parses_all_data_rows() {
        let (header, rows) = parse(&sample(), "x").unwrap();
        assert_eq!(rows.len(), header.n_polymers);
        assert_eq!(rows[0].counts, vec![1, 0, 2]);
        assert_eq!(rows[0].free_energy, Some(-3.5));
        assert!((rows[1].concentration.unwrap() - 4.56e-8).abs() < 1e-12);
    }

    #[test]
    fn round_trips_through_format_and_parse() {
        let (header, rows) = parse(&sample(), "x").unwrap();
        let rendered = format_polymat(&header, &rows);
        let (header2, rows2) = parse(&rendered, "x").unwrap();
        assert_eq!(header.matrix_hash, header2.matrix_hash);
        assert_eq!(rows.len(), rows2.len());
    }

    #[test]
    fn hash_mismatch_is_detected() {
        assert!(!matches_hash(&sample(), "different", "x"));
        assert!(matches_hash(&sample(), "abc123", "x"));
    }

    #[test]
    fn lazy_iterator_yields_same_rows_as_eager_parse() {
        let content = sample();
        let (header, eager_rows) = parse(&content, "x").unwrap();
        let (_, lazy_iter) = iter_rows(&content, "x").unwrap();
        let lazy_rows: Vec<PolymatRow> = lazy_iter.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(eager_rows, lazy_rows);
        let _ = header;
    }
}
