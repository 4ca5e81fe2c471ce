//! NUPACK `concentrations` adapter: writes a tab-delimited `.ocx` complex
//! list and a `.con` monomer-concentration file, invokes `concentrations`
//! with the working directory scoped to a temp dir, and parses the
//! trailing column of the resulting `.eq` file.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

use crate::error::{EquilibriumError, Result};
use crate::{EquilibriumSolver, PolymerInput};

pub struct NupackSolver {
    pub executable: PathBuf,
}

impl NupackSolver {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    fn write_ocx_file(path: &std::path::Path, polymers: &[PolymerInput]) -> Result<()> {
        let mut contents = String::new();
        for (i, p) in polymers.iter().enumerate() {
            let counts = p
                .monomer_counts
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join("\t");
            contents.push_str(&format!("{}\t1\t{}\t{:.10}\n", i + 1, counts, p.free_energy));
        }
        fs::write(path, contents).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn write_con_file(path: &std::path::Path, monomer_concentrations_molar: &[f64]) -> Result<()> {
        let mut contents = String::new();
        for c in monomer_concentrations_molar {
            contents.push_str(&format!("{:.10}\n", c));
        }
        fs::write(path, contents).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Parses a `.eq` file's trailing concentration column, skipping
    /// `%`/`#`-prefixed header lines.
    fn parse_eq_file(path: &std::path::Path, expected: usize) -> Result<Vec<f64>> {
        let contents = fs::read_to_string(path).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut values = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') || line.starts_with('#') {
                continue;
            }
            let last = line
                .split_whitespace()
                .last()
                .ok_or_else(|| EquilibriumError::ParseFailure(format!("empty data line: {line}")))?;
            let value: f64 = last
                .parse()
                .map_err(|_| EquilibriumError::ParseFailure(format!("not a float: {last}")))?;
            values.push(value);
        }
        if values.len() != expected {
            return Err(EquilibriumError::WrongCardinality {
                got: values.len(),
                expected,
            });
        }
        Ok(values)
    }
}

impl EquilibriumSolver for NupackSolver {
    fn compute(&self, polymers: &[PolymerInput], monomer_concentrations_molar: &[f64], temp_c: f64) -> Result<Vec<f64>> {
        if !self.available() {
            return Err(EquilibriumError::Unavailable {
                path: self.executable.display().to_string(),
            });
        }
        let dir = TempDir::new().map_err(|e| EquilibriumError::Io {
            path: "<tempdir>".to_string(),
            source: e,
        })?;
        let base = "equilibrium";
        let ocx_path = dir.path().join(format!("{base}.ocx"));
        let con_path = dir.path().join(format!("{base}.con"));
        let eq_path = dir.path().join(format!("{base}.eq"));

        Self::write_ocx_file(&ocx_path, polymers)?;
        Self::write_con_file(&con_path, monomer_concentrations_molar)?;

        let status = Command::new(&self.executable)
            .current_dir(dir.path())
            .arg("-sort")
            .arg("0")
            .arg("-T")
            .arg(format!("{temp_c}"))
            .arg(base)
            .status()
            .map_err(|e| EquilibriumError::Io {
                path: self.executable.display().to_string(),
                source: e,
            })?;
        if !status.success() {
            return Err(EquilibriumError::NonZeroExit(format!("{status}")));
        }

        Self::parse_eq_file(&eq_path, polymers.len())
    }

    fn available(&self) -> bool {
        Command::new(&self.executable)
            .arg("-h")
            .output()
            .map(|o| o.status.success() || !o.stdout.is_empty() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "nupack-concentrations"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocx_file_numbers_complexes_from_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.ocx");
        let polymers = vec![PolymerInput { monomer_counts: vec![2, 1], free_energy: -4.2 }];
        NupackSolver::write_ocx_file(&path, &polymers).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("1\t1\t2\t1\t-4.2"));
    }

    #[test]
    fn eq_parser_skips_comment_and_percent_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.eq");
        fs::write(&path, "% header\n# another header\n1 1 2 0.0015\n2 1 1 0.0030\n").unwrap();
        let values = NupackSolver::parse_eq_file(&path, 2).unwrap();
        assert_eq!(values, vec![0.0015, 0.0030]);
    }

    #[test]
    fn wrong_row_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.eq");
        fs::write(&path, "1 0.1\n2 0.2\n3 0.3\n").unwrap();
        let err = NupackSolver::parse_eq_file(&path, 2).unwrap_err();
        assert!(matches!(err, EquilibriumError::WrongCardinality { got: 3, expected: 2 }));
    }
}
