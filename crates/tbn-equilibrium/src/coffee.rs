//! COFFEE adapter: writes a `.cfe` polymer-basis file and a `.con`
//! monomer-concentration file, invokes the `coffee` binary, and parses its
//! whitespace-separated concentration output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::error::{EquilibriumError, Result};
use crate::{EquilibriumSolver, PolymerInput};

pub struct CoffeeSolver {
    pub executable: PathBuf,
}

impl CoffeeSolver {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    fn write_cfe_file(path: &Path, polymers: &[PolymerInput]) -> Result<()> {
        let mut contents = String::new();
        for p in polymers {
            let counts = p
                .monomer_counts
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            contents.push_str(&counts);
            contents.push(' ');
            contents.push_str(&format!("{:.10}\n", p.free_energy));
        }
        fs::write(path, contents).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn write_con_file(path: &Path, monomer_concentrations_molar: &[f64]) -> Result<()> {
        let mut contents = String::new();
        for c in monomer_concentrations_molar {
            contents.push_str(&format!("{:.10}\n", c));
        }
        fs::write(path, contents).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn parse_output(path: &Path, expected: usize) -> Result<Vec<f64>> {
        let contents = fs::read_to_string(path).map_err(|e| EquilibriumError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let values: Vec<f64> = contents
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| EquilibriumError::ParseFailure(format!("not a float: {tok}")))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != expected {
            return Err(EquilibriumError::WrongCardinality {
                got: values.len(),
                expected,
            });
        }
        Ok(values)
    }
}

impl EquilibriumSolver for CoffeeSolver {
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
        let cfe_path = dir.path().join("basis.cfe");
        let con_path = dir.path().join("monomers.con");
        let out_path = dir.path().join("equilibrium.out");

        Self::write_cfe_file(&cfe_path, polymers)?;
        Self::write_con_file(&con_path, monomer_concentrations_molar)?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(&cfe_path).arg(&con_path).arg("-o").arg(&out_path);
        if (temp_c - 37.0).abs() > f64::EPSILON {
            cmd.arg("--temp").arg(format!("{temp_c}"));
        }

        let status = cmd.status().map_err(|e| EquilibriumError::Io {
            path: self.executable.display().to_string(),
            source: e,
        })?;
        if !status.success() {
            return Err(EquilibriumError::NonZeroExit(format!("{status}")));
        }

        Self::parse_output(&out_path, polymers.len())
    }

    fn available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--help")
            .output()
            .map(|o| o.status.success() || !o.stdout.is_empty())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "coffee"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfe_file_has_one_line_per_polymer_with_trailing_energy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.cfe");
        let polymers = vec![
            PolymerInput { monomer_counts: vec![1, 0], free_energy: -1.5 },
            PolymerInput { monomer_counts: vec![0, 2], free_energy: 0.0 },
        ];
        CoffeeSolver::write_cfe_file(&path, &polymers).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1 0"));
    }

    #[test]
    fn wrong_cardinality_output_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "0.1 0.2 0.3\n").unwrap();
        let err = CoffeeSolver::parse_output(&path, 2).unwrap_err();
        assert!(matches!(err, EquilibriumError::WrongCardinality { got: 3, expected: 2 }));
    }

    #[test]
    fn unavailable_executable_reports_unavailable() {
        let solver = CoffeeSolver::new(PathBuf::from("/nonexistent/coffee-binary-xyz"));
        assert!(!solver.available());
    }
}
