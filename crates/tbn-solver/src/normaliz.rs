//! Normaliz subprocess adapter: writes a `.in` file, runs `normaliz`, and
//! parses the Hilbert-basis section out of the resulting `.out` file.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use ndarray::{Array1, Array2};
use tempfile::TempDir;

use crate::error::{Result, SolverError};
use crate::HilbertBasisSolver;

const SECTION_HEADERS: [&str; 3] = [
    "lattice points in polytope (Hilbert basis elements of degree 1):",
    "Hilbert basis elements:",
    "module generators:",
];

const SECTION_TERMINATORS: [&str; 5] = [
    "extreme rays:",
    "support hyperplanes:",
    "equations:",
    "basis elements of generated",
    "***",
];

pub struct NormalizSolver {
    pub executable: PathBuf,
}

impl NormalizSolver {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    fn run(&self, input_file: &Path) -> Result<PathBuf> {
        let output = Command::new(&self.executable)
            .arg(input_file)
            .output()
            .map_err(|_| SolverError::Unavailable { path: self.executable.display().to_string() })?;

        if !output.status.success() {
            let message = if !output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            return Err(SolverError::NonZeroExit(message));
        }

        let output_file = input_file.with_extension("out");
        if !output_file.exists() {
            return Err(SolverError::MissingOutput(output_file.display().to_string()));
        }
        Ok(output_file)
    }

    fn parse_hilbert_basis(&self, output_file: &Path) -> Result<Vec<Array1<i64>>> {
        let content = std::fs::read_to_string(output_file)
            .map_err(|e| SolverError::Io { path: output_file.display().to_string(), source: e })?;

        let mut basis = Vec::new();
        let mut in_section = false;

        for raw_line in content.lines() {
            let line = raw_line.trim();

            if SECTION_HEADERS.iter().any(|h| line.contains(h)) {
                in_section = true;
                continue;
            }
            if in_section && SECTION_TERMINATORS.iter().any(|t| line.contains(t)) {
                break;
            }
            if in_section
                && !line.is_empty()
                && !line.starts_with('*')
                && line.chars().all(|c| c.is_ascii_digit() || c == '-' || c.is_whitespace())
            {
                let parsed: std::result::Result<Vec<i64>, _> =
                    line.split_whitespace().map(|t| t.parse::<i64>()).collect();
                if let Ok(vector) = parsed {
                    if !vector.is_empty() {
                        basis.push(Array1::from(vector));
                    }
                }
            }
        }

        Ok(basis)
    }

    fn write_equations_block(out: &mut String, matrix: &Array2<i64>) {
        let (rows, _) = matrix.dim();
        if rows > 0 {
            out.push_str(&format!("equations {rows}\n"));
            for row in matrix.outer_iter() {
                out.push_str(&row.iter().map(i64::to_string).collect::<Vec<_>>().join(" "));
                out.push('\n');
            }
            out.push('\n');
        }
    }
}

impl HilbertBasisSolver for NormalizSolver {
    fn hilbert_basis(&self, matrix: &Array2<i64>) -> Result<Vec<Array1<i64>>> {
        let (_, n_variables) = matrix.dim();
        let tmp = TempDir::new().map_err(|e| SolverError::Io { path: "tmpdir".into(), source: e })?;
        let input_file = tmp.path().join("input.in");

        let mut content = String::from("/* Normaliz input for Hilbert basis computation */\n\n");
        content.push_str(&format!("amb_space {n_variables}\n\n"));
        Self::write_equations_block(&mut content, matrix);
        content.push_str("HilbertBasis\n");

        std::fs::write(&input_file, content).map_err(|e| SolverError::Io { path: input_file.display().to_string(), source: e })?;

        let output_file = self.run(&input_file)?;
        let basis = self.parse_hilbert_basis(&output_file)?;
        if basis.is_empty() {
            return Err(SolverError::EmptyBasis);
        }
        Ok(basis)
    }

    fn module_generators_with_slice(&self, equations: &Array2<i64>, slice: &Array1<i64>) -> Result<Vec<Array1<i64>>> {
        let n_variables = equations.ncols().max(slice.len());
        let tmp = TempDir::new().map_err(|e| SolverError::Io { path: "tmpdir".into(), source: e })?;
        let input_file = tmp.path().join("input.in");

        let mut content = String::from("/* Normaliz input for Hilbert basis with strict inequality */\n\n");
        content.push_str(&format!("amb_space {n_variables}\n\n"));
        Self::write_equations_block(&mut content, equations);
        content.push_str("strict_inequalities 1\n");
        content.push_str(&slice.iter().map(i64::to_string).collect::<Vec<_>>().join(" "));
        content.push_str("\n\n");
        content.push_str("HilbertBasis\n");

        std::fs::write(&input_file, content).map_err(|e| SolverError::Io { path: input_file.display().to_string(), source: e })?;

        let output_file = self.run(&input_file)?;
        self.parse_hilbert_basis(&output_file)
    }

    fn available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "normaliz"
    }
}

/// Liveness probe with a short timeout, for the `available()` surface
/// exposed through the CLI before a long-running computation is attempted.
pub fn check_available_with_timeout(executable: &Path, timeout: Duration) -> bool {
    use std::sync::mpsc;
    let exe = executable.to_path_buf();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let ok = Command::new(&exe).arg("--version").output().map(|o| o.status.success()).unwrap_or(false);
        let _ = tx.send(ok);
    });
    rx.recv_timeout(timeout).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hilbert_basis_elements_section() {
        let solver = NormalizSolver::new("normaliz");
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("input.out");
        std::fs::write(
            &out,
            "some preamble\nHilbert basis elements:\n1 0 2\n0 1 1\nextreme rays:\n9 9 9\n",
        )
        .unwrap();

        let basis = solver.parse_hilbert_basis(&out).unwrap();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[0].to_vec(), vec![1, 0, 2]);
    }

    #[test]
    fn module_generators_header_variant_is_recognized() {
        let solver = NormalizSolver::new("normaliz");
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("input.out");
        std::fs::write(&out, "module generators:\n2 0\n***\n").unwrap();
        let basis = solver.parse_hilbert_basis(&out).unwrap();
        assert_eq!(basis.len(), 1);
    }
}
