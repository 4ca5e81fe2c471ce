//! 4ti2 subprocess adapter: writes `.mat`/`.sign`/`.rel`(/`.rhs`) files, runs
//! `hilbert` (falling back to `zsolve`), and parses the `.hil`/`.zhom`/
//! `.zinhom` output format (`rows cols` header, then that many integer rows).

use std::path::{Path, PathBuf};
use std::process::Command;

use ndarray::{Array1, Array2};
use tempfile::TempDir;

use crate::error::{Result, SolverError};
use crate::HilbertBasisSolver;

pub struct FourTiTwoSolver {
    pub install_dir: PathBuf,
}

impl FourTiTwoSolver {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self { install_dir: install_dir.into() }
    }

    fn hilbert_executable(&self) -> PathBuf {
        self.install_dir.join("bin").join("hilbert")
    }

    fn zsolve_executable(&self) -> PathBuf {
        self.install_dir.join("bin").join("zsolve")
    }

    fn write_matrix(matrix: &Array2<i64>, path: &Path) -> Result<()> {
        let (rows, cols) = matrix.dim();
        let mut content = format!("{rows} {cols}\n");
        for row in matrix.outer_iter() {
            content.push_str(&row.iter().map(i64::to_string).collect::<Vec<_>>().join(" "));
            content.push('\n');
        }
        std::fs::write(path, content).map_err(|e| SolverError::Io { path: path.display().to_string(), source: e })
    }

    fn write_sign_all_nonneg(n_variables: usize, path: &Path, marker: &str) -> Result<()> {
        let content = format!("1 {n_variables}\n{}\n", vec![marker; n_variables].join(" "));
        std::fs::write(path, content).map_err(|e| SolverError::Io { path: path.display().to_string(), source: e })
    }

    fn write_rel_all_eq(n_equations: usize, path: &Path) -> Result<()> {
        let content = format!("1 {n_equations}\n{}\n", vec!["="; n_equations].join(" "));
        std::fs::write(path, content).map_err(|e| SolverError::Io { path: path.display().to_string(), source: e })
    }

    fn parse_output_file(path: &Path) -> Result<Vec<Array1<i64>>> {
        let content = std::fs::read_to_string(path).map_err(|e| SolverError::Io { path: path.display().to_string(), source: e })?;
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| SolverError::ParseFailure(format!("{}: empty output file", path.display())))?;
        let mut header_parts = header.split_whitespace();
        let n_vectors: usize = header_parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SolverError::ParseFailure(format!("invalid 4ti2 output header: {header}")))?;
        let n_variables: usize = header_parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SolverError::ParseFailure(format!("invalid 4ti2 output header: {header}")))?;

        let mut basis = Vec::with_capacity(n_vectors);
        for line in lines.take(n_vectors) {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: std::result::Result<Vec<i64>, _> = line.split_whitespace().map(|t| t.parse::<i64>()).collect();
            if let Ok(vector) = parsed {
                if vector.len() == n_variables {
                    basis.push(Array1::from(vector));
                }
            }
        }
        Ok(basis)
    }

    fn run_hilbert(&self, base_name: &Path) -> Result<PathBuf> {
        let exe = self.hilbert_executable();
        let output = Command::new(&exe)
            .arg(base_name)
            .output()
            .map_err(|_| SolverError::Unavailable { path: exe.display().to_string() })?;
        if !output.status.success() {
            return Err(SolverError::NonZeroExit(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        let hil = base_name.with_extension("hil");
        if !hil.exists() {
            return Err(SolverError::MissingOutput(hil.display().to_string()));
        }
        Ok(hil)
    }

    fn run_zsolve(&self, base_name: &Path) -> Result<PathBuf> {
        let exe = self.zsolve_executable();
        let output = Command::new(&exe)
            .arg(base_name)
            .output()
            .map_err(|_| SolverError::Unavailable { path: exe.display().to_string() })?;
        if !output.status.success() {
            return Err(SolverError::NonZeroExit(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        let zhom = base_name.with_extension("zhom");
        if zhom.exists() {
            return Ok(zhom);
        }
        let zinhom = base_name.with_extension("zinhom");
        if zinhom.exists() {
            return Ok(zinhom);
        }
        Err(SolverError::MissingOutput(format!("{}: no .zhom or .zinhom produced", base_name.display())))
    }
}

impl HilbertBasisSolver for FourTiTwoSolver {
    fn hilbert_basis(&self, matrix: &Array2<i64>) -> Result<Vec<Array1<i64>>> {
        let (n_equations, n_variables) = matrix.dim();
        let tmp = TempDir::new().map_err(|e| SolverError::Io { path: "tmpdir".into(), source: e })?;
        let base_name = tmp.path().join("problem");

        Self::write_matrix(matrix, &base_name.with_extension("mat"))?;
        Self::write_sign_all_nonneg(n_variables, &base_name.with_extension("sign"), "+")?;
        Self::write_rel_all_eq(n_equations, &base_name.with_extension("rel"))?;

        let output_file = match self.run_hilbert(&base_name) {
            Ok(f) => f,
            Err(_) => self.run_zsolve(&base_name)?,
        };

        let basis = Self::parse_output_file(&output_file)?;
        if basis.is_empty() {
            return Err(SolverError::EmptyBasis);
        }
        Ok(basis)
    }

    fn module_generators_with_slice(&self, equations: &Array2<i64>, slice: &Array1<i64>) -> Result<Vec<Array1<i64>>> {
        let (n_equations, n_variables) = equations.dim();
        let n_rows = n_equations + 1;
        let tmp = TempDir::new().map_err(|e| SolverError::Io { path: "tmpdir".into(), source: e })?;
        let base_name = tmp.path().join("slice");

        let mut mat = format!("{n_rows} {n_variables}\n");
        for row in equations.outer_iter() {
            mat.push_str(&row.iter().map(i64::to_string).collect::<Vec<_>>().join(" "));
            mat.push('\n');
        }
        mat.push_str(&slice.iter().map(i64::to_string).collect::<Vec<_>>().join(" "));
        mat.push('\n');
        std::fs::write(base_name.with_extension("mat"), mat)
            .map_err(|e| SolverError::Io { path: base_name.display().to_string(), source: e })?;

        let mut relations: Vec<&str> = vec!["="; n_equations];
        relations.push(">");
        std::fs::write(base_name.with_extension("rel"), format!("1 {n_rows}\n{}\n", relations.join(" ")))
            .map_err(|e| SolverError::Io { path: base_name.display().to_string(), source: e })?;

        let mut rhs: Vec<&str> = vec!["0"; n_equations];
        rhs.push("1");
        std::fs::write(base_name.with_extension("rhs"), format!("1 {n_rows}\n{}\n", rhs.join(" ")))
            .map_err(|e| SolverError::Io { path: base_name.display().to_string(), source: e })?;

        Self::write_sign_all_nonneg(n_variables, &base_name.with_extension("sign"), "1")?;

        let exe = self.zsolve_executable();
        let output = Command::new(&exe)
            .arg(&base_name)
            .output()
            .map_err(|_| SolverError::Unavailable { path: exe.display().to_string() })?;
        if !output.status.success() {
            return Err(SolverError::NonZeroExit(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let zinhom = base_name.with_extension("zinhom");
        if !zinhom.exists() {
            return Ok(Vec::new());
        }
        Self::parse_output_file(&zinhom)
    }

    fn available(&self) -> bool {
        is_executable(&self.hilbert_executable()) || is_executable(&self.zsolve_executable())
    }

    fn name(&self) -> &'static str {
        "4ti2"
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hilbert_output_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("out.hil");
        std::fs::write(&file, "2 3\n1 0 2\n0 1 1\n").unwrap();
        let basis = FourTiTwoSolver::parse_output_file(&file).unwrap();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[0].to_vec(), vec![1, 0, 2]);
    }

    #[test]
    fn mismatched_variable_count_rows_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("out.hil");
        std::fs::write(&file, "2 3\n1 0 2\n0 1\n").unwrap();
        let basis = FourTiTwoSolver::parse_output_file(&file).unwrap();
        assert_eq!(basis.len(), 1);
    }
}
