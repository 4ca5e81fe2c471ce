pub mod analyze;
pub mod filter;
pub mod ibot;

use anyhow::{bail, Context};
use tbn_core::SolverConfig;
use tbn_solver::{FourTiTwoSolver, HilbertBasisSolver, NormalizSolver};

/// Picks the Hilbert-basis solver named by `--use-4ti2`, failing fast if it
/// is not reachable — mirrors `cli.py`'s "check solver availability" step.
pub fn pick_hilbert_solver(config: &SolverConfig, use_4ti2: bool) -> anyhow::Result<Box<dyn HilbertBasisSolver>> {
    let solver: Box<dyn HilbertBasisSolver> = if use_4ti2 {
        Box::new(FourTiTwoSolver::new(config.fourtitwo_path.clone()))
    } else {
        Box::new(NormalizSolver::new(config.normaliz_path.clone()))
    };

    if !solver.available() {
        bail!("{} is not available; set the appropriate *_PATH environment variable", solver.name());
    }

    Ok(solver)
}

pub fn read_to_string(path: &std::path::Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
