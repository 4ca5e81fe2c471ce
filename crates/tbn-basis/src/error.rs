use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasisError {
    #[error(transparent)]
    Tbn(#[from] tbn_core::error::TbnError),

    #[error(transparent)]
    Solver(#[from] tbn_solver::SolverError),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BasisError>;
