use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("on-target polymer {0:?} was not found in the polymer basis")]
    OnTargetPolymerNotFound(Vec<i64>),

    #[error("target polymers must be off-target; invalid indices: {0:?}")]
    TargetsMustBeOffTarget(Vec<usize>),

    #[error("target polymer indices out of range: {0:?}")]
    TargetIndicesOutOfRange(Vec<usize>),

    #[error("upper-bound computation requires the Normaliz solver")]
    UnsupportedSolver,

    #[error(transparent)]
    Solver(#[from] tbn_solver::SolverError),
}

pub type Result<T> = std::result::Result<T, ReactionError>;
