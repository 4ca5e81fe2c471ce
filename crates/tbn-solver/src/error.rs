use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver executable not available at '{path}'")]
    Unavailable { path: String },

    #[error("solver exited with a nonzero status: {0}")]
    NonZeroExit(String),

    #[error("solver produced no output file: {0}")]
    MissingOutput(String),

    #[error("failed to parse solver output: {0}")]
    ParseFailure(String),

    #[error("empty Hilbert basis returned by solver")]
    EmptyBasis,

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SolverError>;
