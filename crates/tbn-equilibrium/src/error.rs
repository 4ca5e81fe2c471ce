use thiserror::Error;

#[derive(Debug, Error)]
pub enum EquilibriumError {
    #[error("equilibrium solver not available at '{path}'")]
    Unavailable { path: String },

    #[error("equilibrium solver exited with a nonzero status: {0}")]
    NonZeroExit(String),

    #[error("equilibrium solver returned {got} concentrations but {expected} were expected")]
    WrongCardinality { got: usize, expected: usize },

    #[error("failed to parse equilibrium solver output: {0}")]
    ParseFailure(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EquilibriumError>;
