use thiserror::Error;

/// The error taxonomy shared by every crate in the workspace.
///
/// Each variant corresponds to one of the kinds in the propagation policy:
/// syntax, semantics, invariant violation, reference miss, oracle failure, I/O.
#[derive(Debug, Error)]
pub enum TbnError {
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{0}")]
    Semantics(String),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0}")]
    ReferenceMiss(String),

    #[error("{0}")]
    OracleFailure(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TbnError {
    pub fn syntax(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        TbnError::Syntax {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        TbnError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TbnError>;
