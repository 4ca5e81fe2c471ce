use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Tbn(#[from] tbn_core::error::TbnError),

    #[error("constraint line {line}: {message}")]
    Constraint { line: usize, message: String },

    #[error("tbnexplorer2-filter requires a .tbn file with UNITS and concentrations; '{path}' has neither")]
    MissingUnits { path: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
