use serde::Serialize;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the calculation engine.
///
/// Only `Configuration` aborts a run before any unit is processed; the
/// other kinds are recorded against the unit they occurred in and the run
/// continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed grouping or boundary structure.
    #[error("Partition error: {0}")]
    Partition(String),

    /// Malformed qualifier definition.
    #[error("Qualifier error: {0}")]
    Qualifier(String),

    /// Unresolved required element under a `fail` policy.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Hard sanity-rule violation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown operation identifier or malformed run configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// The kind of this error, for summary counting.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Partition(_) => ErrorKind::Partition,
            EngineError::Qualifier(_) => ErrorKind::Qualifier,
            EngineError::MissingData(_) => ErrorKind::MissingData,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Error kinds used for the run summary counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Partition,
    Qualifier,
    MissingData,
    Validation,
    Configuration,
}
