//! Error types for planbench-report

use thiserror::Error;

use planbench_core::ListenerError;

/// Report error type
#[derive(Error, Debug)]
pub enum ReportError {
    /// Histogram could not be created or updated
    #[error("histogram error: {0}")]
    Histogram(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ReportError> for ListenerError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Io(e) => ListenerError::Io(e),
            ReportError::Serialization(e) => ListenerError::Serialization(e),
            ReportError::Histogram(msg) => ListenerError::Unavailable(msg),
        }
    }
}

/// Result type alias
pub type ReportResult<T> = std::result::Result<T, ReportError>;
