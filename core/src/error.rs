//! Error types for planbench-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::plan::NodeId;

/// Core error type
#[derive(Error, Debug)]
pub enum PlanError {
    /// The plan tree violates a structural rule (reported by the compiler)
    #[error("malformed plan: {0}")]
    Malformed(String),

    /// A node id does not belong to the plan tree
    #[error("unknown plan node {0}")]
    UnknownNode(NodeId),

    /// A required builder field was not provided
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// Thread group configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Thread group lifecycle error
    #[error("thread group error: {0}")]
    Group(String),

    /// IO error (e.g. spawning a thread)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanError {
    /// Create a malformed plan error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create a missing configuration error
    pub fn missing_config(field: &str) -> Self {
        Self::MissingConfig(field.to_string())
    }

    /// Create a thread group error
    pub fn group(message: impl Into<String>) -> Self {
        Self::Group(message.into())
    }

    /// Whether this error was raised by the tree compiler
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Result type alias
pub type PlanResult<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = PlanError::malformed("cycle through 'Loop'");
        assert!(err.is_malformed());
        assert_eq!(err.to_string(), "malformed plan: cycle through 'Loop'");
    }

    #[test]
    fn test_missing_config_display() {
        let err = PlanError::missing_config("plan");
        assert!(!err.is_malformed());
        assert!(err.to_string().contains("plan"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: PlanError = ConfigError::InvalidThreadCount("must be at least 1".into()).into();
        assert_eq!(err.to_string(), "Invalid thread count: must be at least 1");
    }
}
