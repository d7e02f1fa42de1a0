//! Error types for the AML screening service.
//!
//! Screening itself never fails on collaborator errors; those are absorbed at
//! the check boundary and logged. The variants here cover the fatal paths
//! (configuration, malformed data, internal invariants) plus the recoverable
//! collaborator errors that cache and repository implementations return.

use thiserror::Error;

/// Result type alias for screening operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the screening service
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Pattern detection error: {0}")]
    Pattern(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Error::Cache(msg.into())
    }

    /// Create a repository error
    pub fn repository(msg: impl Into<String>) -> Self {
        Error::Repository(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// True for errors a check may absorb without failing the screening call.
    /// Only programming bugs and IO on mandatory paths propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Cache(_)
                | Error::Repository(_)
                | Error::Pattern(_)
                | Error::NotFound(_)
                | Error::DeadlineExceeded(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(Error::cache("redis down").is_recoverable());
        assert!(Error::NotFound("profile".into()).is_recoverable());
        assert!(!Error::Config("bad latency".into()).is_recoverable());
        assert!(!Error::Internal("lock poisoned".into()).is_recoverable());
    }
}
