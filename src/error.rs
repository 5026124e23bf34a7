//! Error types shared across the workflow core.
//!
//! Agents never surface these to their caller directly: every error is
//! converted into a failed [`crate::swarm::TaskResult`] at the agent boundary.

use thiserror::Error;

/// Errors raised by a [`crate::provider::DatasetProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The source could not be reached.
    #[error("dataset source unavailable: {0}")]
    Unavailable(String),

    /// The fetch did not finish within its deadline.
    #[error("dataset fetch timed out after {0:.1}s")]
    Timeout(f64),

    /// The requested source does not exist.
    #[error("dataset source not found: {0}")]
    NotFound(String),

    /// The source returned data that could not be decoded.
    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Timeout(_))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Malformed(e.to_string())
    }
}

/// Errors produced while an agent executes a task.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unsupported task kind")]
    UnsupportedTaskKind,

    #[error("agent {0} is offline")]
    Offline(String),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("task timed out after {0:.1}s")]
    Timeout(f64),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while building or tearing down the agent pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("agent pool already started; shut it down before starting again")]
    AlreadyStarted,

    #[error("agent pool has not been started")]
    NotStarted,

    #[error("invalid swarm configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_message() {
        assert_eq!(
            AgentError::UnsupportedTaskKind.to_string(),
            "unsupported task kind"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Unavailable("down".into()).is_transient());
        assert!(ProviderError::Timeout(1.0).is_transient());
        assert!(!ProviderError::NotFound("x".into()).is_transient());
        assert!(!ProviderError::Malformed("x".into()).is_transient());
    }

    #[test]
    fn test_provider_error_passes_through_agent_error() {
        let err: AgentError = ProviderError::Unavailable("county portal down".into()).into();
        assert_eq!(err.to_string(), "dataset source unavailable: county portal down");
    }
}
