//! Error types for Daemon AI
//!
//! Errors are split by layer: collaborator failures (catalog, completion
//! service), engine precondition and contract failures, and the crate-wide
//! error used at the binary and server edges.

use crate::types::SuggestionId;
use thiserror::Error;

/// Failure reported by an external collaborator (catalog or completion service)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Required field missing or blank on create
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Daemon does not exist (may already have been deleted)
    #[error("Daemon not found: {0}")]
    NotFound(String),

    /// Built-in daemon cannot be deleted
    #[error("Cannot delete built-in daemon: {0}")]
    Protected(String),

    /// Network, timeout or non-success response
    #[error("Request failed: {0}")]
    Request(String),
}

impl CollaboratorError {
    /// Build a validation error for a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { field, message } => format!("{}: {}", field, message),
            Self::NotFound(id) => format!("Daemon '{}' was already removed", id),
            Self::Protected(id) => format!("'{}' is a built-in daemon and cannot be deleted", id),
            Self::Request(_) => {
                "Could not reach the daemon service. Check your connection and try again."
                    .to_string()
            }
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        CollaboratorError::Request(err.to_string())
    }
}

/// Span indices that do not describe the text they claim to come from
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// start > end
    #[error("Span start {start} is after end {end}")]
    Inverted { start: usize, end: usize },

    /// end past the snapshot length (in characters)
    #[error("Span end {end} exceeds text length {len}")]
    OutOfRange { end: usize, len: usize },

    /// Only one of the two indices was supplied
    #[error("Span is missing an index (start present: {start}, end present: {end})")]
    Incomplete { start: bool, end: bool },

    /// Literal span text differs from the snapshot substring
    #[error("Span text {found:?} does not match snapshot text {expected:?}")]
    TextMismatch { expected: String, found: String },
}

/// Engine operation refused or called out of contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller referenced a suggestion that is not queued (caller bug)
    #[error("Suggestion {0} is not in the queue")]
    NotQueued(SuggestionId),

    /// Apply refused: span no longer matches the document
    #[error("Suggestion {0} is outdated and cannot be applied")]
    Outdated(SuggestionId),

    /// Apply refused: a rewrite for this suggestion is already in flight
    #[error("Suggestion {0} is already being applied")]
    ApplyInFlight(SuggestionId),

    /// Collaborator rejected a catalog operation
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl EngineError {
    /// True when the error indicates a caller bug rather than an external condition
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::NotQueued(_))
    }
}

/// Main error type for Daemon AI operations
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// LLM API returned an unusable response
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Collaborator failure
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Daemon AI operations
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Convert anyhow::Error to DaemonError
impl From<anyhow::Error> for DaemonError {
    fn from(err: anyhow::Error) -> Self {
        DaemonError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollaboratorError::NotFound("critic".to_string());
        assert_eq!(err.to_string(), "Daemon not found: critic");

        let err = EngineError::Outdated(SuggestionId::from_raw(7));
        assert_eq!(err.to_string(), "Suggestion #7 is outdated and cannot be applied");
    }

    #[test]
    fn test_invariant_violation_is_distinct() {
        assert!(EngineError::NotQueued(SuggestionId::from_raw(1)).is_invariant_violation());
        assert!(!EngineError::ApplyInFlight(SuggestionId::from_raw(1)).is_invariant_violation());
        assert!(!EngineError::Collaborator(CollaboratorError::Request("timeout".into()))
            .is_invariant_violation());
    }

    #[test]
    fn test_request_error_user_message_hides_details() {
        let err = CollaboratorError::Request("connection refused (os error 111)".into());
        assert!(!err.user_message().contains("os error"));
    }

    #[test]
    fn test_error_conversion() {
        let err: DaemonError = CollaboratorError::validation("name", "required").into();
        assert!(matches!(err, DaemonError::Collaborator(_)));
        assert_eq!(err.to_string(), "Invalid name: required");
    }
}
