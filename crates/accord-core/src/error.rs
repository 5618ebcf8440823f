//! Error types for the Accord engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Accord engine.
///
/// Workflow validation failures (`RelationshipIncomplete`, `NotYourTurn`,
/// `InvalidState`, `InvalidPayload`, `AnalysisUnavailable`) are returned to
/// the caller without mutating persisted state. Transport-level failures
/// (`Io`, `DataAccess`, `Serialization`, `Conflict`) indicate storage or
/// network trouble and must never be confused with validation rejections.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccordError {
    /// The relationship has no second partner yet, so no session can exist.
    #[error("Relationship '{relationship_id}' has no second partner yet")]
    RelationshipIncomplete { relationship_id: String },

    /// The caller is not the party permitted to act in the current state.
    #[error("Not your turn: expected {expected}, got '{got}'")]
    NotYourTurn { expected: String, got: String },

    /// The action does not match any transition from the current state.
    #[error("Invalid state: cannot apply '{action}' while session is '{status}'")]
    InvalidState { status: String, action: String },

    /// A required submission field is missing or empty.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The external analysis call failed or timed out.
    ///
    /// The session remains in `analyzing` with no partial result; this is
    /// the only variant that is retryable by design.
    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Optimistic concurrency failure: the stored record changed underneath
    /// the writer (compare-and-set version mismatch).
    #[error("Conflicting write: {0}")]
    Conflict(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccordError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a RelationshipIncomplete error
    pub fn relationship_incomplete(relationship_id: impl Into<String>) -> Self {
        Self::RelationshipIncomplete {
            relationship_id: relationship_id.into(),
        }
    }

    /// Creates a NotYourTurn error
    pub fn not_your_turn(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::NotYourTurn {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Creates an InvalidState error
    pub fn invalid_state(status: impl Into<String>, action: impl Into<String>) -> Self {
        Self::InvalidState {
            status: status.into(),
            action: action.into(),
        }
    }

    /// Creates an InvalidPayload error
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    /// Creates an AnalysisUnavailable error
    pub fn analysis_unavailable(message: impl Into<String>) -> Self {
        Self::AnalysisUnavailable(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this error is a workflow validation failure.
    ///
    /// Validation failures never mutate stored state and indicate the
    /// caller must correct the request (wrong actor, wrong payload)
    /// rather than retry blindly.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::RelationshipIncomplete { .. }
                | Self::NotYourTurn { .. }
                | Self::InvalidState { .. }
                | Self::InvalidPayload(_)
        )
    }

    /// Check if this error is safe to retry.
    ///
    /// Only `AnalysisUnavailable` is retryable by design: the session
    /// stays in `analyzing` with no partial write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AnalysisUnavailable(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for AccordError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for AccordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AccordError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for AccordError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, AccordError>`.
pub type Result<T> = std::result::Result<T, AccordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let err = AccordError::not_your_turn("initiator", "p2");
        assert!(err.is_validation());
        assert!(!err.is_retryable());

        let err = AccordError::invalid_state("complete", "submit_report");
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_analysis_unavailable_is_retryable() {
        let err = AccordError::analysis_unavailable("timeout after 60s");
        assert!(err.is_retryable());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_transport_errors_are_distinct_from_validation() {
        let err: AccordError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(!err.is_validation());
        assert!(!err.is_retryable());
        assert!(matches!(err, AccordError::Io { .. }));
    }
}
