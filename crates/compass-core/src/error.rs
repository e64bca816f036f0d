//! Error types for compass.

use thiserror::Error;

/// Result type alias using compass's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for compass operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete task payload. Fatal, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// External collaborator unreachable or timed out. Retryable.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Generative response missing required fields. Fatal for the attempt.
    #[error("Schema violation: {0}")]
    Schema(String),

    /// No handler registered for the task type. Fatal, immediate dead-letter.
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Vector search failed
    #[error("Search error: {0}")]
    Search(String),

    /// Queue operation failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failed attempt may succeed on redelivery.
    ///
    /// This is the single classification authority: the dispatcher maps
    /// retryable errors to requeue (up to the attempt ceiling) and
    /// everything else to dead-letter.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transient(_) | Error::Queue(_) | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transient(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("missing field: document_id".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: missing field: document_id"
        );
    }

    #[test]
    fn test_error_display_transient() {
        let err = Error::Transient("vector store unreachable".to_string());
        assert_eq!(err.to_string(), "Transient error: vector store unreachable");
    }

    #[test]
    fn test_error_display_schema() {
        let err = Error::Schema("response missing 'rationale'".to_string());
        assert_eq!(
            err.to_string(),
            "Schema violation: response missing 'rationale'"
        );
    }

    #[test]
    fn test_error_display_unknown_task_type() {
        let err = Error::UnknownTaskType("bogus".to_string());
        assert_eq!(err.to_string(), "Unknown task type: bogus");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Transient("timeout".into()).is_retryable());
        assert!(Error::Queue("publish failed".into()).is_retryable());
        assert!(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).is_retryable());

        assert!(!Error::Validation("bad payload".into()).is_retryable());
        assert!(!Error::Schema("missing field".into()).is_retryable());
        assert!(!Error::UnknownTaskType("bogus".into()).is_retryable());
        assert!(!Error::Inference("model refused".into()).is_retryable());
        assert!(!Error::Serialization("bad json".into()).is_retryable());
        assert!(!Error::Config("no api key".into()).is_retryable());
        assert!(!Error::Internal("oops".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
