//! Error types for the prediction engine

use thiserror::Error;

/// Errors surfaced by the prediction engine and classifier store.
///
/// Suspicious input and infeasible feedback are not errors: they travel as
/// fields of an otherwise successful [`crate::models::PredictionResult`].
#[derive(Error, Debug)]
pub enum PredictorError {
    /// Required feature missing, non-finite value or bad threshold override
    #[error("Validation error: {0}")]
    Validation(String),

    /// No trained classifier has been loaded yet
    #[error("Model not trained yet. Load a model artifact first")]
    ModelUnavailable,

    /// Artifact or metadata could not be used
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Blocking store work panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PredictorError {
    /// True for faults of the service itself, as opposed to bad input or a
    /// classifier that has not been loaded yet
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PredictorError::Io(_) | PredictorError::Json(_) | PredictorError::Task(_)
        )
    }
}

/// Result type for engine operations.
pub type PredictorResult<T> = Result<T, PredictorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_system_faults_are_internal() {
        assert!(!PredictorError::Validation("marks missing".into()).is_internal());
        assert!(!PredictorError::ModelUnavailable.is_internal());
        assert!(!PredictorError::InvalidArtifact("bad".into()).is_internal());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(PredictorError::from(io).is_internal());
    }

    #[test]
    fn test_error_messages() {
        let err = PredictorError::Validation("Missing required field(s): marks".into());
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required field(s): marks"
        );
        assert!(PredictorError::ModelUnavailable
            .to_string()
            .contains("Model not trained"));
    }
}
