//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use predictor_lib::PredictorError;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong admin token
    Unauthorized,

    /// Bad request payload
    Validation(String),

    /// No classifier loaded yet
    ModelUnavailable(String),

    /// Artifact on disk could not be loaded
    InvalidArtifact(String),

    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::ModelUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.as_str()),
            ApiError::InvalidArtifact(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::Validation(_) => ApiError::Validation(err.to_string()),
            PredictorError::ModelUnavailable => ApiError::ModelUnavailable(err.to_string()),
            PredictorError::InvalidArtifact(_) => ApiError::InvalidArtifact(err.to_string()),
            PredictorError::Io(_) | PredictorError::Json(_) | PredictorError::Task(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::from(PredictorError::Validation("x".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(PredictorError::ModelUnavailable), StatusCode::SERVICE_UNAVAILABLE),
            (
                ApiError::from(PredictorError::InvalidArtifact("bad".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ApiError::Internal("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
