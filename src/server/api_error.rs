//! Mapping of domain errors onto HTTP responses with a `{"error": ...}` body.

use crate::analysis::AnalysisError;
use crate::generation::GenerationError;
use crate::intake::IntakeError;
use crate::studio_store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.status, self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TrackNotFound(_) => ApiError::not_found("Track not found"),
            StoreError::JobNotFound(_) => ApiError::not_found("Job not found"),
            other => ApiError::new(StatusCode::CONFLICT, other.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NotFound(message) => ApiError::not_found(message),
            GenerationError::InvalidRequest(message) => ApiError::bad_request(message),
            GenerationError::Timeout(_) => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            GenerationError::Abandoned(_) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            GenerationError::Store(e) => e.into(),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::InvalidFilename(_)
            | IntakeError::UnsupportedFileType
            | IntakeError::FileTooLarge(_, _)
            | IntakeError::Empty => ApiError::bad_request(err.to_string()),
            IntakeError::Store(e) => e.into(),
            IntakeError::Io(e) => ApiError::internal(format!("Upload failed: {}", e)),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::TrackNotFound(_) => ApiError::not_found("Track not found"),
            AnalysisError::Store(e) => e.into(),
            other => ApiError::internal(format!("Analysis failed: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                StoreError::TrackNotFound("t".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                GenerationError::InvalidRequest("bad".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                GenerationError::Abandoned("j".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerationError::Store(StoreError::JobNotFound("j".into())).into(),
                StatusCode::NOT_FOUND,
            ),
            (IntakeError::UnsupportedFileType.into(), StatusCode::BAD_REQUEST),
            (
                AnalysisError::ScriptFailed("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StoreError::JobFinalized("j".into()).into(),
                StatusCode::CONFLICT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status, expected, "{}", error.message);
        }
    }

    #[tokio::test]
    async fn body_is_error_json() {
        let response = ApiError::bad_request("Missing thing").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Missing thing" }));
    }
}
