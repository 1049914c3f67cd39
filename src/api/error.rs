//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::triage::TriageError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid symptom input: {0}")]
    InvalidInput(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Triage unavailable: {0}")]
    TriageUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidInput(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                detail.clone(),
            ),
            ApiError::TriageUnavailable(detail) => {
                tracing::warn!(detail, "Triage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TRIAGE_UNAVAILABLE",
                    "Triage is temporarily unavailable. If you feel unwell, contact a healthcare provider or emergency services.".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::InvalidInput(detail) => ApiError::InvalidInput(detail),
            TriageError::TriageUnavailable(detail) => ApiError::TriageUnavailable(detail),
            TriageError::Cancelled => ApiError::TriageUnavailable("server shutting down".into()),
            e if e.is_engine_failure() => ApiError::TriageUnavailable(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn invalid_input_returns_400() {
        let response = ApiError::from(TriageError::InvalidInput("empty".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_INPUT");
        assert_eq!(json["error"]["message"], "empty");
    }

    #[tokio::test]
    async fn unavailable_returns_503_without_internals() {
        let response =
            ApiError::from(TriageError::TriageUnavailable("backend at 10.0.0.3 refused".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "TRIAGE_UNAVAILABLE");
        assert!(!json["error"]["message"].as_str().unwrap().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Demo payload not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response =
            ApiError::from(TriageError::Configuration("bad rules path".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INTERNAL");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn cancellation_maps_to_unavailable() {
        let err = ApiError::from(TriageError::Cancelled);
        assert!(matches!(err, ApiError::TriageUnavailable(_)));
    }

    #[test]
    fn engine_failure_maps_to_unavailable() {
        let err = ApiError::from(TriageError::EngineTransport("timeout".into()));
        assert!(matches!(err, ApiError::TriageUnavailable(_)));
    }
}
