//! Mapping from domain errors to HTTP responses.
//!
//! | Error | Status |
//! |-------|--------|
//! | `ValidationError` | 422 |
//! | `ProviderError::{NotConfigured, Unsupported}` | 400 |
//! | other `ProviderError` | 500 |
//! | `AgentError::NotFound` | 404 |
//! | `PatientError::NotFound` / `Conflict` | 404 / 409 |
//! | anything else | 500 |
//!
//! Every error body is `{"detail": "<message>"}`.

use axum::extract::{FromRequest, FromRequestParts};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use medchat_core::error::{
    AgentError, Error, MemoryError, PatientError, ProviderError, ValidationError,
};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// A 500 whose cause is logged but not exposed.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        if e.is_client_error() {
            Self::new(StatusCode::BAD_REQUEST, e.to_string())
        } else {
            error!(error = %e, "LLM request failed");
            Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing chat request: {e}"),
            )
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::NotFound(_) => Self::not_found(e.to_string()),
            other => Self::internal(other),
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound(_) => Self::not_found("Patient not found"),
            PatientError::Conflict(_) => Self::new(StatusCode::CONFLICT, e.to_string()),
            other => Self::internal(other),
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        error!(error = %e, "Memory operation failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(e) => e.into(),
            Error::Provider(e) => e.into(),
            Error::Agent(e) => e.into(),
            Error::Patient(e) => e.into(),
            Error::Memory(e) => e.into(),
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
    }
}

/// `Json` whose rejections use the `{"detail": ...}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejections use the `{"detail": ...}` body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_is_unprocessable() {
        let (status, body) = body_of(ValidationError::new("message", "too long").into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "message: too long");
    }

    #[tokio::test]
    async fn provider_errors_split_by_cause() {
        let (status, _) =
            body_of(ProviderError::NotConfigured("Groq API key is not configured".into()).into())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = body_of(ProviderError::Timeout("slow".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("slow"));
    }

    #[tokio::test]
    async fn domain_errors_map_to_statuses() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (
                AgentError::NotFound("x".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                PatientError::Conflict("p1".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                PatientError::NotFound("p1".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_generic() {
        let (_, body) = body_of(Error::Internal("db password wrong".into()).into()).await;
        assert_eq!(body["detail"], "Internal server error");
    }
}
