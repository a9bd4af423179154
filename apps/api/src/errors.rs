use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::AiError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resume has no text to optimize: {0}")]
    EmptyContent(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error(transparent)]
    AiService(#[from] AiError),

    #[error("Database error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyContent(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::AiService(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AiService(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::EmptyContent(_) => "EMPTY_RESUME_ERROR",
            AppError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            AppError::AiService(_) => "AI_SERVICE_ERROR",
            AppError::Persistence(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to hand back to the caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::EmptyContent(msg)
            | AppError::RateLimited(msg) => msg.clone(),
            AppError::AiService(e) => e.to_string(),
            AppError::Persistence(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

/// Body that is not JSON, or does not fit the request type.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::AiService(e) => tracing::error!("AI service error: {e}"),
            AppError::Persistence(e) => tracing::error!("Database error: {e}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            _ => {}
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.public_message()
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::BackendError;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let (status, body) = body_of(AppError::Validation("jobId is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "jobId is required");
    }

    #[tokio::test]
    async fn test_empty_content_maps_to_400_with_its_own_code() {
        let (status, body) = body_of(AppError::EmptyContent("Resume is empty".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "EMPTY_RESUME_ERROR");
    }

    #[tokio::test]
    async fn test_transient_ai_error_is_service_unavailable() {
        let err = AiError::Exhausted {
            attempts: 3,
            source: BackendError::RateLimited("quota".into()),
        };
        let (status, body) = body_of(AppError::from(err)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "AI_SERVICE_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("3 attempts"));
    }

    #[tokio::test]
    async fn test_terminal_ai_error_is_bad_gateway() {
        let err = AiError::MalformedResponse("no candidates".into());
        let (status, _) = body_of(AppError::from(err)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_429() {
        let (status, body) = body_of(AppError::RateLimited("Too many requests".into())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["error"]["message"], "Too many requests");
    }

    #[tokio::test]
    async fn test_persistence_hides_details() {
        let err = AppError::from(StoreError::Corrupt("status 'x'".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "A database error occurred");
    }
}
