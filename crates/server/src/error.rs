// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use facts_jobs::LaunchError;
use facts_pipeline::PipelineError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LaunchError> for ApiError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            LaunchError::Spawn(msg) => ApiError::Internal(msg),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::JobNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Pipeline(PipelineError::DirectoryNotFound { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::JobNotFound(id) => ErrorResponse::with_details("Job not found", format!("Job ID: {id}")),
            ApiError::BadRequest(msg) => ErrorResponse::with_details("Bad request", msg.clone()),
            ApiError::Conflict(msg) => ErrorResponse::with_details("Conflict", msg.clone()),
            ApiError::Pipeline(err) => ErrorResponse::with_details("Pipeline error", err.to_string()),
            // Logged by into_response; the client gets the bare message.
            ApiError::Internal(_) => ErrorResponse::new("Internal server error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use facts_jobs::JobKind;

    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_job_not_found_returns_404() {
        let response = ApiError::JobNotFound("abc123".to_string()).into_response();
        let (status, body) = extract_response(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Job not found");
        assert!(body.details.unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_already_running_returns_409() {
        let err: ApiError = LaunchError::AlreadyRunning(JobKind::Extraction).into();
        let (status, body) = extract_response(err.into_response()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.details.as_deref(), Some("extraction job is already running"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::Internal("secret path".into()).into_response();
        let (status, body) = extract_response(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_client_error() {
        let err = ApiError::from(PipelineError::DirectoryNotFound {
            path: "/srv/downloads/none".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let (_, body) = extract_response(err.into_response()).await;
        assert_eq!(body.error, "Pipeline error");
        assert!(body.details.unwrap().contains("/srv/downloads/none"));
        assert_eq!(
            ApiError::from(PipelineError::NoTexts).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_bad_request_returns_400() {
        let response = ApiError::BadRequest("questions must not be empty".into()).into_response();
        let (status, body) = extract_response(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.details.as_deref(), Some("questions must not be empty"));
    }
}
