//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use statement::{RenderError, StatementError};

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("statement not available")]
    NotFound,

    #[error("statement rendering timed out")]
    Timeout,

    /// Details are logged, never sent to the client
    #[error("{0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "statement not available";

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<StatementError> for AppError {
    fn from(err: StatementError) -> Self {
        match err {
            StatementError::InputNotFound(_) => AppError::NotFound,
            StatementError::Render(RenderError::Cancelled) => AppError::Timeout,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "statement request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse { error, message };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Timeout.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_stay_out_of_the_body() {
        let err = AppError::from(StatementError::Render(RenderError::Font(
            "/srv/fonts/mono.ttf: No such file or directory".into(),
        )));
        let body = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("statement not available"));
        assert!(text.contains("internal_error"));
        assert!(!text.contains("/srv/fonts"));
    }

    #[test]
    fn test_statement_errors_map_to_app_errors() {
        let missing = StatementError::InputNotFound(PathBuf::from("a.TXT"));
        assert!(matches!(AppError::from(missing), AppError::NotFound));

        let cancelled = StatementError::Render(RenderError::Cancelled);
        assert!(matches!(AppError::from(cancelled), AppError::Timeout));

        let font = StatementError::Render(RenderError::Font("mono.ttf".into()));
        assert!(matches!(AppError::from(font), AppError::Internal(_)));
    }
}
