//! Mapping of service failures onto HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use protocol::Rejection;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The download pipeline refused the request.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Rejected(rejection) => {
                warn!(reason = ?rejection, status = rejection.status_code(), "Request rejected");
                let status =
                    StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::NOT_FOUND);
                (status, rejection.to_string())
            }
            ApiError::Internal(message) => {
                error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
