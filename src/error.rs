use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use common::ErrorResponse;
use compute::ComputeError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by handlers and the role guard.
#[derive(Debug, Error)]
pub enum AppError {
    /// No live session. Answered with a redirect to the login page.
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Compute(#[from] ComputeError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthenticated => (StatusCode::SEE_OTHER, "UNAUTHENTICATED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Compute(e) => match e {
                ComputeError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ComputeError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                ComputeError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                ComputeError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                ComputeError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                }
                ComputeError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
                }
                ComputeError::PasswordHash(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthenticated = self {
            return Redirect::to("/login").into_response();
        }

        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            warn!("Request rejected with {}: {}", status, self);
            self.to_string()
        };

        (status, Json(ErrorResponse::new(message, code))).into_response()
    }
}
