//! HTTP surface over the table service.

pub mod app;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod state;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::core::TableError;

pub use app::build_router;
pub use state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum ApiError {
    Table(TableError),
    Auth(AuthError),
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        ApiError::Table(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Table(TableError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Table(TableError::MissingRequiredField(_)) => {
                (StatusCode::BAD_REQUEST, "missing_required_field")
            }
            ApiError::Table(TableError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Table(TableError::Conflict { .. }) => {
                (StatusCode::CONFLICT, "version_conflict")
            }
            ApiError::Table(TableError::Storage(_) | TableError::LockError(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }

            ApiError::Auth(AuthError::MissingToken) => (StatusCode::UNAUTHORIZED, "token_missing"),
            ApiError::Auth(AuthError::InvalidToken) => (StatusCode::FORBIDDEN, "invalid_token"),
            ApiError::Auth(AuthError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials")
            }
            ApiError::Auth(AuthError::EmailTaken(_)) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Auth(AuthError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Auth(AuthError::Internal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            ApiError::Table(err) => err.to_string(),
            ApiError::Auth(err) => err.to_string(),
        };
        if status.is_server_error() {
            error!(error = %message, "request failed");
        }

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
