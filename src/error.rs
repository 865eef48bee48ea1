//! Error type shared by every service and the single place errors become HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One violated constraint of a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violations. Answered as 400, not 409.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// A write rejected by a unique constraint. Repositories return it inside `anyhow::Error` so
/// services can answer a lost race the same way as a failed pre-check.
#[derive(Error, Debug)]
#[error("unique constraint `{constraint}` violated")]
pub struct UniqueViolation {
    pub constraint: String,
}

impl UniqueViolation {
    pub fn new(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
        }
    }
}

/// Converts a sqlx error, tagging unique-constraint violations as [`UniqueViolation`].
pub fn db_error(e: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return UniqueViolation::new(db.constraint().unwrap_or("unknown")).into();
        }
    }
    e.into()
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    /// Repository failure where a [`UniqueViolation`] becomes `conflict(message)`.
    pub fn unique_or_internal(e: anyhow::Error, message: &str) -> Self {
        if e.is::<UniqueViolation>() {
            AppError::conflict(message)
        } else {
            AppError::Internal(e)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(fields) => json!({ "errors": fields }),
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "unhandled error");
                json!({ "errors": "Internal server error" })
            }
            other => json!({ "errors": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
