use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request")]
    Validation(HashMap<String, String>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("not permitted")]
    Forbidden,

    #[error("operation timed out")]
    Timeout,

    #[error("storage error")]
    Database(#[from] sqlx::Error),

    #[error("session error")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    /// Validation failure for a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(HashMap::from([(field.to_string(), message.into())]))
    }

    /// Maps `RowNotFound` from a targeted lookup to `NotFound(entity)`.
    pub fn or_not_found(entity: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
        move |e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound(entity),
            other => AppError::Database(other),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Timeout => "timeout",
            AppError::Database(_) => "storage_error",
            AppError::Session(_) => "session_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Validation(fields) => json!(fields),
            AppError::Database(e) => json!(e.to_string()),
            AppError::Session(e) => json!(e.to_string()),
            _ => Value::Null,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {e}"),
            AppError::Session(e) => tracing::error!("Session error: {e}"),
            AppError::Timeout => tracing::error!("Transaction exceeded its time bound"),
            _ => {}
        }

        let body = json!({
            "error": self.reason(),
            "message": self.to_string(),
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::invalid("body", e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::invalid("query", e.body_text())
    }
}

/// Parses a numeric path id, reporting the offending parameter on failure.
pub fn parse_id(field: &str, raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid(field, format!("'{raw}' is not a valid id")))
}
