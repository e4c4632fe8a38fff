//! Error types for the widget service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// SQLSTATE raised when a statement is cancelled by `statement_timeout`.
pub const SQLSTATE_QUERY_CANCELED: &str = "57014";

// == Backend Error Enum ==
/// Failures reported by the query backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The statement exceeded its timeout and was cancelled
    #[error("statement timed out")]
    StatementTimeout,

    /// No connection could be obtained
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The statement failed for any other reason
    #[error("query failed: {0}")]
    Query(String),
}

impl BackendError {
    /// Whether this failure is a statement timeout, which cheaper parameters
    /// may avoid.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::StatementTimeout)
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(SQLSTATE_QUERY_CANCELED) =>
            {
                BackendError::StatementTimeout
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                BackendError::Unavailable(err.to_string())
            }
            _ => BackendError::Query(err.to_string()),
        }
    }
}

// == Service Error Enum ==
/// Unified error type for the widget service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The page segment does not name a known page
    #[error("Unsupported page: {0}")]
    UnknownPage(String),

    /// The page exists but has no such widget
    #[error("Unsupported widget: {page}/{widget}")]
    UnknownWidget { page: String, widget: String },

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidParams(String),

    /// Backend failure while computing a widget
    #[error(transparent)]
    Backend(#[from] BackendError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::UnknownPage(_) | ServiceError::UnknownWidget { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ServiceError::Backend(BackendError::StatementTimeout) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            ServiceError::Backend(err) => format!("Widget query failed: {err}"),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the widget service.
pub type Result<T> = std::result::Result<T, ServiceError>;
