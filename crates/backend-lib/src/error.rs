// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
//!
//! The variants mirror how failures are handled, not where they come from:
//! `Network` degrades to cached data, `Authorization` tears the session
//! down, `Schema` degrades to synthesized data, `Conflict` is retried with
//! a re-read, `RateLimited` is rejected before the backend is contacted.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication rate limit exceeded")]
    RateLimited,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Authorization(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Network(_) => "NET_001",
            AppError::Authorization(_) => "AUTH_001",
            AppError::Schema(_) => "SCHEMA_001",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::RateLimited => "RATE_001",
            AppError::Auth(_) => "AUTH_002",
            AppError::NotFound(_) => "NF_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(_) => "Invalid email or password".to_string(),
            AppError::Authorization(_) => "Session expired, please sign in again".to_string(),
            AppError::RateLimited => {
                "Too many attempts, please try again later".to_string()
            },
            AppError::Network(_) => "Service temporarily unreachable".to_string(),
            AppError::Schema(_) => "An internal server error occurred".to_string(),
            AppError::Conflict(_) => "Resource already exists".to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Io(_) => "Internal server error".to_string(),
            AppError::Json(_) => "Invalid request format".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        // Create a JSON response with error details
        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures are transient by definition; anything
        // that got an HTTP response is classified at the call site.
        AppError::Network(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
