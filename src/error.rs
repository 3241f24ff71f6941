// src/error.rs

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failure of a request to the assessment service.
///
/// Every variant carries the message shown to the caller, except
/// `InternalServerError` whose detail is only logged.
#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    /// Missing, malformed or expired token.
    AuthError(String),
    /// Valid token, insufficient role.
    Forbidden(String),
    NotFound(String),
    /// The attempt is not in a state that allows the request.
    Conflict(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Text placed in the `{"error": ...}` body.
    fn public_message(&self) -> &str {
        match self {
            AppError::InternalServerError(_) => "Internal Server Error",
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "internal error: {}", msg),
            other => write!(f, "{} ({})", other.public_message(), other.status().as_u16()),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::InternalServerError(msg) = &self {
            tracing::error!("Internal Server Error: {}", msg);
        }

        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Lets handlers use `?` on queries. A unique-key clash is a conflict with
/// an existing row, anything else is internal.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Record already exists".to_string())
            }
            _ => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Errors raised while talking to the attempt-lifecycle service.
///
/// These never escape the session controller; they are turned into
/// notifications or, for violation reports, dropped after logging.
#[derive(Debug)]
pub enum SessionError {
    /// The request never produced a response (connection refused, reset...).
    Network(String),

    /// No answer within the configured request timeout.
    Timeout,

    /// The service answered with a non-success status.
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    Decode(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Network(msg) => write!(f, "network error: {}", msg),
            SessionError::Timeout => f.write_str("the service did not answer in time"),
            SessionError::Status { status, message } => {
                write!(f, "request failed with status {}: {}", status, message)
            }
            SessionError::Decode(msg) => write!(f, "unexpected response: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SessionError::Timeout
        } else if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Network(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for SessionError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        SessionError::Timeout
    }
}
