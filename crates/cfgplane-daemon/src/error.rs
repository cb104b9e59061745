//! Error types for cfgplaned

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cfgplane_placement::ReplyError;
use cfgplane_types::{Error, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller lacks a permission
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::VersionExists | ErrorKind::AlreadyResolved => ApiError::Conflict(message),
            ErrorKind::Unauthorized => ApiError::Forbidden(message),
            ErrorKind::SchemaInvalid => ApiError::BadRequest(message),
            ErrorKind::MarshalFailure | ErrorKind::Db | ErrorKind::Internal => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<ReplyError> for ApiError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::Update(e) => e.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        assert_eq!(status(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(Error::VersionExists("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(Error::Unauthorized("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(Error::SchemaInvalid("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::Marshal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(Error::Db("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(Error::AlreadyResolved {
                task_id: "t".into(),
                status: "Placed".into()
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_reply_errors() {
        let decode = ApiError::from(ReplyError::Decode("eof".into()));
        assert_eq!(decode.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(ReplyError::Update(Error::NotFound("t".into())));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
