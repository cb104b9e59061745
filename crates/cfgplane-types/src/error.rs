//! Error taxonomy shared by every cfgplane layer
//!
//! Store- and validation-level errors propagate unchanged from the store up
//! to the service boundary, where each kind maps to one status category.

use thiserror::Error;

/// Category of an [`Error`], independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    VersionExists,
    Unauthorized,
    SchemaInvalid,
    MarshalFailure,
    Db,
    Internal,
    AlreadyResolved,
}

/// Control plane errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version exists: {0}")]
    VersionExists(String),

    #[error("Permission denied: {0}")]
    Unauthorized(String),

    #[error("Schema invalid: {0}")]
    SchemaInvalid(String),

    #[error("Marshal failure: {0}")]
    Marshal(String),

    #[error("Database error: {0}")]
    Db(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Task {task_id} already resolved as {status}")]
    AlreadyResolved { task_id: String, status: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::VersionExists(_) => ErrorKind::VersionExists,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::SchemaInvalid(_) => ErrorKind::SchemaInvalid,
            Error::Marshal(_) => ErrorKind::MarshalFailure,
            Error::Db(_) => ErrorKind::Db,
            Error::Internal(_) => ErrorKind::Internal,
            Error::AlreadyResolved { .. } => ErrorKind::AlreadyResolved,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Marshal(err.to_string())
    }
}

/// Result type for control plane operations
pub type Result<T> = std::result::Result<T, Error>;
