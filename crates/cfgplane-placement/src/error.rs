//! Placement error types

use cfgplane_types::{ConfigKind, Error};
use std::time::Duration;
use thiserror::Error;

/// Node registry failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Error::Internal(err.to_string())
    }
}

/// Command channel failures
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Queue rejected command with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// Reply channel failures. Each one drops the reply.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Malformed reply: {0}")]
    Decode(String),

    #[error("Could not map status: {0}")]
    UnknownStatus(String),

    #[error("Reply for {actual} config delivered to the {expected} endpoint")]
    KindMismatch {
        expected: ConfigKind,
        actual: ConfigKind,
    },

    #[error(transparent)]
    Update(#[from] Error),
}
