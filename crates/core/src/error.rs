//! Unified error types for swcache.
//!
//! Every variant maps to a stable MCP error code so the host binary can
//! surface failures without string matching.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the cache manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Generation name is empty or malformed.
    #[error("INVALID_GENERATION: {0}")]
    InvalidGeneration(String),

    /// Store backend is missing, denied, or the generation does not exist.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// A write into the store failed (quota, serialization, vanished generation).
    #[error("STORE_WRITE_FAILED: {0}")]
    StoreWriteFailed(String),

    /// The network could not produce a response.
    #[error("NETWORK_FAILED: {0}")]
    NetworkFailed(String),

    /// Response body exceeded the configured size limit.
    #[error("RESPONSE_TOO_LARGE: {0}")]
    ResponseTooLarge(String),

    /// Activation requested before a generation finished installing.
    #[error("NOT_INSTALLED: {0}")]
    NotInstalled(String),

    /// Host sent a message command the worker does not understand.
    #[error("UNKNOWN_COMMAND: {0}")]
    UnknownCommand(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::InvalidGeneration(msg) => (-32004, msg.clone()),
            Error::StoreUnavailable(msg) => (-32001, msg.clone()),
            Error::StoreWriteFailed(msg) => (-32005, msg.clone()),
            Error::NetworkFailed(msg) => (-32008, msg.clone()),
            Error::ResponseTooLarge(msg) => (-32007, msg.clone()),
            Error::NotInstalled(msg) => (-32009, msg.clone()),
            Error::UnknownCommand(msg) => (-32010, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
