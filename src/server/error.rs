//! Error types for the HTTP server.

use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::parser::{BodyError, Error as ParserError};

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// Error decoding a request body.
    #[error("Body error: {0}")]
    Body(#[from] BodyError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A read or write did not finish in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The server is shutting down.
    #[error("Server is shutting down")]
    Shutdown,

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// Temporary storage could not be read or written.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error ends the connection without any response.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            Error::IoError(_) | Error::Timeout(_) | Error::Shutdown | Error::Body(BodyError::Io(_))
        )
    }
}
