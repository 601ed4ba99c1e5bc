//! Error types for the HTTP parser.

use thiserror::Error;

use crate::cache::CacheError;
use crate::server::StatusCode;

/// Errors that can occur while parsing a request line or header block.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request URI is missing.
    #[error("Missing URI in request line")]
    InvalidPath,

    /// The request line is malformed (wrong format or too many components).
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header in the request has an invalid format.
    #[error("Invalid header format: {0}")]
    InvalidHeaderFormat(String),

    /// The header block exceeded the configured size limit.
    #[error("Request header block exceeds {0} bytes")]
    HeaderTooLarge(usize),

    /// The request is empty.
    #[error("Empty request")]
    EmptyRequest,

    /// Error parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A file-backed body could not be read back.
    #[error("Cannot read request body: {0}")]
    Cache(#[from] CacheError),
}

/// Errors that can occur while decoding a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// `multipart/form-data` without a usable boundary parameter.
    #[error("Content type is multipart/form-data but boundary is missing")]
    MissingBoundary,

    /// The multipart stream does not follow the boundary grammar.
    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// A chunk-size line or chunk terminator is invalid.
    #[error("Malformed chunked encoding: {0}")]
    MalformedChunk(String),

    /// A transfer-coding other than `chunked` or `identity`.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// The `Content-Length` header is not a number.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// The stream ended before the declared body was read.
    #[error("Body truncated: expected {expected} bytes, received {received}")]
    Truncated {
        /// Declared length.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The body exceeds the configured size limit.
    #[error("Body exceeds the {0} byte limit")]
    TooLarge(u64),

    /// Temporary storage for a body part could not be used.
    #[error("Temporary storage error: {0}")]
    Cache(#[from] CacheError),

    /// Transport failure while reading the body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BodyError {
    /// The status to answer with, or `None` when the connection is broken
    /// and no response can be written.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BodyError::MissingBoundary
            | BodyError::MalformedMultipart(_)
            | BodyError::MalformedChunk(_)
            | BodyError::UnsupportedTransferEncoding(_)
            | BodyError::InvalidContentLength(_)
            | BodyError::Truncated { .. } => Some(StatusCode::BadRequest),
            BodyError::TooLarge(_) => Some(StatusCode::PayloadTooLarge),
            BodyError::Cache(_) => Some(StatusCode::InternalServerError),
            BodyError::Io(_) => None,
        }
    }
}
