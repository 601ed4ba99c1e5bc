//! HTTP parser module.
//!
//! Request line and header parsing, plus the body decoder that turns
//! url-encoded, multipart, raw and chunked bodies into a [`Body`].

mod body;
mod chunked;
mod content_type;
mod decoder;
mod error;
mod form;
mod method;
mod multipart;
mod request;
mod spool;
mod tests;
mod version;

// Re-export public items
pub use body::{Body, BodyPart, BodyValue, RAW_FIELD};
pub use chunked::parse_chunk_size;
pub use content_type::{ContentType, MULTIPART_FORM_DATA, URL_ENCODED};
pub use decoder::{decode_body, BodyLimits};
pub use error::{BodyError, Error};
pub use form::{decode_parameters, decode_percent, Params};
pub use method::Method;
pub use request::{parse_request, HttpRequest};
pub use version::HttpVersion;
