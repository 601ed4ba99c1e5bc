//! An embeddable HTTP/1.1 server engine.
//!
//! This library turns raw byte streams from TCP (or TLS-wrapped) connections
//! into request/response exchanges, without delegating parsing to an
//! existing HTTP stack.
//!
//! # Features
//!
//! - Request line and header parsing with case-insensitive header lookup
//! - Body decoding for url-encoded forms, multipart/form-data uploads, raw
//!   payloads and the chunked transfer-coding
//! - Temporary file storage for large uploads, released after every request
//! - Fixed-length, chunked and gzip-compressed responses
//! - Conditional (`If-None-Match`) and byte-range requests
//! - `Cookie` parsing and `Set-Cookie` generation
//! - Keep-alive connections with idle timeouts and prompt shutdown
//!
//! # Examples
//!
//! ## Parsing a request head
//!
//! ```
//! use tinyhttpd::{parse_request, Method};
//!
//! let head = b"POST /search?q=rust+async&page=2 HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n";
//! let request = parse_request(head).unwrap();
//!
//! assert_eq!(request.method, Method::POST);
//! assert_eq!(request.get_query_param("q"), Some("rust async"));
//! assert_eq!(request.get_header("Content-Type").map(String::as_str), Some("text/plain"));
//! ```
//!
//! Unknown method tokens are rejected:
//!
//! ```
//! use tinyhttpd::{parse_request, ParserError};
//!
//! let result = parse_request(b"FETCH / HTTP/1.1\r\n\r\n");
//! assert!(matches!(result, Err(ParserError::InvalidMethod(token)) if token == "FETCH"));
//! ```
//!
//! ## Decoding a body
//!
//! ```
//! use std::collections::HashMap;
//!
//! use tinyhttpd::parser::{decode_body, BodyLimits};
//! use tinyhttpd::CacheManager;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tinyhttpd::parser::BodyError> {
//! let mut headers = HashMap::new();
//! headers.insert("content-type".to_string(), "application/x-www-form-urlencoded".to_string());
//! headers.insert("transfer-encoding".to_string(), "chunked".to_string());
//!
//! let mut wire: &[u8] = b"7\r\nname=Ad\r\n1\r\na\r\n0\r\n\r\n";
//! let mut cache = CacheManager::in_temp_dir();
//! let body = decode_body(&headers, &mut wire, &mut cache, &BodyLimits::default()).await?;
//!
//! assert_eq!(body.text("name"), Some("Ada"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use tinyhttpd::{HttpRequest, HttpResponse, HttpServer, ServerConfig, StatusCode};
//!
//! # async fn run() -> Result<(), tinyhttpd::ServerError> {
//! let server = HttpServer::new(ServerConfig::default(), |req: HttpRequest| async move {
//!     Ok(HttpResponse::new(StatusCode::Ok)
//!         .with_content_type("text/plain")
//!         .with_body_string(format!("Hello from {}", req.path)))
//! });
//! server.start().await
//! # }
//! ```
//!
//! See the `demos` directory for complete programs.

pub mod cache;
pub mod parser;
pub mod server;

// Re-export commonly used items for convenience
pub use cache::{CacheItem, CacheManager};
pub use parser::{parse_request, Body, BodyPart, BodyValue, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use server::{
    Cookie, CookieHandler, Error as ServerError, HttpResponse, HttpServer, ServerConfig, Session, Shutdown,
    StatusCode,
};
