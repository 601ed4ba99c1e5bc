//! HTTP server implementation for tinyhttpd-rs.
//!
//! The accept loop hands each connection to a [`Session`], which runs the
//! keep-alive request/response cycle and writes responses through the
//! [`ResponseWriter`].

mod config;
mod cookie;
mod error;
mod handler;
mod http_server;
mod response;
mod session;
mod shutdown;
mod writer;

// Re-export public items
pub use config::ServerConfig;
pub use cookie::{Cookie, CookieHandler};
pub use error::Error;
pub use handler::{from_fn, Handler, HandlerFuture};
pub use http_server::HttpServer;
pub use response::{HttpResponse, ResponseBody, StatusCode};
pub use session::Session;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use writer::{negotiate, write_chunk, write_last_chunk, RequestMeta, ResponseWriter};
