//! The boundary between the session engine and the application.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Turns a fully decoded request into a response.
///
/// Routing lives behind this trait. Any `Fn(HttpRequest) -> impl Future`
/// closure is a handler.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: HttpRequest) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    fn handle(&self, request: HttpRequest) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// Wrap a closure as a shareable handler.
///
/// The direct `Fn` bounds let closures return `Ok(response)` without naming
/// the error type.
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(f)
}
