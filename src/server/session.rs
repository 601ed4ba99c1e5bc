//! Per-connection request/response processing.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::cache::CacheManager;
use crate::parser::{decode_body, parse_request, Error as ParserError};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::Handler;
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::shutdown::ShutdownSignal;
use crate::server::writer::{RequestMeta, ResponseWriter};

/// Run `fut` unless it outlives `timeout` or shutdown is triggered first.
async fn guarded<T, E, F>(shutdown: &mut ShutdownSignal, timeout: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, E>>,
    Error: From<E>,
{
    tokio::select! {
        biased;
        _ = shutdown.recv() => Err(Error::Shutdown),
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(inner) => inner.map_err(Error::from),
            Err(_) => Err(Error::Timeout(timeout)),
        },
    }
}

/// One connection's processing context.
///
/// Each call to [`execute`](Self::execute) handles exactly one request:
/// read the request line and headers, decode the body, hand the request to
/// the handler and write its response. Temporary files created while
/// decoding are released before `execute` returns, whatever the outcome.
pub struct Session<S> {
    stream: BufReader<S>,
    remote_addr: Option<SocketAddr>,
    secure: bool,
    config: Arc<ServerConfig>,
    handler: Arc<dyn Handler>,
    cache: CacheManager,
    shutdown: ShutdownSignal,
    writer: ResponseWriter,
    served: u64,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        remote_addr: Option<SocketAddr>,
        secure: bool,
        config: Arc<ServerConfig>,
        handler: Arc<dyn Handler>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            stream: BufReader::with_capacity(config.read_buffer_size, stream),
            remote_addr,
            secure,
            cache: config.cache_manager(),
            writer: ResponseWriter::new(config.read_buffer_size),
            config,
            handler,
            shutdown,
            served: 0,
        }
    }

    /// Number of responses written so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Items currently held in temporary storage.
    pub fn cached_items(&self) -> usize {
        self.cache.len()
    }

    /// Process one request/response cycle.
    ///
    /// Returns `Ok(true)` when the connection should be kept open for another
    /// request, `Ok(false)` when it should be closed. Errors are transport
    /// faults, timeouts or shutdown; no response has been written for them.
    pub async fn execute(&mut self) -> Result<bool, Error> {
        let outcome = self.cycle().await;
        self.cache.clear();
        outcome
    }

    /// Process requests until the connection closes.
    pub async fn run(mut self) -> Result<u64, Error> {
        while self.execute().await? {}
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!("Error closing connection: {e}");
        }
        Ok(self.served)
    }

    async fn cycle(&mut self) -> Result<bool, Error> {
        if self.shutdown.is_triggered() {
            return Err(Error::Shutdown);
        }

        let head = match self.read_head().await {
            Ok(Some(head)) => head,
            Ok(None) => return Ok(false),
            Err(Error::ParseError(e)) => {
                warn!("Rejecting request from {:?}: {e}", self.remote_addr);
                return self.reject(StatusCode::BadRequest, &e.to_string()).await;
            }
            Err(e) => return Err(e),
        };

        let mut request = match parse_request(&head) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejecting request from {:?}: {e}", self.remote_addr);
                return self.reject(StatusCode::BadRequest, &e.to_string()).await;
            }
        };
        request.remote_addr = self.remote_addr;
        request.secure = self.secure;
        debug!("{} {} from {:?}", request.method, request.raw_uri, self.remote_addr);

        let limits = self.config.body_limits();
        let decoded = guarded(
            &mut self.shutdown,
            self.config.read_timeout,
            decode_body(&request.headers, &mut self.stream, &mut self.cache, &limits),
        )
        .await;
        request.body = match decoded {
            Ok(body) => body,
            Err(Error::Body(e)) => match e.status() {
                Some(status) => {
                    warn!("Rejecting request body from {:?}: {e}", self.remote_addr);
                    return self.reject(status, &e.to_string()).await;
                }
                None => return Err(Error::Body(e)),
            },
            Err(e) => return Err(e),
        };

        let meta = RequestMeta::from_request(&request);
        let response = match self.handler.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Handler failed: {e}");
                HttpResponse::new(StatusCode::InternalServerError)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Internal server error: {e}"))
                    .with_keep_alive(false)
            }
        };

        let keep_alive = guarded(
            &mut self.shutdown,
            self.config.read_timeout,
            self.writer.write(response, &meta, &mut self.stream),
        )
        .await?;
        self.served += 1;
        Ok(keep_alive)
    }

    /// Answer with an error status and close.
    async fn reject(&mut self, status: StatusCode, message: &str) -> Result<bool, Error> {
        let response = HttpResponse::new(status)
            .with_content_type("text/plain")
            .with_body_string(format!("{}: {message}", status.reason_phrase().to_uppercase()))
            .with_keep_alive(false);
        guarded(
            &mut self.shutdown,
            self.config.read_timeout,
            self.writer.write(response, &RequestMeta::closing(), &mut self.stream),
        )
        .await?;
        self.served += 1;
        Ok(false)
    }

    /// Read the request line and header block, up to and including the empty
    /// line. `None` when the peer closed the connection between requests.
    async fn read_head(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let limit = self.config.max_header_size;
        let mut head = Vec::with_capacity(512);

        loop {
            let timeout = if head.is_empty() {
                self.config.idle_timeout
            } else {
                self.config.read_timeout
            };
            let remaining = (limit.saturating_sub(head.len()) + 1) as u64;
            let mut line = Vec::new();
            let n = guarded(
                &mut self.shutdown,
                timeout,
                (&mut self.stream).take(remaining).read_until(b'\n', &mut line),
            )
            .await?;

            if n == 0 {
                if head.is_empty() {
                    return Ok(None);
                }
                return Err(Error::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside request head",
                )));
            }
            if line.last() != Some(&b'\n') {
                if n as u64 >= remaining {
                    return Err(Error::ParseError(ParserError::HeaderTooLarge(limit)));
                }
                return Err(Error::IoError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside request head",
                )));
            }

            let blank = line == b"\r\n" || line == b"\n";
            if blank && head.is_empty() {
                continue;
            }
            head.extend_from_slice(&line);
            if blank {
                return Ok(Some(head));
            }
            if head.len() >= limit {
                return Err(Error::ParseError(ParserError::HeaderTooLarge(limit)));
            }
        }
    }
}
