//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::parser::HttpRequest;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::{from_fn, Handler};
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::session::Session;
use crate::server::shutdown::{Shutdown, ShutdownSignal};
use crate::server::writer::{RequestMeta, ResponseWriter};

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: Arc<ServerConfig>,
    /// The application handler every request is dispatched to.
    pub handler: Arc<dyn Handler>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server dispatching to a closure.
    pub fn new<F, Fut>(config: ServerConfig, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::with_handler(config, from_fn(handler))
    }

    /// Create a new HTTP server dispatching to any [`Handler`].
    pub fn with_handler(config: ServerConfig, handler: Arc<dyn Handler>) -> Self {
        Self {
            config: Arc::new(config),
            handler,
            shutdown: Shutdown::new(),
        }
    }

    /// A handle that stops the server when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve one already accepted connection until it closes.
    ///
    /// `secure` tells handlers whether the stream is TLS-wrapped; the
    /// handshake itself happens before this call.
    pub async fn serve_connection<S>(
        stream: S,
        remote_addr: Option<SocketAddr>,
        secure: bool,
        config: Arc<ServerConfig>,
        handler: Arc<dyn Handler>,
        shutdown: ShutdownSignal,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let session = Session::new(stream, remote_addr, secure, config, handler, shutdown);
        let served = session.run().await?;
        debug!("Connection from {remote_addr:?} closed after {served} requests");
        Ok(())
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown: Shutdown, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            let mut signal = shutdown.subscribe();
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received Ctrl+C, initiating graceful shutdown");
                        shutdown.trigger();
                    }
                    Err(e) => {
                        error!("Error setting up Ctrl+C handler: {e}");
                    }
                },
                _ = signal.recv() => {}
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        &self,
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later")
                    .with_keep_alive(false);
                let writer = ResponseWriter::new(self.config.read_buffer_size);
                if let Err(e) = writer.write(response, &RequestMeta::closing(), &mut socket).await {
                    debug!("Error rejecting connection from {addr}: {e}");
                }
                return;
            }
        };

        let config = self.config.clone();
        let handler = self.handler.clone();
        let shutdown = self.shutdown.subscribe();

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            match Self::serve_connection(socket, Some(addr), false, config, handler, shutdown).await {
                Ok(()) => {}
                Err(e) if e.is_connection_fault() => debug!("Connection from {addr} ended: {e}"),
                Err(e) => error!("Error handling connection from {addr}: {e}"),
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        // If there's a critical error, signal to break the loop
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(&self, tasks: &mut JoinSet<()>) {
        // Blocked session reads fail as soon as the signal is set
        self.shutdown.trigger();

        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {len} connections still open after {shutdown_timeout:?}", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.setup_listener().await?;
        self.serve(listener).await
    }

    /// Accept connections from `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        // Create a semaphore to limit concurrent connections
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        // Use JoinSet to keep track of all spawned tasks
        let mut tasks = JoinSet::new();
        let mut shutdown = self.shutdown.subscribe();

        Self::setup_ctrl_c_handler(self.shutdown.clone(), &mut tasks);

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                // Reap finished connection tasks so the set only holds live ones
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            debug!("Accepted connection from {addr}");
                            self.handle_new_connection(socket, addr, semaphore.clone(), &mut tasks).await;
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.perform_shutdown(&mut tasks).await;

        Ok(())
    }
}
