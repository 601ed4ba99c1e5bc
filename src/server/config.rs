//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheManager;
use crate::parser::BodyLimits;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// How long a keep-alive connection may wait for its next request line.
    pub idle_timeout: Duration,
    /// Bound on reading the rest of a request and writing its response.
    pub read_timeout: Duration,
    /// Largest accepted request line plus header block, in bytes.
    pub max_header_size: usize,
    /// Raw bodies above this many bytes are moved to temporary storage.
    pub memory_store_limit: u64,
    /// Bodies above this many bytes are rejected with 413.
    pub max_body_size: u64,
    /// Directory for temporary body storage; the system temp dir if unset.
    pub cache_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn body_limits(&self) -> BodyLimits {
        BodyLimits {
            memory_store_limit: self.memory_store_limit,
            max_body_size: self.max_body_size,
        }
    }

    /// A fresh cache manager for one session.
    pub fn cache_manager(&self) -> CacheManager {
        match &self.cache_dir {
            Some(dir) => CacheManager::new(dir.clone()),
            None => CacheManager::in_temp_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = BodyLimits::default();
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            idle_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            max_header_size: 8192,
            memory_store_limit: limits.memory_store_limit,
            max_body_size: limits.max_body_size,
            cache_dir: None,
        }
    }
}
