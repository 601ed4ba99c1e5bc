//! Error types for temporary storage.

use thiserror::Error;

/// Errors raised while allocating or using a cache item.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing temporary file could not be created.
    #[error("Cannot allocate temporary storage in {dir}: {source}")]
    Allocate {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing an allocated item failed.
    #[error("Temporary storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
