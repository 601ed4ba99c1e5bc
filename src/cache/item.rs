//! A single temporary byte sink.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::cache::error::CacheError;

/// Handle to a file-backed item allocated by a [`CacheManager`](crate::cache::CacheManager).
///
/// The handle does not own the file; the manager that created it deletes
/// the file when it is cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    name: String,
    path: PathBuf,
}

impl CacheItem {
    pub(crate) fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// The name hint the item was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the item for appending. Callers must flush before dropping the
    /// returned file.
    pub async fn writer(&self) -> Result<File, CacheError> {
        Ok(OpenOptions::new().append(true).open(&self.path).await?)
    }

    /// Append bytes to the item.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), CacheError> {
        let mut file = self.writer().await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Current size in bytes.
    pub async fn size(&self) -> Result<u64, CacheError> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Whole contents as bytes.
    pub async fn as_bytes(&self) -> Result<Vec<u8>, CacheError> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Whole contents as text, replacing invalid UTF-8.
    pub async fn as_string(&self) -> Result<String, CacheError> {
        let bytes = self.as_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// A reader positioned at the start of the contents.
    pub async fn as_stream(&self) -> Result<File, CacheError> {
        Ok(File::open(&self.path).await?)
    }
}
