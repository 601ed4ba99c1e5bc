//! Allocation and release of cache items.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{trace, warn};
use tempfile::{Builder, TempPath};

use crate::cache::error::CacheError;
use crate::cache::item::CacheItem;

/// Owns every temporary file created for one session.
///
/// File names are randomized by `tempfile`, so managers of concurrent
/// sessions can share a directory without collisions.
#[derive(Debug)]
pub struct CacheManager {
    dir: PathBuf,
    items: Vec<TempPath>,
}

impl CacheManager {
    /// Create a manager that allocates items inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            items: Vec::new(),
        }
    }

    /// Create a manager backed by the process temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// The directory items are created in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of items allocated since the last [`clear`](Self::clear).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocate a new, empty item.
    pub fn create(&mut self, name_hint: &str) -> Result<CacheItem, CacheError> {
        let prefix = format!("tinyhttpd-{}-", sanitize(name_hint));
        let file = Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|source| CacheError::Allocate {
                dir: self.dir.display().to_string(),
                source,
            })?;

        let path = file.into_temp_path();
        let item = CacheItem::new(name_hint, path.to_path_buf());
        trace!("Allocated cache item {}", path.display());
        self.items.push(path);
        Ok(item)
    }

    /// Delete every item allocated since the last call.
    pub fn clear(&mut self) {
        for path in self.items.drain(..) {
            let display = path.display().to_string();
            match path.close() {
                Ok(()) => trace!("Released cache item {display}"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete cache item {display}: {e}"),
            }
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        self.clear();
    }
}

fn sanitize(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}
