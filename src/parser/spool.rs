//! Accumulates body bytes in memory, moving them to a cache item once a
//! threshold is crossed.

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cache::{CacheError, CacheItem, CacheManager};
use crate::parser::error::BodyError;

/// Where a spooled body ended up.
#[derive(Debug)]
pub(crate) enum Spooled {
    Memory(Vec<u8>),
    File(CacheItem),
}

pub(crate) struct Spool {
    name: &'static str,
    buf: Vec<u8>,
    file: Option<(CacheItem, File)>,
    len: u64,
    /// `None` keeps everything in memory.
    spill_at: Option<u64>,
    limit: u64,
}

impl Spool {
    pub(crate) fn new(name: &'static str, spill_at: Option<u64>, limit: u64) -> Self {
        Self {
            name,
            buf: Vec::new(),
            file: None,
            len: 0,
            spill_at,
            limit,
        }
    }

    pub(crate) async fn push(&mut self, data: &[u8], cache: &mut CacheManager) -> Result<(), BodyError> {
        self.len += data.len() as u64;
        if self.len > self.limit {
            return Err(BodyError::TooLarge(self.limit));
        }

        if let Some((_, file)) = self.file.as_mut() {
            file.write_all(data).await.map_err(CacheError::from)?;
            return Ok(());
        }

        self.buf.extend_from_slice(data);
        match self.spill_at {
            Some(threshold) if self.len > threshold => {
                let item = cache.create(self.name)?;
                let mut file = item.writer().await?;
                file.write_all(&self.buf).await.map_err(CacheError::from)?;
                self.buf = Vec::new();
                self.file = Some((item, file));
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) async fn finish(self) -> Result<Spooled, BodyError> {
        match self.file {
            Some((item, mut file)) => {
                file.flush().await.map_err(CacheError::from)?;
                Ok(Spooled::File(item))
            }
            None => Ok(Spooled::Memory(self.buf)),
        }
    }
}
