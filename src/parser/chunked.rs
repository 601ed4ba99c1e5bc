//! Decoding of the `chunked` transfer-coding.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::cache::CacheManager;
use crate::parser::error::BodyError;
use crate::parser::decoder::Sink;

/// Longest accepted chunk-size or trailer line.
const MAX_LINE: u64 = 4096;

/// Parse a chunk-size line, ignoring any `;` extensions.
pub fn parse_chunk_size(line: &str) -> Result<u64, BodyError> {
    let size = line.split(';').next().unwrap_or_default().trim();
    if size.is_empty() {
        return Err(BodyError::MalformedChunk("empty chunk size".to_string()));
    }
    u64::from_str_radix(size, 16)
        .map_err(|_| BodyError::MalformedChunk(format!("invalid chunk size: {size}")))
}

/// Read one line without its terminator. `None` at end of stream.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>, BodyError> {
    let mut line = Vec::new();
    let n = (&mut *reader).take(MAX_LINE).read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        return Err(BodyError::MalformedChunk("unterminated line".to_string()));
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line)
        .map(Some)
        .map_err(|_| BodyError::MalformedChunk("line is not ASCII".to_string()))
}

/// Decode a chunked body from `reader` into `sink`, consuming the trailer
/// block after the last chunk.
pub(crate) async fn read_chunked<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    sink: &mut Sink,
    cache: &mut CacheManager,
) -> Result<(), BodyError> {
    let mut buf = vec![0u8; 8192];

    loop {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| BodyError::MalformedChunk("missing chunk size".to_string()))?;
        let size = parse_chunk_size(&line)?;

        if size == 0 {
            // Trailers are read and dropped; end of stream also ends them.
            while let Some(trailer) = read_line(reader).await? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(());
        }

        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = reader.read(&mut buf[..want]).await?;
            if n == 0 {
                return Err(BodyError::MalformedChunk(format!(
                    "chunk truncated with {remaining} bytes missing"
                )));
            }
            sink.push(&buf[..n], cache).await?;
            remaining -= n as u64;
        }

        match read_line(reader).await? {
            Some(terminator) if terminator.is_empty() => {}
            _ => {
                return Err(BodyError::MalformedChunk(
                    "missing CRLF after chunk data".to_string(),
                ))
            }
        }
    }
}
