//! `multipart/form-data` decoding.
//!
//! The body is fed in as it arrives off the wire. File parts are written to
//! cache items while they stream, so only a delimiter's worth of bytes is
//! held back at any time.

use std::collections::HashMap;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cache::{CacheError, CacheItem, CacheManager};
use crate::parser::body::{Body, BodyPart, BodyValue};
use crate::parser::error::BodyError;

/// Largest accepted header block of a single part.
const MAX_PART_HEADER_SIZE: usize = 8192;

fn malformed(reason: impl Into<String>) -> BodyError {
    BodyError::MalformedMultipart(reason.into())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Parse a part's header block. Returns the headers (lower-cased names) and
/// the offset of the first content byte, or `None` while the block is still
/// incomplete.
fn parse_part_headers(data: &[u8]) -> Result<Option<(HashMap<String, String>, usize)>, BodyError> {
    let mut headers = HashMap::new();
    let mut offset = 0;

    loop {
        let Some(newline) = data[offset..].iter().position(|b| *b == b'\n') else {
            if data.len() > MAX_PART_HEADER_SIZE {
                return Err(malformed("part header block is too large"));
            }
            return Ok(None);
        };

        let mut line = &data[offset..offset + newline];
        offset += newline + 1;
        if offset > MAX_PART_HEADER_SIZE {
            return Err(malformed("part header block is too large"));
        }
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if line.is_empty() {
            return Ok(Some((headers, offset)));
        }

        let line = String::from_utf8_lossy(line);
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(format!("invalid part header: {line}")))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }
}

/// Split `form-data; name="a"; filename="b;c.txt"` into its parameters,
/// honouring quotes.
fn disposition_params(value: &str) -> HashMap<String, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .iter()
        .filter_map(|segment| segment.split_once('='))
        .map(|(name, value)| {
            (
                name.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .collect()
}

enum Target {
    Text(Vec<u8>),
    File(CacheItem, File),
}

/// The part whose content is currently streaming.
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    target: Target,
}

impl Part {
    async fn open(headers: &HashMap<String, String>, cache: &mut CacheManager) -> Result<Self, BodyError> {
        let disposition = headers
            .get("content-disposition")
            .ok_or_else(|| malformed("part without Content-Disposition"))?;
        let mut params = disposition_params(disposition);
        let name = params
            .remove("name")
            .ok_or_else(|| malformed("part without a field name"))?;
        let filename = params.remove("filename");

        let target = match &filename {
            Some(_) => {
                let item = cache.create(&name)?;
                let file = item.writer().await?;
                Target::File(item, file)
            }
            None => Target::Text(Vec::new()),
        };

        Ok(Self {
            name,
            filename,
            content_type: headers.get("content-type").cloned(),
            target,
        })
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), BodyError> {
        if data.is_empty() {
            return Ok(());
        }
        match &mut self.target {
            Target::Text(text) => text.extend_from_slice(data),
            Target::File(_, file) => file.write_all(data).await.map_err(CacheError::from)?,
        }
        Ok(())
    }

    async fn close(self, body: &mut Body) -> Result<(), BodyError> {
        let value = match self.target {
            Target::Text(text) => BodyValue::Text(String::from_utf8_lossy(&text).into_owned()),
            Target::File(item, mut file) => {
                file.flush().await.map_err(CacheError::from)?;
                BodyValue::File(item)
            }
        };
        body.insert(
            self.name,
            BodyPart {
                value,
                content_type: self.content_type,
                filename: self.filename,
            },
        );
        Ok(())
    }
}

enum State {
    Preamble,
    AfterDelimiter,
    Headers,
    Content(Part),
    Done,
}

/// Incremental `multipart/form-data` decoder.
///
/// A delimiter only counts when it follows a CRLF, so content may contain
/// `--boundary` after a bare LF.
pub(crate) struct MultipartParser {
    delimiter: Vec<u8>,
    buf: Vec<u8>,
    state: State,
    body: Body,
    len: u64,
    limit: u64,
}

impl MultipartParser {
    pub(crate) fn new(boundary: &str, limit: u64) -> Self {
        Self {
            delimiter: format!("\r\n--{boundary}").into_bytes(),
            // Lets a boundary on the very first line match like any other
            buf: b"\r\n".to_vec(),
            state: State::Preamble,
            body: Body::new(),
            len: 0,
            limit,
        }
    }

    /// Bytes held back waiting for more input.
    pub(crate) fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub(crate) async fn push(&mut self, data: &[u8], cache: &mut CacheManager) -> Result<(), BodyError> {
        self.len += data.len() as u64;
        if self.len > self.limit {
            return Err(BodyError::TooLarge(self.limit));
        }
        if matches!(self.state, State::Done) {
            return Ok(());
        }
        self.buf.extend_from_slice(data);
        self.advance(cache).await
    }

    /// Consume as much of the buffer as the current state allows.
    async fn advance(&mut self, cache: &mut CacheManager) -> Result<(), BodyError> {
        let keep = self.delimiter.len() - 1;
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Preamble => match find(&self.buf, &self.delimiter) {
                    Some(at) => {
                        self.buf.drain(..at + self.delimiter.len());
                        self.state = State::AfterDelimiter;
                    }
                    None => {
                        let stale = self.buf.len().saturating_sub(keep);
                        self.buf.drain(..stale);
                        self.state = State::Preamble;
                        return Ok(());
                    }
                },
                State::AfterDelimiter => {
                    if self.buf.starts_with(b"--") {
                        self.buf.clear();
                        return Ok(());
                    } else if self.buf.starts_with(b"\r\n") {
                        self.buf.drain(..2);
                    } else if self.buf.starts_with(b"\n") {
                        self.buf.drain(..1);
                    } else if self.buf.len() < 2 {
                        self.state = State::AfterDelimiter;
                        return Ok(());
                    } else {
                        return Err(malformed("boundary is not followed by a line break"));
                    }
                    self.state = State::Headers;
                }
                State::Headers => match parse_part_headers(&self.buf)? {
                    Some((headers, offset)) => {
                        self.buf.drain(..offset);
                        self.state = State::Content(Part::open(&headers, cache).await?);
                    }
                    None => {
                        self.state = State::Headers;
                        return Ok(());
                    }
                },
                State::Content(mut part) => match find(&self.buf, &self.delimiter) {
                    Some(at) => {
                        part.write(&self.buf[..at]).await?;
                        part.close(&mut self.body).await?;
                        self.buf.drain(..at + self.delimiter.len());
                        self.state = State::AfterDelimiter;
                    }
                    None => {
                        let ready = self.buf.len().saturating_sub(keep);
                        part.write(&self.buf[..ready]).await?;
                        self.buf.drain(..ready);
                        self.state = State::Content(part);
                        return Ok(());
                    }
                },
                State::Done => {
                    self.buf.clear();
                    return Ok(());
                }
            }
        }
    }

    /// The decoded parts, once the closing boundary has been seen.
    pub(crate) fn finish(self) -> Result<Body, BodyError> {
        match self.state {
            _ if self.len == 0 => Ok(Body::new()),
            State::Done => Ok(self.body),
            State::Preamble => Err(malformed("body does not contain the boundary")),
            _ => Err(malformed("missing closing boundary")),
        }
    }
}
