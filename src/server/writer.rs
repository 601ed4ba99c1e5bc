//! Response serialization: status line, headers and body framing.

use std::io::{self, Cursor};
use std::time::SystemTime;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parser::{HttpRequest, HttpVersion, Method};
use crate::server::cookie::http_date;
use crate::server::response::{HttpResponse, ResponseBody, StatusCode};

/// The parts of a request that shape how its response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: Method,
    pub version: HttpVersion,
    pub keep_alive: bool,
    pub accepts_gzip: bool,
    pub if_none_match: Option<String>,
    pub if_range: Option<String>,
    pub range: Option<String>,
}

impl RequestMeta {
    pub fn from_request(request: &HttpRequest) -> Self {
        Self {
            method: request.method,
            version: request.version,
            keep_alive: request.keep_alive(),
            accepts_gzip: request.accepts_gzip(),
            if_none_match: request.get_header("if-none-match").cloned(),
            if_range: request.get_header("if-range").cloned(),
            range: request.get_header("range").cloned(),
        }
    }

    /// For error responses written before a request could be parsed.
    pub fn closing() -> Self {
        Self {
            method: Method::GET,
            version: HttpVersion::Http11,
            keep_alive: false,
            accepts_gzip: false,
            if_none_match: None,
            if_range: None,
            range: None,
        }
    }
}

fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches("W/").trim_matches('"')
}

fn none_match(header: &str, etag: Option<&str>) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || etag.is_some_and(|etag| normalize_tag(candidate) == normalize_tag(etag))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    Satisfiable { start: u64, end: u64 },
    Unsatisfiable,
}

/// Parse the first range of a `Range` header against a body of `total`
/// bytes. `None` means the header is not understood and is ignored.
fn parse_range(header: &str, total: u64) -> Option<ByteRange> {
    let set = header.trim().strip_prefix("bytes=")?;
    let first = set.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let suffix: u64 = end.parse().ok()?;
        if suffix == 0 || total == 0 {
            return Some(ByteRange::Unsatisfiable);
        }
        return Some(ByteRange::Satisfiable {
            start: total.saturating_sub(suffix),
            end: total - 1,
        });
    }

    let start: u64 = start.parse().ok()?;
    let end = if end.is_empty() {
        total.saturating_sub(1)
    } else {
        end.parse::<u64>().ok()?.min(total.saturating_sub(1))
    };
    if start >= total || end < start {
        return Some(ByteRange::Unsatisfiable);
    }
    Some(ByteRange::Satisfiable { start, end })
}

fn slice_body(body: ResponseBody, start: u64, len: u64) -> ResponseBody {
    match body {
        ResponseBody::Empty => ResponseBody::Empty,
        ResponseBody::Bytes(bytes) => {
            let from = (start as usize).min(bytes.len());
            let to = (start.saturating_add(len) as usize).min(bytes.len());
            ResponseBody::Bytes(bytes[from..to].to_vec())
        }
        ResponseBody::Stream { reader, skip, .. } => ResponseBody::Stream {
            reader,
            length: Some(len),
            skip: skip + start,
        },
    }
}

/// Apply `If-None-Match`, `Range` and `If-Range` to a `200 OK` response.
///
/// A matching `If-None-Match` wins over `Range`. Ranges are only served for
/// responses that opted in with [`HttpResponse::with_ranges`] and whose
/// length is known.
pub fn negotiate(mut response: HttpResponse, meta: &RequestMeta) -> HttpResponse {
    if response.status != StatusCode::Ok {
        return response;
    }

    if let Some(header) = &meta.if_none_match {
        if none_match(header, response.etag()) {
            response.status = StatusCode::NotModified;
            response.body = ResponseBody::Empty;
            response.remove_header("Content-Length");
            return response;
        }
    }

    let Some(range) = meta.range.as_deref() else {
        return response;
    };
    if !response.ranges {
        return response;
    }
    if let Some(if_range) = &meta.if_range {
        let current = response.etag().map(normalize_tag);
        if current != Some(normalize_tag(if_range)) {
            return response;
        }
    }
    let Some(total) = response.body.len() else {
        return response;
    };

    match parse_range(range, total) {
        None => response,
        Some(ByteRange::Unsatisfiable) => {
            response.status = StatusCode::RangeNotSatisfiable;
            response.body = ResponseBody::Empty;
            response.gzip = false;
            response.remove_header("Content-Length");
            response.with_header("Content-Range", format!("bytes */{total}"))
        }
        Some(ByteRange::Satisfiable { start, end }) => {
            let len = end - start + 1;
            let body = std::mem::replace(&mut response.body, ResponseBody::Empty);
            response.body = slice_body(body, start, len);
            response.status = StatusCode::PartialContent;
            response.gzip = false;
            response.remove_header("Content-Length");
            response.with_header("Content-Range", format!("bytes {start}-{end}/{total}"))
        }
    }
}

/// Write one chunk of a chunked body. Empty data writes nothing, since a
/// zero-size chunk would end the body.
pub async fn write_chunk<W: AsyncWrite + Unpin>(out: &mut W, data: &[u8]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    out.write_all(format!("{:x}\r\n", data.len()).as_bytes()).await?;
    out.write_all(data).await?;
    out.write_all(b"\r\n").await
}

/// Write the zero-size chunk that ends a chunked body.
pub async fn write_last_chunk<W: AsyncWrite + Unpin>(out: &mut W) -> io::Result<()> {
    out.write_all(b"0\r\n\r\n").await
}

type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

async fn into_reader(body: ResponseBody) -> io::Result<BodyReader> {
    match body {
        ResponseBody::Empty => Ok(Box::new(tokio::io::empty())),
        ResponseBody::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
        ResponseBody::Stream { mut reader, skip, .. } => {
            if skip > 0 {
                let skipped = tokio::io::copy(&mut (&mut reader).take(skip), &mut tokio::io::sink()).await?;
                if skipped < skip {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "response body shorter than requested range",
                    ));
                }
            }
            Ok(reader)
        }
    }
}

/// Serializes responses onto a connection.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    buffer_size: usize,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(8192)
    }
}

impl ResponseWriter {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(512),
        }
    }

    /// Write `response` for a request described by `meta`.
    ///
    /// Returns whether the connection may stay open.
    pub async fn write<W: AsyncWrite + Unpin>(
        &self,
        response: HttpResponse,
        meta: &RequestMeta,
        out: &mut W,
    ) -> io::Result<bool> {
        let mut response = negotiate(response, meta);

        let send_body = response.status.allows_body();
        let declared = response.declared_length();
        let gzip = send_body && response.gzip && meta.accepts_gzip && declared.is_none();
        let length = declared.or(response.body.len());
        let streamed = send_body && (gzip || response.chunked || length.is_none());
        // HTTP/1.0 peers cannot decode chunks, so the body runs until close
        let chunked = streamed && meta.version != HttpVersion::Http10;
        let close_delimited = streamed && !chunked;
        let keep_alive = meta.keep_alive && response.keep_alive && !close_delimited;

        let mut head = format!("HTTP/1.1 {}\r\n", response.status);
        if response.get_header("Date").is_none() {
            head.push_str(&format!("Date: {}\r\n", http_date(SystemTime::now())));
        }
        for (name, value) in &response.headers {
            let lower = name.to_ascii_lowercase();
            if matches!(lower.as_str(), "content-length" | "transfer-encoding" | "connection") {
                continue;
            }
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        for cookie in &response.cookies {
            head.push_str(&format!("Set-Cookie: {cookie}\r\n"));
        }
        if gzip {
            head.push_str("Content-Encoding: gzip\r\n");
        }
        head.push_str(if keep_alive {
            "Connection: keep-alive\r\n"
        } else {
            "Connection: close\r\n"
        });
        if chunked {
            head.push_str("Transfer-Encoding: chunked\r\n");
        } else if send_body && !close_delimited {
            head.push_str(&format!("Content-Length: {}\r\n", length.unwrap_or(0)));
        }
        head.push_str("\r\n");

        trace!(
            "Writing response {} (chunked: {chunked}, close-delimited: {close_delimited}, gzip: {gzip})",
            response.status
        );
        out.write_all(head.as_bytes()).await?;

        if send_body && meta.method.allows_response_body() {
            let body = std::mem::replace(&mut response.body, ResponseBody::Empty);
            let mut reader = into_reader(body).await?;
            if gzip {
                self.write_gzip(&mut reader, chunked, out).await?;
            } else if chunked {
                self.write_chunked(&mut reader, out).await?;
            } else if close_delimited {
                tokio::io::copy(&mut reader, out).await?;
            } else {
                Self::write_fixed(&mut reader, length.unwrap_or(0), out).await?;
            }
        }

        out.flush().await?;
        Ok(keep_alive)
    }

    async fn write_fixed<W: AsyncWrite + Unpin>(reader: &mut BodyReader, length: u64, out: &mut W) -> io::Result<()> {
        let written = tokio::io::copy(&mut reader.take(length), out).await?;
        if written < length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("response body ended after {written} of {length} bytes"),
            ));
        }
        Ok(())
    }

    async fn write_chunked<W: AsyncWrite + Unpin>(&self, reader: &mut BodyReader, out: &mut W) -> io::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            write_chunk(out, &buf[..n]).await?;
        }
        write_last_chunk(out).await
    }

    /// Compress the body, framed as chunks or written raw until close.
    async fn write_gzip<W: AsyncWrite + Unpin>(
        &self,
        reader: &mut BodyReader,
        chunked: bool,
        out: &mut W,
    ) -> io::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            std::io::Write::write_all(&mut encoder, &buf[..n])?;
            let compressed = std::mem::take(encoder.get_mut());
            Self::write_piece(out, &compressed, chunked).await?;
        }
        let tail = encoder.finish()?;
        Self::write_piece(out, &tail, chunked).await?;
        if chunked {
            write_last_chunk(out).await?;
        }
        Ok(())
    }

    async fn write_piece<W: AsyncWrite + Unpin>(out: &mut W, data: &[u8], chunked: bool) -> io::Result<()> {
        if chunked {
            write_chunk(out, data).await
        } else {
            out.write_all(data).await
        }
    }
}
