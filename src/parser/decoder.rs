//! Body decoding strategy selection.

use std::collections::HashMap;

use log::debug;
use tokio::io::{AsyncBufRead, AsyncReadExt};

use crate::cache::CacheManager;
use crate::parser::body::{Body, BodyPart, BodyValue, RAW_FIELD};
use crate::parser::chunked::read_chunked;
use crate::parser::content_type::ContentType;
use crate::parser::error::BodyError;
use crate::parser::form::decode_parameters;
use crate::parser::multipart::MultipartParser;
use crate::parser::spool::{Spool, Spooled};

/// Size limits applied while decoding a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    /// Raw bodies larger than this are moved to temporary storage.
    pub memory_store_limit: u64,
    /// Bodies larger than this are rejected.
    pub max_body_size: u64,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            memory_store_limit: 1024,
            max_body_size: 64 * 1024 * 1024,
        }
    }
}

/// How the body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    None,
    Length(u64),
    Chunked,
}

fn framing(headers: &HashMap<String, String>) -> Result<Framing, BodyError> {
    if let Some(encoding) = headers.get("transfer-encoding") {
        let encoding = encoding.trim().to_ascii_lowercase();
        match encoding.as_str() {
            "chunked" => return Ok(Framing::Chunked),
            "identity" => {}
            _ => return Err(BodyError::UnsupportedTransferEncoding(encoding)),
        }
    }

    match headers.get("content-length") {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Framing::Length)
            .map_err(|_| BodyError::InvalidContentLength(value.clone())),
        None => Ok(Framing::None),
    }
}

/// The decoding strategy, keyed by the declared media type.
#[derive(Debug)]
enum Strategy {
    UrlEncoded,
    Multipart(String),
    Raw,
}

impl Strategy {
    fn select(content_type: &ContentType) -> Result<Self, BodyError> {
        if content_type.is_multipart() {
            return content_type
                .boundary
                .clone()
                .map(Strategy::Multipart)
                .ok_or(BodyError::MissingBoundary);
        }
        if content_type.is_url_encoded() {
            return Ok(Strategy::UrlEncoded);
        }
        Ok(Strategy::Raw)
    }
}

/// Where body bytes go as they are read off the wire.
pub(crate) enum Sink {
    Spool(Spool),
    Multipart(MultipartParser),
}

impl Sink {
    pub(crate) async fn push(&mut self, data: &[u8], cache: &mut CacheManager) -> Result<(), BodyError> {
        match self {
            Sink::Spool(spool) => spool.push(data, cache).await,
            Sink::Multipart(parser) => parser.push(data, cache).await,
        }
    }
}

async fn read_fixed<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    len: u64,
    sink: &mut Sink,
    cache: &mut CacheManager,
) -> Result<(), BodyError> {
    let mut buf = vec![0u8; len.min(8192) as usize];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(BodyError::Truncated {
                expected: len,
                received: len - remaining,
            });
        }
        sink.push(&buf[..n], cache).await?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Read and decode the body announced by `headers` (lower-cased names).
///
/// File-backed values are allocated from `cache`; the caller is responsible
/// for clearing it once the request has been answered.
pub async fn decode_body<R: AsyncBufRead + Unpin>(
    headers: &HashMap<String, String>,
    reader: &mut R,
    cache: &mut CacheManager,
    limits: &BodyLimits,
) -> Result<Body, BodyError> {
    let framing = framing(headers)?;
    match framing {
        Framing::None | Framing::Length(0) => return Ok(Body::new()),
        Framing::Length(len) if len > limits.max_body_size => {
            return Err(BodyError::TooLarge(limits.max_body_size))
        }
        _ => {}
    }

    let declared = headers.get("content-type").map(|v| v.trim().to_string());
    let content_type = declared.as_deref().map(ContentType::parse).unwrap_or_default();
    let strategy = Strategy::select(&content_type)?;
    debug!("Decoding {framing:?} body as {strategy:?}");

    let mut sink = match &strategy {
        Strategy::Multipart(boundary) => Sink::Multipart(MultipartParser::new(boundary, limits.max_body_size)),
        Strategy::UrlEncoded => Sink::Spool(Spool::new(RAW_FIELD, None, limits.max_body_size)),
        Strategy::Raw => Sink::Spool(Spool::new(
            RAW_FIELD,
            Some(limits.memory_store_limit),
            limits.max_body_size,
        )),
    };
    match framing {
        Framing::Length(len) => read_fixed(reader, len, &mut sink, cache).await?,
        Framing::Chunked => read_chunked(reader, &mut sink, cache).await?,
        Framing::None => {}
    }

    let spool = match sink {
        Sink::Multipart(parser) => return parser.finish(),
        Sink::Spool(spool) => spool,
    };
    let bytes = match spool.finish().await? {
        Spooled::File(item) => return Ok(raw_body(BodyValue::File(item), declared)),
        Spooled::Memory(bytes) => bytes,
    };

    if bytes.is_empty() {
        return Ok(Body::new());
    }

    match strategy {
        Strategy::UrlEncoded => {
            let mut body = Body::new();
            for (name, values) in decode_parameters(&String::from_utf8_lossy(&bytes)) {
                if values.is_empty() {
                    body.insert_name(name);
                    continue;
                }
                for value in values {
                    body.insert(name.clone(), BodyPart::text(value));
                }
            }
            Ok(body)
        }
        Strategy::Multipart(_) | Strategy::Raw => {
            // Bytes that are not valid UTF-8 are kept verbatim in the cache
            let value = match String::from_utf8(bytes) {
                Ok(text) => BodyValue::Text(text),
                Err(err) => {
                    let item = cache.create(RAW_FIELD)?;
                    item.write(err.as_bytes()).await?;
                    BodyValue::File(item)
                }
            };
            Ok(raw_body(value, declared))
        }
    }
}

fn raw_body(value: BodyValue, content_type: Option<String>) -> Body {
    let mut body = Body::new();
    body.insert(
        RAW_FIELD,
        BodyPart {
            value,
            content_type,
            filename: None,
        },
    );
    body
}
