//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::parser::body::{Body, BodyValue};
use crate::parser::content_type::ContentType;
use crate::parser::error::Error;
use crate::parser::form::{decode_parameters, decode_percent, Params};
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;
use crate::server::CookieHandler;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The percent-decoded request path, without the query string
    pub path: String,
    /// The request target exactly as received
    pub raw_uri: String,
    /// The undecoded query string, if the target had one
    pub query_string: Option<String>,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers, names lower-cased
    pub headers: HashMap<String, String>,
    /// Query parameters parsed from the request target
    pub query_params: Params,
    /// Cookies sent with the request
    pub cookies: CookieHandler,
    /// The decoded request body
    pub body: Body,
    /// Peer address of the connection, when known
    pub remote_addr: Option<SocketAddr>,
    /// Whether the connection is TLS-wrapped
    pub secure: bool,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `raw_uri` - The request target, including any query string
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers; names are lower-cased here
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty body
    pub fn new(method: Method, raw_uri: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let headers: HashMap<String, String> = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let (path, query_string) = match raw_uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (raw_uri.as_str(), None),
        };
        let path = decode_percent(path);
        let query_params = query_string
            .as_deref()
            .map(decode_parameters)
            .unwrap_or_default();
        let cookies = headers
            .get("cookie")
            .map(|header| CookieHandler::parse(header))
            .unwrap_or_default();

        Self {
            method,
            path,
            raw_uri,
            query_string,
            version,
            headers,
            query_params,
            cookies,
            body: Body::new(),
            remote_addr: None,
            secure: false,
        }
    }

    /// Create a new HTTP request with an already decoded body.
    pub fn with_body(method: Method, raw_uri: String, version: HttpVersion, headers: HashMap<String, String>, body: Body) -> Self {
        let mut request = Self::new(method, raw_uri, version, headers);
        request.body = body;
        request
    }

    /// Get a header value, ignoring case.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The parsed `Content-Type` header.
    pub fn content_type(&self) -> Option<ContentType> {
        self.get_header("content-type").map(|v| ContentType::parse(v))
    }

    /// Whether the client asked to keep the connection open after this request.
    pub fn keep_alive(&self) -> bool {
        match self.get_header("connection").map(|v| v.to_ascii_lowercase()) {
            Some(v) if v.contains("close") => false,
            Some(v) if v.contains("keep-alive") => true,
            _ => self.version.keep_alive_by_default(),
        }
    }

    /// Whether `Accept-Encoding` lists gzip.
    pub fn accepts_gzip(&self) -> bool {
        self.get_header("accept-encoding").is_some_and(|value| {
            value.split(',').any(|coding| {
                coding
                    .split(';')
                    .next()
                    .is_some_and(|c| c.trim().eq_ignore_ascii_case("gzip"))
            })
        })
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the body is not valid JSON
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = match self.body.raw().map(|part| &part.value) {
            Some(BodyValue::Text(text)) => serde_json::from_str(text)?,
            Some(BodyValue::File(item)) => serde_json::from_slice(&item.as_bytes().await?)?,
            None => serde_json::from_str("")?,
        };
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(|ct| ct.is_json())
    }

    /// Get the first value of a query parameter.
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Get every value of a query parameter, in order.
    pub fn get_query_params(&self, name: &str) -> Option<&[String]> {
        self.query_params.get(name).map(Vec::as_slice)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

/// Parse a request line and header block.
///
/// `input` holds everything up to and including the empty line that ends
/// the headers; the body is decoded separately. A missing version is read
/// as HTTP/1.1. When a header name repeats, the last occurrence wins.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    // Convert the input to a string
    let input_str = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = input_str.lines().skip_while(|line| line.trim().is_empty());

    let request_line = match lines.next() {
        Some(line) => line,
        None => return Err(Error::EmptyRequest),
    };

    let mut parts = request_line.split_whitespace();

    let method = match parts.next() {
        Some(token) => Method::from_str(token)?,
        None => return Err(Error::EmptyRequest),
    };

    let uri = match parts.next() {
        Some(uri) => uri.to_string(),
        None => return Err(Error::InvalidPath),
    };

    let version = match parts.next() {
        Some(version) => HttpVersion::from_str(version)?,
        None => HttpVersion::Http11,
    };

    if parts.next().is_some() {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        }

        headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(HttpRequest::new(method, uri, version, headers))
}
