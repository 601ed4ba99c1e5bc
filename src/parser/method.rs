//! HTTP request methods.

use std::fmt;
use std::str::FromStr;

use crate::parser::error::Error;

/// Request methods accepted on the request line. Tokens are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    /// Answered like GET, without body bytes.
    HEAD,
    OPTIONS,
    TRACE,
    CONNECT,
    PATCH,
    // WebDAV (RFC 4918)
    PROPFIND,
    PROPPATCH,
    MKCOL,
    MOVE,
    COPY,
    LOCK,
    UNLOCK,
}

impl Method {
    /// Whether responses to this method carry a body.
    pub fn allows_response_body(&self) -> bool {
        !matches!(self, Method::HEAD)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "CONNECT" => Ok(Method::CONNECT),
            "PATCH" => Ok(Method::PATCH),
            "PROPFIND" => Ok(Method::PROPFIND),
            "PROPPATCH" => Ok(Method::PROPPATCH),
            "MKCOL" => Ok(Method::MKCOL),
            "MOVE" => Ok(Method::MOVE),
            "COPY" => Ok(Method::COPY),
            "LOCK" => Ok(Method::LOCK),
            "UNLOCK" => Ok(Method::UNLOCK),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
