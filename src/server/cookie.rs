//! `Cookie` request header parsing and `Set-Cookie` response headers.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Datelike, Utc};

/// Latest year an HTTP date can carry with a four-digit year field.
const MAX_HTTP_DATE_YEAR: i32 = 9999;

fn format_http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format a timestamp as an RFC 7231 HTTP date.
pub(crate) fn http_date(time: SystemTime) -> String {
    format_http_date(DateTime::<Utc>::from(time))
}

/// The `Expires` date for a cookie living `max_age` seconds from now.
///
/// Zero or negative ages expire at the epoch. `None` when the date cannot be
/// represented, in which case only `Max-Age` is sent.
fn expires_after(max_age: i64) -> Option<String> {
    if max_age <= 0 {
        return DateTime::<Utc>::from_timestamp(0, 0).map(format_http_date);
    }
    let at = SystemTime::now().checked_add(Duration::from_secs(max_age.unsigned_abs()))?;
    let secs = at.duration_since(SystemTime::UNIX_EPOCH).ok()?.as_secs();
    DateTime::<Utc>::from_timestamp(i64::try_from(secs).ok()?, 0)
        .filter(|time| time.year() <= MAX_HTTP_DATE_YEAR)
        .map(format_http_date)
}

/// A cookie to be sent with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// A session cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
        }
    }

    /// A cookie that tells the client to drop `name` right away.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "-delete-").with_max_age(0)
    }

    /// Lifetime in seconds; zero or less expires the cookie.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// The `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.max(0))?;
            if let Some(expires) = expires_after(max_age) {
                write!(f, "; Expires={expires}")?;
            }
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

/// Cookies received with a request, plus the cookies queued for the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieHandler {
    received: HashMap<String, String>,
    queue: Vec<Cookie>,
}

impl CookieHandler {
    /// Parse a `Cookie` header value (`a=1; b=2`).
    pub fn parse(header: &str) -> Self {
        let received = header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            received,
            queue: Vec::new(),
        }
    }

    /// Value of a cookie sent by the client.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.received.get(name).map(String::as_str)
    }

    /// Names of the cookies sent by the client.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.received.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// Queue a cookie to be set on the response.
    pub fn set(&mut self, cookie: Cookie) {
        self.queue.push(cookie);
    }

    /// Queue an immediately expiring cookie for `name`.
    pub fn delete(&mut self, name: &str) {
        self.set(Cookie::expired(name));
    }

    /// Cookies queued so far.
    pub fn queued(&self) -> &[Cookie] {
        &self.queue
    }

    pub(crate) fn into_queue(self) -> Vec<Cookie> {
        self.queue
    }
}
