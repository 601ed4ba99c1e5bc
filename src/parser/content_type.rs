//! `Content-Type` header parsing.

/// The parts of a `Content-Type` header the body decoder cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentType {
    /// Lower-cased media type, e.g. `multipart/form-data`.
    pub mime: String,
    pub charset: Option<String>,
    pub boundary: Option<String>,
}

pub const URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

impl ContentType {
    /// Parse a header value. Parameters may be separated by `;` or `,` and
    /// their values may be quoted.
    pub fn parse(header: &str) -> Self {
        let mut parts = header.split([';', ',']);
        let mime = parts
            .next()
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let mut content_type = ContentType {
            mime,
            ..Default::default()
        };

        for param in parts {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if value.is_empty() {
                continue;
            }
            match name.trim().to_ascii_lowercase().as_str() {
                "charset" => content_type.charset = Some(value.to_string()),
                "boundary" => content_type.boundary = Some(value.to_string()),
                _ => {}
            }
        }

        content_type
    }

    pub fn is_multipart(&self) -> bool {
        self.mime == MULTIPART_FORM_DATA
    }

    pub fn is_url_encoded(&self) -> bool {
        self.mime == URL_ENCODED
    }

    pub fn is_json(&self) -> bool {
        self.mime == "application/json" || self.mime.ends_with("+json")
    }
}
