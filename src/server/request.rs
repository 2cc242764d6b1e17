use std::io::Read;
use std::sync::Arc;

use may_minihttp::Request;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::dispatcher::HeaderVec;

/// Request data extracted from the wire, before any routing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Request target, query string included.
    pub path: String,
    /// Lowercase header names.
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    /// JSON or form-encoded body, decoded.
    pub body: Option<Value>,
}

impl ParsedRequest {
    #[must_use]
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: None,
        }
    }

    /// Add a header; a `Cookie` header is also split into cookies.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(value));
        }
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a `Cookie` header into name/value pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((Arc::from(name), value.to_string()))
        })
        .collect()
}

/// Decode a request body by content type.
///
/// JSON bodies become their value, `application/x-www-form-urlencoded`
/// bodies become an object of strings. Anything else, or a body that fails to
/// decode, yields `None`.
#[must_use]
pub fn parse_body(content_type: Option<&str>, raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let fields: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Some(Value::Object(fields));
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, content_type = %content_type, "Body is not JSON");
            None
        }
    }
}

/// Extract everything the service needs from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let path = req.path().to_string();

    let mut headers = HeaderVec::new();
    let mut cookies = HeaderVec::new();
    for h in req.headers() {
        let name = h.name.to_ascii_lowercase();
        let value = String::from_utf8_lossy(h.value).to_string();
        if name == "cookie" {
            cookies.extend(parse_cookies(&value));
        }
        headers.push((Arc::from(name), value));
    }

    debug!(
        header_count = headers.len(),
        cookie_names = ?cookies.iter().map(|(k, _)| k.as_ref()).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let content_type = headers
        .iter()
        .find(|(k, _)| k.as_ref() == "content-type")
        .map(|(_, v)| v.clone());

    let mut raw = String::new();
    let body = match req.body().read_to_string(&mut raw) {
        Ok(size) if size > 0 => {
            debug!(body_size_bytes = size, content_type = ?content_type, "Request body read");
            parse_body(content_type.as_deref(), &raw)
        }
        _ => None,
    };

    info!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        has_body = body.is_some(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        cookies,
        body,
    }
}
