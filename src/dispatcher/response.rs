use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage; names are shared `Arc<str>`, values per-response.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Body of a [`HandlerResponse`].
///
/// The dispatcher never serializes; the server layer decides how each variant
/// goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Text(String),
    /// Rendered HTML page.
    Html(String),
    /// JSON-serializable payload.
    Json(Value),
}

/// Response produced by a handler or by a short-circuiting middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: ResponseBody,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), ResponseBody::Empty)
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, HeaderVec::new(), ResponseBody::Json(body))
    }

    #[must_use]
    pub fn html(status: u16, body: String) -> Self {
        Self::new(status, HeaderVec::new(), ResponseBody::Html(body))
    }

    #[must_use]
    pub fn text(status: u16, body: String) -> Self {
        Self::new(status, HeaderVec::new(), ResponseBody::Text(body))
    }

    /// JSON error payload `{ "error": message }`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// `302 Found` redirect.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::redirect_with_status(location, 302)
    }

    #[must_use]
    pub fn redirect_with_status(location: &str, status: u16) -> Self {
        let mut res = Self::empty(status);
        res.set_header("location", location.to_string());
        res
    }

    #[must_use]
    pub fn not_found(method: &Method, path: &str) -> Self {
        Self::json(
            404,
            serde_json::json!({ "error": "Not Found", "method": method.as_str(), "path": path }),
        )
    }

    /// `405` with an `Allow` header listing the methods the path accepts.
    #[must_use]
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let mut res = Self::error(405, "Method Not Allowed");
        res.set_header("allow", allow);
        res
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive name match).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Add a header without replacing existing ones (e.g. `set-cookie`).
    pub fn append_header(&mut self, name: &str, value: String) {
        self.headers.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.get_header("location").is_some()
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.get_header("location")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_sets_location() {
        let res = HandlerResponse::redirect("/login");
        assert_eq!(res.status, 302);
        assert!(res.is_redirect());
        assert_eq!(res.location(), Some("/login"));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut res = HandlerResponse::empty(200);
        res.set_header("Vary", "Accept".into());
        res.set_header("vary", "Origin".into());
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.get_header("VARY"), Some("Origin"));
    }

    #[test]
    fn test_method_not_allowed_allow_header() {
        let res = HandlerResponse::method_not_allowed(&[Method::GET, Method::PUT]);
        assert_eq!(res.status, 405);
        assert_eq!(res.get_header("allow"), Some("GET, PUT"));
    }
}
