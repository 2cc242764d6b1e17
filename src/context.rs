//! Per-request context threaded through the middleware chain and into the
//! handler.
//!
//! A [`RequestContext`] is created for each incoming request, owned by the
//! dispatch call, passed by `&mut` to every middleware and to the handler, and
//! dropped once the response has been produced. Nothing is shared between
//! requests.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::dispatcher::HeaderVec;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::session::{MemorySession, Session};

/// Everything a middleware or handler may inspect about one request.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query_string: Option<String>,
    pub query_params: ParamVec,
    /// Header names are lowercase.
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    pub body: Option<Value>,
    pub session: Box<dyn Session>,
    /// Values attached by middleware, e.g. the authenticated `user_id`.
    pub attributes: HashMap<String, Value>,
}

impl RequestContext {
    /// Build a context from a method and a path that may carry a query string.
    /// The session starts out empty.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (path, None),
        };
        let query_params = query_string
            .as_deref()
            .map(parse_query)
            .unwrap_or_default();
        let path = if path.is_empty() { "/" } else { path };

        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_string,
            query_params,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: None,
            session: Box::new(MemorySession::new()),
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase().as_str()), value.into()));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Box<dyn Session>) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Header lookup, case-insensitive per RFC 7230.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter lookup; the last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query string, as the client requested it.
    #[must_use]
    pub fn full_path(&self) -> String {
        match &self.query_string {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }

    /// Give the session back, e.g. to persist it.
    #[must_use]
    pub fn into_session(self) -> Box<dyn Session> {
        self.session
    }
}

/// Parse an `application/x-www-form-urlencoded` query string.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_split_from_path() {
        let ctx = RequestContext::new(Method::GET, "/threads?page=2&sort=new&page=3");
        assert_eq!(ctx.path, "/threads");
        assert_eq!(ctx.get_query_param("page"), Some("3"));
        assert_eq!(ctx.get_query_param("sort"), Some("new"));
        assert_eq!(ctx.full_path(), "/threads?page=2&sort=new&page=3");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let ctx = RequestContext::new(Method::GET, "/").with_header("X-Forwarded-For", "10.0.0.1");
        assert_eq!(ctx.get_header("x-forwarded-for"), Some("10.0.0.1"));
        assert_eq!(ctx.get_header("X-FORWARDED-FOR"), Some("10.0.0.1"));
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let ctx = RequestContext::new(Method::GET, "?a=1");
        assert_eq!(ctx.path, "/");
        assert_eq!(ctx.get_query_param("a"), Some("1"));
    }
}
