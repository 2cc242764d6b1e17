use dashmap::DashMap;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::dispatcher::{HandlerResponse, ResponseBody};

/// `may_minihttp` keeps at most this many headers per response.
const MAX_RESPONSE_HEADERS: usize = 15;

/// Upper bound on distinct interned header lines.
const MAX_INTERNED_LINES: usize = 65_536;

/// Headers whose values come from a small, fixed set (configuration,
/// allowed methods, rate-limit counters). Their lines are interned.
const INTERNED_HEADERS: [&str; 7] = [
    "content-type",
    "vary",
    "allow",
    "retry-after",
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "cache-control",
];

/// Written before any other header so the per-response cap never drops them.
const PRIORITY_HEADERS: [&str; 2] = ["set-cookie", "location"];

// TODO: switch to an owned header API once the may_minihttp fork exposes one;
// until then per-request lines are leaked with their response.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

fn is_interned(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("access-control-") || INTERNED_HEADERS.contains(&name.as_str())
}

fn is_priority(name: &str) -> bool {
    PRIORITY_HEADERS.iter().any(|p| p.eq_ignore_ascii_case(name))
}

/// `name: value` as a `'static` line.
///
/// Lines of [`INTERNED_HEADERS`] and `access-control-*` are leaked once and
/// reused. Anything else (request ids, cookies, redirect targets) is leaked
/// per call, as is any line arriving once the interner is full.
fn header_line(name: &str, value: &str) -> &'static str {
    let line = format!("{name}: {value}");
    if !is_interned(name) {
        return Box::leak(line.into_boxed_str());
    }
    if let Some(interned) = HEADER_LINES.get(&line) {
        return *interned;
    }
    if HEADER_LINES.len() >= MAX_INTERNED_LINES {
        return Box::leak(line.into_boxed_str());
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    *HEADER_LINES.entry(line).or_insert(leaked)
}

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// `Content-Type` header line and bytes of a body.
pub(crate) fn encode_body(body: &ResponseBody) -> (Option<&'static str>, Vec<u8>) {
    match body {
        ResponseBody::Empty => (None, Vec::new()),
        ResponseBody::Text(s) => (
            Some("Content-Type: text/plain; charset=utf-8"),
            s.clone().into_bytes(),
        ),
        ResponseBody::Html(s) => (
            Some("Content-Type: text/html; charset=utf-8"),
            s.clone().into_bytes(),
        ),
        ResponseBody::Json(v) => (
            Some("Content-Type: application/json"),
            serde_json::to_vec(v).unwrap_or_else(|_| b"null".to_vec()),
        ),
    }
}

/// Serialize a [`HandlerResponse`] onto the wire.
pub fn write_response(res: &mut Response, response: &HandlerResponse) {
    res.status_code(response.status as usize, status_reason(response.status));

    let (content_type, bytes) = encode_body(&response.body);
    let mut written = 0;
    if let Some(ct) = content_type {
        if response.get_header("content-type").is_none() {
            res.header(ct);
            written += 1;
        }
    }
    let (priority, rest): (Vec<_>, Vec<_>) = response
        .headers
        .iter()
        .partition(|(name, _)| is_priority(name));
    let total = priority.len() + rest.len();
    for (i, (name, value)) in priority.into_iter().chain(rest).enumerate() {
        if written == MAX_RESPONSE_HEADERS {
            warn!(
                status = response.status,
                dropped = total - i,
                "Response header limit reached"
            );
            break;
        }
        res.header(header_line(name, value));
        written += 1;
    }
    res.body_vec(bytes);
}
