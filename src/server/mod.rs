//! HTTP surface over `may_minihttp`.
//!
//! The routing core never touches sockets; [`AppService`] adapts it to the
//! coroutine HTTP server, and adds sessions and error rendering.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_body, parse_cookies, parse_request, ParsedRequest};
pub use response::write_response;
pub use service::AppService;
