use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use tracing::{error, info, warn};

use super::request::{parse_request, ParsedRequest};
use super::response::write_response;
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::error::{ErrorRenderer, HandlerError};
use crate::ids::RequestId;
use crate::session::SessionStore;

/// `may_minihttp` service running every request through the [`Dispatcher`].
///
/// Per request: parse, load the session named by the session cookie, run
/// the dispatcher, persist the session, write the response. Handler errors and
/// panics are turned into responses by the [`ErrorRenderer`].
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<dyn SessionStore>,
    session_config: SessionConfig,
    renderer: ErrorRenderer,
}

impl AppService {
    #[must_use]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
        renderer: ErrorRenderer,
    ) -> Self {
        Self {
            dispatcher,
            sessions,
            session_config,
            renderer,
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve a parsed request. Independent of the socket, so it can be driven
    /// directly.
    pub fn handle(&self, req: ParsedRequest) -> HandlerResponse {
        let request_id = RequestId::from_header_or_new(req.get_header("x-request-id"));

        let path_only = req.path.split('?').next().unwrap_or("/");
        if req.method == "GET" && path_only == "/health" {
            return health_response();
        }

        let Ok(method) = Method::from_bytes(req.method.as_bytes()) else {
            warn!(request_id = %request_id, method = %req.method, "Invalid HTTP method");
            return HandlerResponse::error(400, "Bad Request");
        };

        let session = self
            .sessions
            .load(req.get_cookie(&self.session_config.cookie_name));

        let mut ctx = RequestContext::new(method, &req.path)
            .with_request_id(request_id)
            .with_session(session);
        ctx.headers = req.headers;
        ctx.cookies = req.cookies;
        ctx.body = req.body;

        let result = catch_unwind(AssertUnwindSafe(|| self.dispatcher.run(&mut ctx)));
        let mut response = match result {
            Ok(Ok(outcome)) => outcome.response,
            Ok(Err(err)) => self.renderer.render(&err),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(request_id = %request_id, panic = %message, "Handler panicked");
                self.renderer.render(&HandlerError::Panicked(message))
            }
        };

        let session = ctx.into_session();
        if let Some(session_id) = self.sessions.save(session.as_ref()) {
            info!(request_id = %request_id, "Session cookie issued");
            response.append_header(
                "set-cookie",
                format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Lax",
                    self.session_config.cookie_name, session_id
                ),
            );
        }
        response.set_header("x-request-id", request_id.to_string());
        response
    }
}

fn health_response() -> HandlerResponse {
    HandlerResponse::json(200, json!({ "status": "ok" }))
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = self.handle(parse_request(req));
        write_response(res, &response);
        Ok(())
    }
}
