//! Error taxonomy for the routing core.
//!
//! Two families are kept strictly apart:
//!
//! - [`ConfigError`] is raised while the route table, handler registry or
//!   middleware registry is being built. It is fatal and never produced while
//!   serving a request.
//! - [`HandlerError`] is a failure raised by a handler (or a middleware) while
//!   serving one request. The dispatcher never swallows it; it is returned to
//!   the caller, which hands it to an [`ErrorRenderer`].
//!
//! Not-found, method-not-allowed and authorization rejections are *not*
//! errors: they are deterministic responses produced by the dispatcher or by a
//! middleware.

use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::dispatcher::HandlerResponse;
use crate::middleware::CorsConfigError;

/// Fatal configuration problem detected at registration or startup time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A route pattern could not be parsed.
    #[error("malformed route pattern '{pattern}': {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// A handler reference is not of the form `Controller@action`.
    #[error("malformed handler reference '{0}': expected 'Controller@action'")]
    MalformedHandlerRef(String),

    /// A route points at a handler that was never registered.
    #[error("unresolvable handler '{handler}' for {method} {pattern}")]
    UnknownHandler {
        handler: String,
        method: String,
        pattern: String,
    },

    /// A route names a middleware that was never registered.
    #[error("unknown middleware '{name}' for {method} {pattern}")]
    UnknownMiddleware {
        name: String,
        method: String,
        pattern: String,
    },

    /// A route was registered for a verb outside GET/POST/PUT/DELETE/OPTIONS.
    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    /// A route was registered without any method.
    #[error("route '{0}' was registered without any HTTP method")]
    NoMethods(String),

    /// `pop_group` was called with no open group.
    #[error("route group stack underflow: pop_group without matching push_group")]
    GroupUnderflow,

    /// The table was built while groups were still open.
    #[error("{0} route group(s) still open when the route table was built")]
    UnclosedGroups(usize),

    /// The CORS middleware configuration is invalid.
    #[error(transparent)]
    Cors(#[from] CorsConfigError),

    /// A route manifest could not be parsed.
    #[error("invalid route manifest: {0}")]
    Manifest(String),
}

/// Failure raised while serving a single request.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler rejected the request input.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The handler panicked; the payload message is preserved.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Any other failure raised by application code.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    /// Messages of this error followed by every `source()` in its chain.
    #[must_use]
    pub fn chain_messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        if let HandlerError::Internal(inner) = self {
            messages.extend(inner.chain().skip(1).map(ToString::to_string));
        }
        messages
    }
}

/// Turns a [`HandlerError`] into a response.
///
/// In debug mode the response carries the error message and its cause chain;
/// in production it is a generic failure page that leaks nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRenderer {
    debug: bool,
}

impl ErrorRenderer {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Render a handler failure.
    #[must_use]
    pub fn render(&self, err: &HandlerError) -> HandlerResponse {
        let status = match err {
            HandlerError::InvalidInput(_) => 400,
            _ => 500,
        };

        error!(
            status = status,
            error = %err,
            debug = self.debug,
            "Handler failure rendered"
        );

        if self.debug {
            return HandlerResponse::json(
                status,
                json!({
                    "error": err.to_string(),
                    "chain": err.chain_messages(),
                }),
            );
        }

        match err {
            HandlerError::InvalidInput(msg) => HandlerResponse::error(400, msg),
            _ => HandlerResponse::html(
                500,
                "<h1>Something went wrong</h1><p>Please try again later.</p>".to_string(),
            ),
        }
    }
}
