use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, error, info, warn};

use super::HandlerResponse;
use crate::context::RequestContext;
use crate::error::{ConfigError, HandlerError};
use crate::handler::Handler;
use crate::middleware::{CorsMiddleware, Middleware, MiddlewareRegistry, Next};
use crate::registry::HandlerRegistry;
use crate::router::{Route, RouteOutcome, RouteTable, Router};

/// Handlers slower than this are logged at `warn`.
pub const SLOW_HANDLER_THRESHOLD: Duration = Duration::from_millis(500);

/// Why a request ended without reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    MethodNotAllowed,
    /// A middleware returned its own response.
    Halted,
}

/// Lifecycle of one dispatch.
///
/// `Unmatched -> Matched -> Authorized -> Completed`, with `Rejected` reachable
/// from `Unmatched` (no route) and from `Matched` (middleware halt).
/// `Preflight` marks an `OPTIONS` request answered before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Unmatched,
    Matched,
    Authorized,
    Completed,
    Rejected(Rejection),
    Preflight,
}

impl DispatchState {
    /// Whether the route handler produced the response.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchState::Completed)
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Unmatched => write!(f, "unmatched"),
            DispatchState::Matched => write!(f, "matched"),
            DispatchState::Authorized => write!(f, "authorized"),
            DispatchState::Completed => write!(f, "completed"),
            DispatchState::Rejected(Rejection::NotFound) => write!(f, "rejected:not_found"),
            DispatchState::Rejected(Rejection::MethodNotAllowed) => {
                write!(f, "rejected:method_not_allowed")
            }
            DispatchState::Rejected(Rejection::Halted) => write!(f, "rejected:halted"),
            DispatchState::Preflight => write!(f, "preflight"),
        }
    }
}

/// Terminal result of [`Dispatcher::run`].
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub state: DispatchState,
    pub response: HandlerResponse,
    /// The matched route, if any.
    pub route: Option<Arc<Route>>,
}

/// A route with its handler and middleware chain resolved.
struct ResolvedRoute {
    handler: Arc<dyn Handler>,
    chain: Vec<Arc<dyn Middleware>>,
}

/// Routes requests to resolved handlers through their middleware chains.
///
/// Built once at startup. Every handler reference and middleware id in the
/// table is resolved in [`Dispatcher::build`]; nothing is looked up by name
/// while serving. The dispatcher is immutable afterwards and can be shared
/// across coroutines behind an `Arc`.
pub struct Dispatcher {
    router: Router,
    resolved: Vec<ResolvedRoute>,
    cors: CorsMiddleware,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.resolved.len())
            .field("cors", &self.cors)
            .finish()
    }
}

impl Dispatcher {
    /// Resolve every route of `table` against the registries.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownHandler`] or [`ConfigError::UnknownMiddleware`]
    /// for the first route that references something unregistered.
    pub fn build(
        table: RouteTable,
        handlers: &HandlerRegistry,
        middleware: &MiddlewareRegistry,
    ) -> Result<Self, ConfigError> {
        let mut resolved = Vec::with_capacity(table.len());
        for route in table.iter() {
            let handler = handlers.resolve(&route.handler).ok_or_else(|| {
                error!(
                    handler = %route.handler,
                    method = %route.method,
                    pattern = %route.pattern,
                    "Handler not registered"
                );
                ConfigError::UnknownHandler {
                    handler: route.handler.to_string(),
                    method: route.method.to_string(),
                    pattern: route.pattern.to_string(),
                }
            })?;

            let chain = route
                .middleware
                .iter()
                .map(|id| {
                    middleware.get(id).ok_or_else(|| {
                        error!(
                            middleware = %id,
                            method = %route.method,
                            pattern = %route.pattern,
                            "Middleware not registered"
                        );
                        ConfigError::UnknownMiddleware {
                            name: id.clone(),
                            method: route.method.to_string(),
                            pattern: route.pattern.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            resolved.push(ResolvedRoute { handler, chain });
        }

        info!(
            routes_count = resolved.len(),
            handlers_count = handlers.len(),
            middleware_count = middleware.len(),
            "Dispatcher ready"
        );

        Ok(Self {
            router: Router::new(table),
            resolved,
            cors: middleware.cors().clone(),
        })
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve one request.
    ///
    /// `OPTIONS` is answered with a CORS preflight response before routing.
    /// Otherwise the first matching route's middleware run in order, then its
    /// handler. Not-found, method-not-allowed and middleware halts are normal
    /// outcomes carrying their response.
    ///
    /// # Errors
    ///
    /// A [`HandlerError`] raised by a middleware or the handler is returned
    /// untouched for the caller's error renderer.
    pub fn run(&self, ctx: &mut RequestContext) -> Result<DispatchOutcome, HandlerError> {
        if ctx.method == Method::OPTIONS {
            debug!(request_id = %ctx.request_id, path = %ctx.path, "Preflight short-circuit");
            return Ok(DispatchOutcome {
                state: DispatchState::Preflight,
                response: self.cors.preflight(ctx),
                route: None,
            });
        }

        let route_match = match self.router.route(&ctx.method, &ctx.path) {
            RouteOutcome::Matched(m) => m,
            RouteOutcome::MethodNotAllowed { allowed } => {
                return Ok(self.rejected(
                    ctx,
                    Rejection::MethodNotAllowed,
                    HandlerResponse::method_not_allowed(&allowed),
                ));
            }
            RouteOutcome::NotFound => {
                let response = HandlerResponse::not_found(&ctx.method, &ctx.path);
                return Ok(self.rejected(ctx, Rejection::NotFound, response));
            }
        };

        let Some(resolved) = self.resolved.get(route_match.index) else {
            // Router and resolved routes are built from the same table.
            error!(index = route_match.index, "Matched route has no resolved entry");
            return Err(HandlerError::Internal(anyhow::anyhow!(
                "route {} was not resolved",
                route_match.route
            )));
        };
        let route = route_match.route;
        let params = route_match.params;

        debug!(
            request_id = %ctx.request_id,
            state = %DispatchState::Matched,
            handler = %route.handler,
            middleware_count = resolved.chain.len(),
            "Running middleware chain"
        );

        let invoked = Cell::new(false);
        let handler_started = Cell::new(None::<Instant>);
        let endpoint = |ctx: &mut RequestContext| {
            invoked.set(true);
            handler_started.set(Some(Instant::now()));
            debug!(
                request_id = %ctx.request_id,
                state = %DispatchState::Authorized,
                handler = %route.handler,
                "Invoking handler"
            );
            resolved.handler.call(ctx, &params)
        };

        let result = Next::new(&resolved.chain, &endpoint).run(ctx);

        let elapsed = handler_started.get().map(|start| start.elapsed());
        if let Some(elapsed) = elapsed {
            if elapsed > SLOW_HANDLER_THRESHOLD {
                warn!(
                    request_id = %ctx.request_id,
                    handler = %route.handler,
                    latency_ms = elapsed.as_millis() as u64,
                    "Slow handler"
                );
            }
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                error!(
                    request_id = %ctx.request_id,
                    handler = %route.handler,
                    error = %err,
                    "Handler failed"
                );
                return Err(err);
            }
        };

        let state = if invoked.get() {
            DispatchState::Completed
        } else {
            DispatchState::Rejected(Rejection::Halted)
        };
        info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            handler = %route.handler,
            state = %state,
            status = response.status,
            latency_ms = elapsed.map(|e| e.as_millis() as u64),
            "Request dispatched"
        );

        Ok(DispatchOutcome {
            state,
            response,
            route: Some(route),
        })
    }

    fn rejected(
        &self,
        ctx: &RequestContext,
        rejection: Rejection,
        response: HandlerResponse,
    ) -> DispatchOutcome {
        let state = DispatchState::Rejected(rejection);
        info!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            state = %state,
            status = response.status,
            "Request rejected"
        );
        DispatchOutcome {
            state,
            response,
            route: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DispatchState::Completed.to_string(), "completed");
        assert_eq!(
            DispatchState::Rejected(Rejection::Halted).to_string(),
            "rejected:halted"
        );
    }
}
