//! # Dispatcher
//!
//! Single per-request entry point of the routing core.
//!
//! [`Dispatcher::build`] takes the finished [`RouteTable`](crate::router::RouteTable)
//! and resolves, once, every `Controller@action` reference through the
//! [`HandlerRegistry`](crate::registry::HandlerRegistry) and every middleware
//! id through the [`MiddlewareRegistry`](crate::middleware::MiddlewareRegistry).
//! A missing entry is a [`ConfigError`](crate::error::ConfigError) at startup,
//! never a request failure.
//!
//! ## Request flow
//!
//! 1. `OPTIONS` requests get a `200` CORS preflight answer; routing is skipped.
//! 2. The table is scanned in registration order; the first route whose method
//!    and pattern both match wins.
//! 3. A path that only matches under other methods gets `405` with `Allow`;
//!    anything else unmatched gets `404`.
//! 4. The route's middleware run outer group first, route-specific last; any
//!    of them may halt with its own response.
//! 5. The handler receives the context and the bound parameters.
//!
//! Handler errors come back as `Err` for the caller to render.

mod core;
mod response;

pub use self::core::{
    DispatchOutcome, DispatchState, Dispatcher, Rejection, SLOW_HANDLER_THRESHOLD,
};
pub use self::response::{HandlerResponse, HeaderVec, ResponseBody, MAX_INLINE_HEADERS};
