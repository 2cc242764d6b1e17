//! Request-time capability checks.
//!
//! Middleware run in chain-of-responsibility order: outer group, inner group,
//! then route-specific. Each one either passes the request on through
//! [`Next::run`] or halts with its own response.

mod auth;
mod core;
mod cors;
mod rate_limit;
mod registry;
mod role;
mod tracing;

pub use self::auth::AuthMiddleware;
pub use self::core::{Middleware, Next};
pub use self::cors::{CorsConfigError, CorsMiddleware, OriginValidation};
pub use self::rate_limit::{RateDecision, RateLimitMiddleware};
pub use self::registry::{
    MiddlewareRegistry, ADMIN, AUTH, CORS, MODERATOR, RATE_LIMIT, TRACE,
};
pub use self::role::RoleMiddleware;
pub use self::tracing::TracingMiddleware;
