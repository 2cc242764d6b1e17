use std::time::Instant;

use tracing::{info, info_span, warn};

use super::{Middleware, Next};
use crate::context::RequestContext;
use crate::handler::HandlerResult;

/// Wraps the rest of the chain in a `request` span and logs status and latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        "Trace"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        let span = info_span!(
            "request",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.run(ctx);
        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(res) => info!(status = res.status, latency_ms, "Request completed"),
            Err(e) => warn!(error = %e, latency_ms, "Request failed"),
        }
        result
    }
}
