use std::sync::Arc;

use crate::context::RequestContext;
use crate::handler::HandlerResult;

/// A request-time capability check.
///
/// A middleware either passes the request on by calling [`Next::run`]
/// (optionally touching the context before, or the response after), or halts
/// the chain by returning its own response without calling `next`. Nothing
/// later in the chain runs after a halt, including the handler.
pub trait Middleware: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult;
}

/// The remainder of a middleware chain, ending in the route handler.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Fn(&mut RequestContext) -> HandlerResult,
}

impl<'a> Next<'a> {
    #[must_use]
    pub fn new(
        chain: &'a [Arc<dyn Middleware>],
        endpoint: &'a dyn Fn(&mut RequestContext) -> HandlerResult,
    ) -> Self {
        Self { chain, endpoint }
    }

    /// Hand the request to the next middleware, or to the handler when the
    /// chain is exhausted.
    pub fn run(self, ctx: &mut RequestContext) -> HandlerResult {
        match self.chain.split_first() {
            Some((middleware, rest)) => middleware.handle(
                ctx,
                Next {
                    chain: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => (self.endpoint)(ctx),
        }
    }

    /// Middleware still to run after this point.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}
