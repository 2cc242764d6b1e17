use serde_json::{json, Map, Value};

use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::handler::{Handler, HandlerRef, HandlerResult};
use crate::router::RouteParams;

/// Placeholder action: echoes back what the dispatcher handed it.
#[derive(Debug, Clone)]
pub struct EchoAction {
    handler: HandlerRef,
}

impl EchoAction {
    #[must_use]
    pub fn new(handler: HandlerRef) -> Self {
        Self { handler }
    }
}

impl Handler for EchoAction {
    fn call(&self, ctx: &mut RequestContext, params: &RouteParams) -> HandlerResult {
        let params: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let query: Map<String, Value> = ctx
            .query_params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();

        Ok(HandlerResponse::json(
            200,
            json!({
                "handler": self.handler.to_string(),
                "method": ctx.method.as_str(),
                "path": ctx.path,
                "params": params,
                "query": query,
                "user_id": ctx.attributes.get("user_id"),
                "body": ctx.body,
                "request_id": ctx.request_id.to_string(),
            }),
        ))
    }
}
