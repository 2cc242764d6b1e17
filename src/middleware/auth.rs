use http::Method;
use serde_json::Value;
use tracing::{debug, info};

use super::{Middleware, Next};
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::handler::HandlerResult;

/// Requires a logged-in session.
///
/// Without one, the client is redirected to the login page. For `GET`
/// requests the requested URL is remembered in the session first, so the
/// client can be sent back after authenticating. With one, the user id is attached to the context as the
/// `user_id` attribute.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    user_key: String,
    intended_url_key: String,
    login_path: String,
}

impl AuthMiddleware {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            user_key: config.user_key.clone(),
            intended_url_key: config.intended_url_key.clone(),
            login_path: config.login_path.clone(),
        }
    }
}

impl Default for AuthMiddleware {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &str {
        "Auth"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        let user = ctx.session.get(&self.user_key).cloned();
        match user {
            Some(user_id) if !user_id.is_null() => {
                debug!(request_id = %ctx.request_id, user_id = %user_id, "Session authenticated");
                ctx.attributes.insert("user_id".to_string(), user_id);
                next.run(ctx)
            }
            _ => {
                info!(
                    request_id = %ctx.request_id,
                    method = %ctx.method,
                    path = %ctx.path,
                    login_path = %self.login_path,
                    "Unauthenticated request redirected to login"
                );
                // The login redirect comes back with a GET
                if ctx.method == Method::GET {
                    let intended = ctx.full_path();
                    ctx.session
                        .set(&self.intended_url_key, Value::String(intended));
                }
                Ok(HandlerResponse::redirect(&self.login_path))
            }
        }
    }
}
