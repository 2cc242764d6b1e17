use tracing::warn;

use super::{Middleware, Next};
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::handler::HandlerResult;

/// Requires the session role to be one of a fixed set; `403` otherwise.
#[derive(Debug, Clone)]
pub struct RoleMiddleware {
    name: String,
    role_key: String,
    allowed_roles: Vec<String>,
}

impl RoleMiddleware {
    #[must_use]
    pub fn new(name: &str, role_key: &str, allowed_roles: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            role_key: role_key.to_string(),
            allowed_roles: allowed_roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Role must be `admin`.
    #[must_use]
    pub fn admin(config: &SessionConfig) -> Self {
        Self::new("Admin", &config.role_key, &["admin"])
    }

    /// Role must be `admin` or `moderator`.
    #[must_use]
    pub fn moderator(config: &SessionConfig) -> Self {
        Self::new("Moderator", &config.role_key, &["admin", "moderator"])
    }

    #[must_use]
    pub fn allowed_roles(&self) -> &[String] {
        &self.allowed_roles
    }
}

impl Middleware for RoleMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        let role = ctx.session.get_str(&self.role_key);
        if role.is_some_and(|r| self.allowed_roles.iter().any(|a| a == r)) {
            return next.run(ctx);
        }
        warn!(
            request_id = %ctx.request_id,
            middleware = %self.name,
            role = ?role,
            path = %ctx.path,
            "Role check failed"
        );
        Ok(HandlerResponse::error(403, "Forbidden"))
    }
}
