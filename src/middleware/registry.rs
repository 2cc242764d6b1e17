use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{
    AuthMiddleware, CorsMiddleware, Middleware, RateLimitMiddleware, RoleMiddleware,
    TracingMiddleware,
};
use crate::config::AppConfig;
use crate::error::ConfigError;

pub const AUTH: &str = "Auth";
pub const ADMIN: &str = "Admin";
pub const MODERATOR: &str = "Moderator";
pub const CORS: &str = "Cors";
pub const RATE_LIMIT: &str = "RateLimit";
pub const TRACE: &str = "Trace";

/// Middleware instances by the id routes refer to them with.
///
/// The CORS middleware is also kept as a concrete value because the
/// dispatcher answers `OPTIONS` requests with it directly.
#[derive(Clone)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
    cors: Arc<CorsMiddleware>,
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MiddlewareRegistry")
            .field("middleware", &names)
            .field("cors", &self.cors)
            .finish()
    }
}

impl MiddlewareRegistry {
    /// An empty registry whose preflight answers use `cors`.
    #[must_use]
    pub fn new(cors: CorsMiddleware) -> Self {
        Self {
            entries: HashMap::new(),
            cors: Arc::new(cors),
        }
    }

    /// Registry with every built-in middleware, configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cors`] when the CORS section is invalid.
    pub fn standard(config: &AppConfig) -> Result<Self, ConfigError> {
        let cors = CorsMiddleware::from_config(&config.cors)?;
        let mut registry = Self::new(cors);
        let cors: Arc<CorsMiddleware> = Arc::clone(&registry.cors);
        registry
            .insert(AUTH, Arc::new(AuthMiddleware::new(&config.session)))
            .insert(ADMIN, Arc::new(RoleMiddleware::admin(&config.session)))
            .insert(
                MODERATOR,
                Arc::new(RoleMiddleware::moderator(&config.session)),
            )
            .insert(CORS, cors)
            .insert(
                RATE_LIMIT,
                Arc::new(RateLimitMiddleware::from_config(
                    &config.rate_limit,
                    &config.session,
                )),
            )
            .insert(TRACE, Arc::new(TracingMiddleware));
        Ok(registry)
    }

    /// Register (or replace) the middleware known as `name`.
    pub fn insert(&mut self, name: &str, middleware: Arc<dyn Middleware>) -> &mut Self {
        debug!(middleware = %name, "Middleware registered");
        self.entries.insert(name.to_string(), middleware);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn cors(&self) -> &CorsMiddleware {
        &self.cors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        Self::new(CorsMiddleware::default())
    }
}
