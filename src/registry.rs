//! Handler registry: `Controller@action` keys mapped to typed handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::handler::{Handler, HandlerRef};

/// Statically registered route actions, looked up once when the dispatcher is
/// built.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerRef, Arc<dyn Handler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &keys)
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under a `Controller@action` reference.
    ///
    /// Registering the same reference twice replaces the earlier handler.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedHandlerRef`] for a malformed reference.
    pub fn register<H>(&mut self, reference: &str, handler: H) -> Result<&mut Self, ConfigError>
    where
        H: Handler + 'static,
    {
        let key = HandlerRef::parse(reference)?;
        self.insert(key, Arc::new(handler));
        Ok(self)
    }

    /// Register an already shared handler.
    pub fn insert(&mut self, key: HandlerRef, handler: Arc<dyn Handler>) {
        if self.handlers.insert(key.clone(), handler).is_some() {
            warn!(handler = %key, "Replaced existing handler");
        } else {
            info!(
                handler = %key,
                total_handlers = self.handlers.len(),
                "Handler registered"
            );
        }
    }

    /// Scope registrations under one controller name.
    pub fn controller<'a>(&'a mut self, name: &str) -> ControllerScope<'a> {
        ControllerScope {
            registry: self,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn resolve(&self, key: &HandlerRef) -> Option<Arc<dyn Handler>> {
        self.handlers.get(key).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, key: &HandlerRef) -> bool {
        self.handlers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registers actions of a single controller.
pub struct ControllerScope<'a> {
    registry: &'a mut HandlerRegistry,
    name: String,
}

impl ControllerScope<'_> {
    /// Register `handler` as `<controller>@<action>`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedHandlerRef`] when the combined reference is malformed.
    pub fn action<H>(self, action: &str, handler: H) -> Result<Self, ConfigError>
    where
        H: Handler + 'static,
    {
        let reference = format!("{}@{}", self.name, action);
        self.registry.register(&reference, handler)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::dispatcher::HandlerResponse;
    use crate::handler::HandlerResult;
    use crate::router::RouteParams;
    use http::Method;

    fn ok(_: &mut RequestContext, _: &RouteParams) -> HandlerResult {
        Ok(HandlerResponse::text(200, "ok".into()))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HandlerRegistry::new();
        registry.register("HomeController@index", ok).unwrap();
        registry
            .controller("ThreadController")
            .action("show", ok)
            .unwrap()
            .action("store", ok)
            .unwrap();
        assert_eq!(registry.len(), 3);

        let key = HandlerRef::parse("ThreadController@store").unwrap();
        let handler = registry.resolve(&key).unwrap();
        let mut ctx = RequestContext::new(Method::POST, "/threads");
        let res = handler.call(&mut ctx, &RouteParams::default()).unwrap();
        assert_eq!(res.status, 200);

        let missing = HandlerRef::parse("ThreadController@destroy").unwrap();
        assert!(registry.resolve(&missing).is_none());
    }

    #[test]
    fn test_malformed_reference_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register("index", ok).is_err());
        assert!(registry.is_empty());
    }
}
