//! Handler references and the handler trait.
//!
//! Routes name their action with a `Controller@action` string. The string is
//! parsed into a [`HandlerRef`] at registration and resolved to a typed
//! [`Handler`] once, when the dispatcher is built.

use std::fmt;

use crate::context::RequestContext;
use crate::error::{ConfigError, HandlerError};
use crate::dispatcher::HandlerResponse;
use crate::router::RouteParams;

/// What a handler (or a middleware) produces for one request.
pub type HandlerResult = Result<HandlerResponse, HandlerError>;

/// Parsed `Controller@action` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    controller: String,
    action: String,
}

impl HandlerRef {
    /// Parse a `Controller@action` string.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedHandlerRef`] unless the string has exactly one
    /// `@` with non-empty, whitespace-free text on both sides.
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedHandlerRef(reference.to_string());
        let (controller, action) = reference.split_once('@').ok_or_else(malformed)?;
        let valid = |s: &str| !s.is_empty() && !s.contains('@') && !s.contains(char::is_whitespace);
        if !valid(controller) || !valid(action) {
            return Err(malformed());
        }
        Ok(Self {
            controller: controller.to_string(),
            action: action.to_string(),
        })
    }

    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.controller, self.action)
    }
}

impl std::str::FromStr for HandlerRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An executable route action.
///
/// Any `Fn(&mut RequestContext, &RouteParams) -> HandlerResult` closure is a
/// handler.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &mut RequestContext, params: &RouteParams) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext, &RouteParams) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &mut RequestContext, params: &RouteParams) -> HandlerResult {
        self(ctx, params)
    }
}

/// Pins a closure to the handler signature so its argument types are inferred.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut RequestContext, &RouteParams) -> HandlerResult + Send + Sync,
{
    f
}
