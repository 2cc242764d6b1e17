//! Route table and its registration builder.
//!
//! The table is built once at startup through [`RouteTableBuilder`] and is
//! immutable afterwards. Groups are an explicit scope stack: `push_group`
//! accumulates a prefix, middleware and auth/admin flags on top of the
//! enclosing scope, `pop_group` restores it. [`RouteTableBuilder::group`] is
//! sugar running a closure between the two.
//!
//! The `auth`/`admin` flags are also written into the middleware list as
//! `Auth`/`Admin`, at the position where they were declared: ahead of the
//! declaring group's own middleware, after everything from enclosing groups.
//! `admin` implies `auth`.

use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use super::pattern::{join_paths, PathPattern};
use crate::error::ConfigError;
use crate::handler::HandlerRef;
use crate::middleware::{ADMIN, AUTH};

/// Verbs a route may be registered for.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: HandlerRef,
    /// Middleware ids in run order, outer group first, route-specific last.
    /// Includes the `Auth`/`Admin` checks implied by the flags.
    pub middleware: Vec<String>,
    pub requires_auth: bool,
    pub requires_admin: bool,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.pattern, self.handler)
    }
}

/// Options of a route group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOptions {
    pub prefix: String,
    pub middleware: Vec<String>,
    pub auth: bool,
    pub admin: bool,
}

impl GroupOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn middleware<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn auth(mut self) -> Self {
        self.auth = true;
        self
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }
}

/// Immutable, ordered collection of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// Routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }
}

/// Insert the checks implied by `auth`/`admin` at `*pos`, skipping ids the
/// chain already has. `*pos` ends up past the inserted or existing checks.
fn insert_flag_checks(middleware: &mut Vec<String>, pos: &mut usize, auth: bool, admin: bool) {
    let mut insert = |id: &str| match middleware.iter().position(|m| m == id) {
        Some(existing) => *pos = (*pos).max(existing + 1),
        None => {
            middleware.insert(*pos, id.to_string());
            *pos += 1;
        }
    };
    if auth || admin {
        insert(AUTH);
    }
    if admin {
        insert(ADMIN);
    }
}

/// Accumulated state of the enclosing groups.
#[derive(Debug, Clone, Default)]
struct Scope {
    prefix: String,
    middleware: Vec<String>,
    auth: bool,
    admin: bool,
}

/// Append-only route registration.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
    scopes: Vec<Scope>,
}

impl RouteTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn current_scope(&self) -> Scope {
        self.scopes.last().cloned().unwrap_or_default()
    }

    /// Register `pattern` for every method in `methods`.
    ///
    /// The enclosing groups' prefix is prepended to the pattern and their
    /// middleware precedes any middleware later added through the returned
    /// [`RouteHandle`].
    ///
    /// # Errors
    ///
    /// Fails with a [`ConfigError`] on a malformed pattern or handler
    /// reference, an empty method list or an unsupported method.
    pub fn add(
        &mut self,
        pattern: &str,
        handler: &str,
        methods: &[Method],
        requires_auth: bool,
        requires_admin: bool,
    ) -> Result<RouteHandle<'_>, ConfigError> {
        if methods.is_empty() {
            return Err(ConfigError::NoMethods(pattern.to_string()));
        }
        if let Some(bad) = methods.iter().find(|m| !SUPPORTED_METHODS.contains(m)) {
            return Err(ConfigError::UnsupportedMethod(bad.to_string()));
        }

        let scope = self.current_scope();
        let compiled = PathPattern::parse(&join_paths(&scope.prefix, pattern))?;
        let handler_ref = HandlerRef::parse(handler)?;

        let mut middleware = scope.middleware;
        let mut flag_pos = middleware.len();
        insert_flag_checks(&mut middleware, &mut flag_pos, requires_auth, requires_admin);
        let requires_admin = scope.admin || requires_admin;
        let requires_auth = scope.auth || requires_auth || requires_admin;

        let start = self.routes.len();
        let mut seen: Vec<&Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if seen.contains(&method) {
                continue;
            }
            seen.push(method);
            debug!(
                method = %method,
                pattern = %compiled,
                handler = %handler_ref,
                "Route registered"
            );
            self.routes.push(Route {
                method: method.clone(),
                pattern: compiled.clone(),
                handler: handler_ref.clone(),
                middleware: middleware.clone(),
                requires_auth,
                requires_admin,
            });
        }

        Ok(RouteHandle {
            routes: &mut self.routes[start..],
            flag_pos,
        })
    }

    pub fn get(&mut self, pattern: &str, handler: &str) -> Result<RouteHandle<'_>, ConfigError> {
        self.add(pattern, handler, &[Method::GET], false, false)
    }

    pub fn post(&mut self, pattern: &str, handler: &str) -> Result<RouteHandle<'_>, ConfigError> {
        self.add(pattern, handler, &[Method::POST], false, false)
    }

    pub fn put(&mut self, pattern: &str, handler: &str) -> Result<RouteHandle<'_>, ConfigError> {
        self.add(pattern, handler, &[Method::PUT], false, false)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        handler: &str,
    ) -> Result<RouteHandle<'_>, ConfigError> {
        self.add(pattern, handler, &[Method::DELETE], false, false)
    }

    pub fn options(
        &mut self,
        pattern: &str,
        handler: &str,
    ) -> Result<RouteHandle<'_>, ConfigError> {
        self.add(pattern, handler, &[Method::OPTIONS], false, false)
    }

    /// Open a group scope on top of the current one.
    ///
    /// The group's `Auth`/`Admin` checks run after the enclosing groups'
    /// middleware and before the group's own.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedPattern`] when the joined prefix does not
    /// parse. No scope is opened in that case.
    pub fn push_group(&mut self, options: GroupOptions) -> Result<(), ConfigError> {
        let parent = self.current_scope();
        let prefix = join_paths(&parent.prefix, &options.prefix);
        PathPattern::parse(&prefix)?;

        let mut middleware = parent.middleware;
        let mut flag_pos = middleware.len();
        middleware.extend(options.middleware);
        insert_flag_checks(&mut middleware, &mut flag_pos, options.auth, options.admin);
        let admin = parent.admin || options.admin;
        self.scopes.push(Scope {
            prefix,
            middleware,
            auth: parent.auth || options.auth || admin,
            admin,
        });
        Ok(())
    }

    /// Close the innermost group scope.
    ///
    /// # Errors
    ///
    /// [`ConfigError::GroupUnderflow`] when no group is open.
    pub fn pop_group(&mut self) -> Result<(), ConfigError> {
        self.scopes
            .pop()
            .map(|_| ())
            .ok_or(ConfigError::GroupUnderflow)
    }

    /// Run `f` inside a group scope. The scope is closed even when `f` fails.
    pub fn group<F>(&mut self, options: GroupOptions, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConfigError>,
    {
        self.push_group(options)?;
        let result = f(self);
        self.pop_group()?;
        result
    }

    /// Current group nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Freeze the table.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnclosedGroups`] when groups are still open.
    pub fn build(self) -> Result<RouteTable, ConfigError> {
        if !self.scopes.is_empty() {
            return Err(ConfigError::UnclosedGroups(self.scopes.len()));
        }
        info!(routes_count = self.routes.len(), "Route table built");
        Ok(RouteTable {
            routes: self.routes.into_iter().map(Arc::new).collect(),
        })
    }
}

/// Handle on the route(s) produced by one registration call.
#[derive(Debug)]
pub struct RouteHandle<'a> {
    routes: &'a mut [Route],
    /// Where route-level `Auth`/`Admin` checks go: after the group
    /// middleware and the checks already inserted.
    flag_pos: usize,
}

impl RouteHandle<'_> {
    /// Append a route-specific middleware after the group middleware.
    pub fn middleware(self, id: &str) -> Self {
        for route in self.routes.iter_mut() {
            route.middleware.push(id.to_string());
        }
        self
    }

    pub fn auth(self) -> Self {
        self.flag(true, false)
    }

    /// Require an admin. Implies [`RouteHandle::auth`].
    pub fn admin(self) -> Self {
        self.flag(true, true)
    }

    fn flag(mut self, auth: bool, admin: bool) -> Self {
        let mut next_pos = self.flag_pos;
        for route in self.routes.iter_mut() {
            let mut pos = self.flag_pos;
            insert_flag_checks(&mut route.middleware, &mut pos, auth, admin);
            route.requires_auth |= auth;
            route.requires_admin |= admin;
            next_pos = pos;
        }
        self.flag_pos = next_pos;
        self
    }
}
