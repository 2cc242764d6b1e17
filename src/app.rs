//! The forum's route table and its handler set.
//!
//! [`forum_routes`] declares the web, API and admin surfaces. Business logic
//! lives outside this crate, so [`forum_handlers`] binds every action to an
//! [`EchoAction`] except the session actions (`AuthController@login` and
//! `AuthController@logout`), which are implemented so the login redirect
//! round trip works end to end.

use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{AppConfig, SessionConfig};
use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::echo::EchoAction;
use crate::error::{ConfigError, HandlerError};
use crate::handler::{Handler, HandlerResult};
use crate::middleware::{CORS, MODERATOR, RATE_LIMIT, TRACE};
use crate::registry::HandlerRegistry;
use crate::router::{GroupOptions, RouteParams, RouteTable, RouteTableBuilder};

fn web_routes(r: &mut RouteTableBuilder) -> Result<(), ConfigError> {
    r.get("/", "HomeController@index")?;
    r.get("/login", "AuthController@showLogin")?;
    r.post("/login", "AuthController@login")?.middleware(RATE_LIMIT);
    r.get("/register", "AuthController@showRegister")?;
    r.post("/register", "AuthController@register")?
        .middleware(RATE_LIMIT);
    r.get("/categories", "CategoryController@index")?;
    r.get("/categories/{slug}", "CategoryController@show")?;

    // `/threads/create` must stay ahead of `/threads/{id}`.
    r.get("/threads/create", "ThreadController@create")?.auth();
    r.get("/threads/{id}", "ThreadController@show")?;
    r.get("/users/{id}", "UserController@profile")?;

    r.group(GroupOptions::new().auth(), |r| {
        r.post("/logout", "AuthController@logout")?;
        r.post("/threads", "ThreadController@store")?
            .middleware(RATE_LIMIT);
        r.get("/threads/{id}/edit", "ThreadController@edit")?;
        r.put("/threads/{id}", "ThreadController@update")?;
        r.delete("/threads/{id}", "ThreadController@destroy")?;
        r.post("/threads/{thread}/posts", "PostController@store")?
            .middleware(RATE_LIMIT);
        r.put("/posts/{id}", "PostController@update")?;
        r.delete("/posts/{id}", "PostController@destroy")?;
        r.post("/posts/{id}/reactions", "ReactionController@store")?;
        r.delete("/posts/{id}/reactions/{type}", "ReactionController@destroy")?;
        r.get("/notifications", "NotificationController@index")?;
        r.put("/notifications/{id}/read", "NotificationController@markRead")?;
        r.get("/messages", "MessageController@index")?;
        r.get("/messages/{id}", "MessageController@show")?;
        r.post("/messages", "MessageController@store")?
            .middleware(RATE_LIMIT);
        r.get("/settings", "UserController@settings")?;
        r.put("/settings", "UserController@updateSettings")?;

        r.group(
            GroupOptions::new()
                .prefix("/moderation")
                .middleware([MODERATOR]),
            |r| {
                r.get("/reports", "ModerationController@reports")?;
                r.put("/threads/{id}/lock", "ModerationController@lockThread")?;
                r.put("/threads/{id}/pin", "ModerationController@pinThread")?;
                r.delete("/posts/{id}", "ModerationController@deletePost")?;
                Ok(())
            },
        )
    })
}

fn api_routes(r: &mut RouteTableBuilder) -> Result<(), ConfigError> {
    r.group(
        GroupOptions::new()
            .prefix("/api")
            .middleware([CORS, RATE_LIMIT]),
        |r| {
            r.get("/categories", "Api\\CategoryController@index")?;
            r.get("/threads", "Api\\ThreadController@index")?;
            r.get("/threads/{id}", "Api\\ThreadController@show")?;
            r.get("/threads/{id}/posts", "Api\\PostController@index")?;
            r.get("/search", "Api\\SearchController@search")?;

            r.group(GroupOptions::new().auth(), |r| {
                r.post("/threads", "Api\\ThreadController@store")?;
                r.post("/threads/{id}/posts", "Api\\PostController@store")?;
                r.post("/posts/{id}/reactions", "Api\\ReactionController@toggle")?;
                r.get("/notifications", "Api\\NotificationController@index")?;
                r.get("/notifications/unread", "Api\\NotificationController@unread")?;
                r.get("/messages/{id}", "Api\\MessageController@show")?;
                Ok(())
            })
        },
    )
}

fn admin_routes(r: &mut RouteTableBuilder) -> Result<(), ConfigError> {
    r.group(GroupOptions::new().prefix("/admin").admin(), |r| {
        r.get("/", "AdminController@dashboard")?;
        r.get("/users", "AdminController@users")?;
        r.get("/users/edit/{id}", "AdminController@editUser")?;
        r.add(
            "/users/edit/{id}",
            "AdminController@updateUser",
            &[Method::POST, Method::PUT],
            true,
            true,
        )?;
        r.delete("/users/{id}", "AdminController@deleteUser")?;
        r.post("/users/{id}/ban", "AdminController@banUser")?;
        r.get("/categories", "AdminCategoryController@index")?;
        r.post("/categories", "AdminCategoryController@store")?;
        r.put("/categories/{id}", "AdminCategoryController@update")?;
        r.delete("/categories/{id}", "AdminCategoryController@destroy")?;
        r.get("/reports", "AdminController@reports")?;
        r.put("/reports/{id}/resolve", "AdminController@resolveReport")?;
        Ok(())
    })
}

/// The forum's full route table: web, API, then admin routes, all traced.
///
/// # Errors
///
/// Only on a malformed declaration.
pub fn forum_routes() -> Result<RouteTable, ConfigError> {
    let mut builder = RouteTable::builder();
    builder.group(GroupOptions::new().middleware([TRACE]), |r| {
        web_routes(r)?;
        api_routes(r)?;
        admin_routes(r)
    })?;
    builder.build()
}

/// Role stored for every login unless role selection is enabled.
pub const DEFAULT_ROLE: &str = "member";

/// Stores the posted `user_id` in the session with the [`DEFAULT_ROLE`], then
/// sends the client back to where the auth middleware intercepted it.
///
/// With [`LoginAction::allow_role_selection`] (debug servers only) a posted
/// `role` is stored instead.
#[derive(Debug, Clone)]
pub struct LoginAction {
    session: SessionConfig,
    role_selection: bool,
}

impl LoginAction {
    #[must_use]
    pub fn new(session: &SessionConfig) -> Self {
        Self {
            session: session.clone(),
            role_selection: false,
        }
    }

    #[must_use]
    pub fn allow_role_selection(mut self, allow: bool) -> Self {
        self.role_selection = allow;
        self
    }
}

impl Handler for LoginAction {
    fn call(&self, ctx: &mut RequestContext, _params: &RouteParams) -> HandlerResult {
        let body = ctx.body.as_ref();
        let user_id = match body.and_then(|b| b.get("user_id")) {
            Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
            Some(Value::Number(n)) => Value::Number(n.clone()),
            _ => return Err(HandlerError::InvalidInput("user_id is required".into())),
        };
        let requested = body.and_then(|b| b.get("role")).and_then(Value::as_str);
        let role = match requested {
            Some(role) if self.role_selection => role.to_string(),
            Some(role) => {
                warn!(
                    request_id = %ctx.request_id,
                    requested_role = %role,
                    "Role selection disabled, ignoring posted role"
                );
                DEFAULT_ROLE.to_string()
            }
            None => DEFAULT_ROLE.to_string(),
        };

        info!(request_id = %ctx.request_id, user_id = %user_id, role = %role, "User logged in");
        ctx.session.set(&self.session.user_key, user_id);
        ctx.session.set(&self.session.role_key, Value::String(role));

        let target = ctx
            .session
            .remove(&self.session.intended_url_key)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "/".to_string());
        Ok(HandlerResponse::redirect(&target))
    }
}

/// Clears the login state.
#[derive(Debug, Clone)]
pub struct LogoutAction {
    session: SessionConfig,
}

impl LogoutAction {
    #[must_use]
    pub fn new(session: &SessionConfig) -> Self {
        Self {
            session: session.clone(),
        }
    }
}

impl Handler for LogoutAction {
    fn call(&self, ctx: &mut RequestContext, _params: &RouteParams) -> HandlerResult {
        ctx.session.remove(&self.session.user_key);
        ctx.session.remove(&self.session.role_key);
        Ok(HandlerResponse::redirect("/"))
    }
}

/// Handlers for every reference in `table`: the session actions, and an
/// [`EchoAction`] for everything else. Login role selection follows
/// `server.debug`.
///
/// # Errors
///
/// Never in practice; references in a built table are already valid.
pub fn forum_handlers(
    table: &RouteTable,
    config: &AppConfig,
) -> Result<HandlerRegistry, ConfigError> {
    let session = &config.session;
    let mut registry = HandlerRegistry::new();
    for route in table.iter() {
        if !registry.contains(&route.handler) {
            registry.insert(
                route.handler.clone(),
                Arc::new(EchoAction::new(route.handler.clone())),
            );
        }
    }
    registry
        .controller("AuthController")
        .action(
            "login",
            LoginAction::new(session).allow_role_selection(config.server.debug),
        )?
        .action("logout", LogoutAction::new(session))?;
    Ok(registry)
}
