//! # forumrouter
//!
//! Request routing core of a web forum: route registration with nested
//! groups, `{name}` path matching, an ordered middleware pipeline and a
//! dispatcher that runs `Controller@action` handlers resolved at startup.
//!
//! ## Architecture
//!
//! - **[`router`]** - route table, group scope builder and first-match lookup
//! - **[`middleware`]** - `Auth`, `Admin`, `Moderator`, `Cors`, `RateLimit`, `Trace`
//! - **[`dispatcher`]** - the per-request entry point [`Dispatcher::run`]
//! - **[`registry`]** - `Controller@action` references bound to handlers
//! - **[`context`]** / **[`session`]** - explicit per-request state
//! - **[`server`]** - `may_minihttp` service with sessions and error rendering
//! - **[`manifest`]** / **[`config`]** - YAML route manifests and configuration
//!
//! ## Example
//!
//! ```rust
//! use forumrouter::{
//!     handler_fn, Dispatcher, GroupOptions, HandlerRegistry, HandlerResponse,
//!     MiddlewareRegistry, RequestContext, RouteTable,
//! };
//! use http::Method;
//!
//! let mut routes = RouteTable::builder();
//! routes.get("/", "HomeController@index").unwrap();
//! routes
//!     .group(GroupOptions::new().prefix("/admin").admin(), |r| {
//!         r.get("/users/edit/{id}", "AdminController@editUser")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers
//!     .register("HomeController@index", handler_fn(|_ctx, _params| {
//!         Ok(HandlerResponse::text(200, "welcome".into()))
//!     }))
//!     .unwrap()
//!     .register("AdminController@editUser", handler_fn(|_ctx, params| {
//!         Ok(HandlerResponse::text(200, format!("user {}", params.get("id").unwrap_or("?"))))
//!     }))
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::build(
//!     routes.build().unwrap(),
//!     &handlers,
//!     &MiddlewareRegistry::standard(&Default::default()).unwrap(),
//! )
//! .unwrap();
//!
//! let mut ctx = RequestContext::new(Method::GET, "/");
//! let outcome = dispatcher.run(&mut ctx).unwrap();
//! assert_eq!(outcome.response.status, 200);
//!
//! // No session: the admin route redirects to the login page
//! let mut ctx = RequestContext::new(Method::GET, "/admin/users/edit/42");
//! let outcome = dispatcher.run(&mut ctx).unwrap();
//! assert_eq!(outcome.response.location(), Some("/login"));
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod handler;
pub mod ids;
pub mod manifest;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::AppConfig;
pub use context::RequestContext;
pub use dispatcher::{
    DispatchOutcome, DispatchState, Dispatcher, HandlerResponse, Rejection, ResponseBody,
};
pub use error::{ConfigError, ErrorRenderer, HandlerError};
pub use handler::{handler_fn, Handler, HandlerRef, HandlerResult};
pub use ids::RequestId;
pub use manifest::load_manifest;
pub use middleware::{Middleware, MiddlewareRegistry, Next};
pub use registry::HandlerRegistry;
pub use router::{
    GroupOptions, RouteMatch, RouteOutcome, RouteParams, RouteTable, RouteTableBuilder, Router,
};
pub use session::{MemorySession, MemorySessionStore, Session, SessionStore};
