//! # Router Module
//!
//! Route registration, path matching and route lookup.
//!
//! ## Overview
//!
//! - [`RouteTableBuilder`] registers routes in order, with nestable groups that
//!   accumulate a path prefix, middleware and auth/admin requirements.
//! - [`PathPattern`] compiles `/threads/{id}` style patterns into literal and
//!   placeholder segments.
//! - [`Router`] scans the frozen [`RouteTable`] in registration order and
//!   returns the first route whose method and pattern fit, a
//!   method-not-allowed outcome when only the path fits, or not-found.
//!
//! ## Example
//!
//! ```rust
//! use forumrouter::router::{GroupOptions, RouteOutcome, RouteTable, Router};
//! use http::Method;
//!
//! # fn main() -> Result<(), forumrouter::ConfigError> {
//! let mut builder = RouteTable::builder();
//! builder.group(GroupOptions::new().prefix("/admin").admin(), |b| {
//!     b.get("/users/edit/{id}", "AdminUserController@edit")?;
//!     Ok(())
//! })?;
//! let router = Router::new(builder.build()?);
//!
//! match router.route(&Method::GET, "/admin/users/edit/42") {
//!     RouteOutcome::Matched(m) => assert_eq!(m.params.get("id"), Some("42")),
//!     other => panic!("unexpected outcome {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod core;
mod pattern;
mod table;
#[cfg(test)]
mod tests;

pub use self::core::{ParamVec, RouteMatch, RouteOutcome, RouteParams, Router, MAX_INLINE_PARAMS};
pub use pattern::{join_paths, normalize_path, split_segments, PathPattern, Segment};
pub use table::{
    GroupOptions, Route, RouteHandle, RouteTable, RouteTableBuilder, SUPPORTED_METHODS,
};
