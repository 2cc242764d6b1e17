//! Router core: ordered first-match lookup over the route table.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::{normalize_path, split_segments};
use super::table::{Route, RouteTable};

/// Maximum number of path parameters stored inline.
/// Forum routes rarely exceed two (e.g. `/threads/{thread}/posts/{post}`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage: names come from the route table and are shared via
/// `Arc<str>`, values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Placeholder bindings of a matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(ParamVec);

impl RouteParams {
    #[must_use]
    pub fn new(params: ParamVec) -> Self {
        Self(params)
    }

    /// Value bound to placeholder `name`.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Note: allocates; prefer [`RouteParams::get`].
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Position of the route in the table.
    pub index: usize,
    pub route: Arc<Route>,
    pub params: RouteParams,
}

/// Result of looking a request up in the table.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    /// The path matches at least one route, but none for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl RouteOutcome {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, RouteOutcome::Matched(_))
    }
}

/// Matches requests against a shared, read-only [`RouteTable`].
///
/// Routes are scanned in registration order and the first route whose method
/// and pattern both fit wins, even if a later route would be more specific.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<RouteTable>,
}

impl Router {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        let routes_summary: Vec<String> = table
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect();
        info!(
            routes_count = table.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
        Self {
            table: Arc::new(table),
        }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Look up `method` + `path`. The path may still carry a query string.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> RouteOutcome {
        let path = path.split('?').next().unwrap_or("/");
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        debug!(method = %method, path = %normalized, "Route match attempt");

        let mut allowed: Vec<Method> = Vec::new();
        for (index, route) in self.table.iter().enumerate() {
            let Some(params) = route.pattern.matches(&segments) else {
                continue;
            };
            if route.method == *method {
                info!(
                    method = %method,
                    path = %normalized,
                    handler = %route.handler,
                    route_pattern = %route.pattern,
                    path_params = ?params,
                    "Route matched"
                );
                return RouteOutcome::Matched(RouteMatch {
                    index,
                    route: Arc::clone(route),
                    params: RouteParams::new(params),
                });
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            warn!(method = %method, path = %normalized, "No route matched");
            RouteOutcome::NotFound
        } else {
            warn!(
                method = %method,
                path = %normalized,
                allowed = ?allowed,
                "Path matched with a different method"
            );
            RouteOutcome::MethodNotAllowed { allowed }
        }
    }

    /// Print all registered routes to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.table.len());
        for route in self.table.iter() {
            let mut flags = Vec::new();
            if route.requires_auth {
                flags.push("auth");
            }
            if route.requires_admin {
                flags.push("admin");
            }
            println!(
                "[route] {:<7} {:<40} -> {:<36} middleware=[{}] flags=[{}]",
                route.method.as_str(),
                route.pattern.as_str(),
                route.handler.to_string(),
                route.middleware.join(", "),
                flags.join(", ")
            );
        }
    }
}
