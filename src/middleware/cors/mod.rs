mod error;

pub use error::CorsConfigError;

use http::Method;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::CorsConfig;
use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::handler::HandlerResult;
use crate::middleware::{Middleware, Next};

/// Origin validation strategy
#[derive(Clone)]
pub enum OriginValidation {
    /// Exact string matching
    Exact(Vec<String>),
    /// Wildcard (allow all origins)
    Wildcard,
    /// Regex pattern matching
    Regex(Vec<Regex>),
}

impl std::fmt::Debug for OriginValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginValidation::Exact(origins) => f.debug_tuple("Exact").field(origins).finish(),
            OriginValidation::Wildcard => write!(f, "Wildcard"),
            OriginValidation::Regex(patterns) => f
                .debug_tuple("Regex")
                .field(&patterns.iter().map(|re| re.as_str()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl OriginValidation {
    fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
            OriginValidation::Regex(patterns) => patterns.iter().any(|re| re.is_match(origin)),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// As a chain member it rejects cross-origin requests from origins that are
/// not allowed with `403`, and injects `Access-Control-*` headers into the
/// response of allowed ones. Same-origin requests and requests without an
/// `Origin` header pass through untouched.
///
/// The dispatcher also uses [`CorsMiddleware::preflight`] to answer every
/// `OPTIONS` request before routing.
///
/// # Origins
///
/// Each configured origin is either `*` (any origin, incompatible with
/// credentials), `regex:<pattern>` or an exact `scheme://host[:port]`.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    pub(crate) origin_validation: OriginValidation,
    pub(crate) allowed_headers: Vec<String>,
    pub(crate) allowed_methods: Vec<Method>,
    pub(crate) allow_credentials: bool,
    pub(crate) expose_headers: Vec<String>,
    pub(crate) max_age: Option<u32>,
}

impl CorsMiddleware {
    /// Build the middleware from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`CorsConfigError`] for malformed origins or methods, or for
    /// a wildcard origin combined with credentials.
    pub fn from_config(config: &CorsConfig) -> Result<Self, CorsConfigError> {
        let origin_validation = if config.allowed_origins.iter().any(|o| o == "*") {
            OriginValidation::Wildcard
        } else if config
            .allowed_origins
            .iter()
            .any(|o| o.starts_with("regex:"))
        {
            let patterns = config
                .allowed_origins
                .iter()
                .map(|o| {
                    // Plain origins in a regex list must match exactly
                    let pattern = match o.strip_prefix("regex:") {
                        Some(p) => p.to_string(),
                        None => format!("^{}$", regex::escape(o)),
                    };
                    Regex::new(&pattern).map_err(|e| CorsConfigError::InvalidOriginPattern {
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            OriginValidation::Regex(patterns)
        } else {
            for origin in &config.allowed_origins {
                validate_origin_format(origin)?;
            }
            OriginValidation::Exact(config.allowed_origins.clone())
        };

        if config.allow_credentials && origin_validation.is_wildcard() {
            return Err(CorsConfigError::WildcardWithCredentials);
        }

        let allowed_methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                m.to_ascii_uppercase()
                    .parse::<Method>()
                    .map_err(|_| CorsConfigError::InvalidMethod { method: m.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin_validation,
            allowed_headers: config.allowed_headers.clone(),
            allowed_methods,
            allow_credentials: config.allow_credentials,
            expose_headers: config.expose_headers.clone(),
            max_age: config.max_age,
        })
    }

    /// Allow every origin. Development only.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            origin_validation: OriginValidation::Wildcard,
            ..Self::default()
        }
    }

    /// The `Access-Control-Allow-Origin` value for `origin`, if allowed.
    fn validate_origin(&self, origin: &str) -> Option<String> {
        if !self.origin_validation.is_allowed(origin) {
            return None;
        }
        if self.origin_validation.is_wildcard() {
            Some("*".to_string())
        } else {
            Some(origin.to_string())
        }
    }

    /// Same-origin requests need no CORS headers.
    fn is_same_origin(&self, ctx: &RequestContext, origin: &str) -> bool {
        let Some(host) = ctx.get_header("host") else {
            return false;
        };
        let Some((_, origin_host_port)) = origin.split_once("://") else {
            return false;
        };
        let origin_host = origin_host_port.split(':').next().unwrap_or(origin_host_port);
        host.eq_ignore_ascii_case(origin_host) || host.eq_ignore_ascii_case(origin_host_port)
    }

    fn methods_header(&self) -> String {
        self.allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn apply_headers(&self, res: &mut HandlerResponse, allow_origin: Option<String>) {
        if let Some(origin) = allow_origin {
            res.set_header("access-control-allow-origin", origin);
            if self.allow_credentials {
                res.set_header("access-control-allow-credentials", "true".to_string());
            }
        }
        res.set_header("access-control-allow-methods", self.methods_header());
        res.set_header("access-control-allow-headers", self.allowed_headers.join(", "));
        if !self.expose_headers.is_empty() {
            res.set_header(
                "access-control-expose-headers",
                self.expose_headers.join(", "),
            );
        }
        res.set_header("vary", "Origin".to_string());
    }

    /// Answer an `OPTIONS` request.
    ///
    /// Always `200`. The allowed methods and headers are advertised; the
    /// origin is echoed back only when it is allowed, so browsers still block
    /// disallowed origins.
    #[must_use]
    pub fn preflight(&self, ctx: &RequestContext) -> HandlerResponse {
        let mut res = HandlerResponse::empty(200);
        let allow_origin = match ctx.get_header("origin") {
            Some(origin) => {
                let validated = self.validate_origin(origin);
                if validated.is_none() {
                    warn!(origin = %origin, "CORS preflight: origin not allowed");
                }
                validated
            }
            None => None,
        };
        self.apply_headers(&mut res, allow_origin);
        if let Some(age) = self.max_age {
            res.set_header("access-control-max-age", age.to_string());
        }
        res
    }
}

/// Secure default: no origins allowed until configured.
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            origin_validation: OriginValidation::Exact(vec![]),
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_credentials: false,
            expose_headers: vec![],
            max_age: None,
        }
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "Cors"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        let origin = match ctx.get_header("origin") {
            Some(o) if !self.is_same_origin(ctx, o) => o.to_string(),
            _ => return next.run(ctx),
        };

        let Some(allow_origin) = self.validate_origin(&origin) else {
            warn!(request_id = %ctx.request_id, origin = %origin, "CORS: origin not allowed");
            return Ok(HandlerResponse::error(403, "Origin not allowed"));
        };

        let mut res = next.run(ctx)?;
        debug!(origin = %origin, "CORS headers applied");
        self.apply_headers(&mut res, Some(allow_origin));
        Ok(res)
    }
}

fn validate_origin_format(origin: &str) -> Result<(), CorsConfigError> {
    let invalid = || CorsConfigError::InvalidOriginFormat {
        origin: origin.to_string(),
    };
    let (scheme, rest) = origin.split_once("://").ok_or_else(invalid)?;
    if scheme.is_empty() || rest.is_empty() || rest.contains('/') {
        return Err(invalid());
    }
    Ok(())
}
