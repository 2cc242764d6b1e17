use thiserror::Error;

/// Invalid CORS configuration, detected when the middleware is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// Credentials cannot be combined with the `*` origin.
    #[error(
        "CORS configuration error: Cannot use wildcard origin (*) with credentials. \
         When allow_credentials is true, you must specify exact origins."
    )]
    WildcardWithCredentials,

    /// An exact origin is not of the form `scheme://host[:port]`.
    #[error(
        "CORS configuration error: Invalid origin format '{origin}'. \
         Expected format: scheme://host:port (e.g., https://example.com)"
    )]
    InvalidOriginFormat { origin: String },

    /// A `regex:` origin pattern does not compile.
    #[error("CORS configuration error: Invalid origin pattern '{pattern}': {reason}")]
    InvalidOriginPattern { pattern: String, reason: String },

    /// An allowed method is not an HTTP method.
    #[error("CORS configuration error: Invalid method '{method}'")]
    InvalidMethod { method: String },
}
