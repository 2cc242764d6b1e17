//! Application configuration.
//!
//! Loaded from a YAML file (every field has a default, so a partial or missing
//! file is fine), then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `FORUM_ADDR` | `server.addr` |
//! | `FORUM_DEBUG` | `server.debug` |
//! | `FORUM_LOGIN_PATH` | `session.login_path` |
//! | `FORUM_RATE_LIMIT_MAX` | `rate_limit.max_requests` |
//! | `FORUM_RATE_LIMIT_WINDOW_SECS` | `rate_limit.window_secs` |
//!
//! ```yaml
//! server:
//!   addr: 0.0.0.0:8080
//!   debug: false
//! session:
//!   login_path: /login
//! cors:
//!   allowed_origins: ["https://forum.example.com"]
//!   allow_credentials: true
//! rate_limit:
//!   max_requests: 60
//!   window_secs: 60
//! ```

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Render handler errors with their cause chain instead of a generic page.
    pub debug: bool,
    /// Coroutine stack size in bytes.
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            debug: false,
            stack_size: 0x8000,
        }
    }
}

/// Session keys and cookie used by the auth and role middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Present when a user is logged in.
    pub user_key: String,
    pub role_key: String,
    /// Where the auth middleware remembers the URL to return to after login.
    pub intended_url_key: String,
    pub login_path: String,
    /// Sessions unused for this long are discarded.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "forum_session".to_string(),
            user_key: "user_id".to_string(),
            role_key: "user_role".to_string(),
            intended_url_key: "intended_url".to_string(),
            login_path: "/login".to_string(),
            idle_timeout_secs: 7200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*`, exact `scheme://host[:port]` origins, or `regex:<pattern>`.
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime in seconds.
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Requested-With".to_string(),
            ],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_credentials: false,
            expose_headers: vec![],
            max_age: Some(86400),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load from `path` (defaults when `None`), then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid YAML.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config = Self::from_yaml_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Parse YAML. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails on invalid YAML or mistyped fields.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(raw).context("invalid configuration YAML")?;
        Ok(config)
    }

    /// Apply `FORUM_*` overrides from `lookup`. Unparsable values are logged
    /// and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("FORUM_ADDR") {
            self.server.addr = addr;
        }
        if let Some(debug) = lookup("FORUM_DEBUG") {
            self.server.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(login_path) = lookup("FORUM_LOGIN_PATH") {
            self.session.login_path = login_path;
        }
        if let Some(max) = lookup("FORUM_RATE_LIMIT_MAX") {
            match max.parse() {
                Ok(max) => self.rate_limit.max_requests = max,
                Err(_) => warn!(value = %max, "Ignoring invalid FORUM_RATE_LIMIT_MAX"),
            }
        }
        if let Some(window) = lookup("FORUM_RATE_LIMIT_WINDOW_SECS") {
            match window.parse() {
                Ok(window) => self.rate_limit.window_secs = window,
                Err(_) => warn!(value = %window, "Ignoring invalid FORUM_RATE_LIMIT_WINDOW_SECS"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str(
            "server:\n  debug: true\ncors:\n  allowed_origins: [\"https://forum.test\"]\n",
        )
        .unwrap();
        assert!(config.server.debug);
        assert_eq!(config.server.addr, "127.0.0.1:8080");
        assert_eq!(config.cors.allowed_origins, vec!["https://forum.test"]);
        assert_eq!(config.cors.allowed_methods.len(), 5);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(AppConfig::from_yaml_str("rate_limit:\n  max_requests: lots\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FORUM_ADDR", "0.0.0.0:9000"),
            ("FORUM_DEBUG", "true"),
            ("FORUM_LOGIN_PATH", "/signin"),
            ("FORUM_RATE_LIMIT_MAX", "5"),
            ("FORUM_RATE_LIMIT_WINDOW_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert!(config.server.debug);
        assert_eq!(config.session.login_path, "/signin");
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
    }
}
