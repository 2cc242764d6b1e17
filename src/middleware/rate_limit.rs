use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use super::{Middleware, Next};
use crate::config::{RateLimitConfig, SessionConfig};
use crate::context::RequestContext;
use crate::dispatcher::HandlerResponse;
use crate::handler::HandlerResult;

/// Expired windows are swept once every this many checks.
const PURGE_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window request limiter.
///
/// Clients are identified by the logged-in user id when there is one,
/// otherwise by the first `X-Forwarded-For` entry, then `X-Real-IP`. Requests
/// over the limit get `429` with a `Retry-After` header.
#[derive(Debug)]
pub struct RateLimitMiddleware {
    max_requests: u32,
    window: Duration,
    user_key: String,
    windows: DashMap<String, Window>,
    checks: AtomicU64,
}

impl RateLimitMiddleware {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration, user_key: &str) -> Self {
        Self {
            max_requests,
            window,
            user_key: user_key.to_string(),
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig, session: &SessionConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            &session.user_key,
        )
    }

    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Key the request is counted under.
    #[must_use]
    pub fn identity(&self, ctx: &RequestContext) -> String {
        if let Some(user) = ctx.session.get(&self.user_key).filter(|v| !v.is_null()) {
            return match user.as_str() {
                Some(s) => format!("user:{s}"),
                None => format!("user:{user}"),
            };
        }
        if let Some(forwarded) = ctx.get_header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
                return format!("ip:{first}");
            }
        }
        if let Some(real_ip) = ctx.get_header("x-real-ip") {
            return format!("ip:{}", real_ip.trim());
        }
        "anonymous".to_string()
    }

    /// Count one request for `identity` at `now`.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateDecision {
        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % PURGE_EVERY == 0 {
            self.purge_expired(now);
        }

        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert(Window { start: now, count: 0 });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.start) >= self.window {
            window.start = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(window.start);
            return RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }

        window.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - window.count,
        }
    }

    pub fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, Instant::now())
    }

    /// Drop windows that have expired by `now`.
    pub fn purge_expired(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.start) < self.window);
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &str {
        "RateLimit"
    }

    fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> HandlerResult {
        let identity = self.identity(ctx);
        match self.check(&identity) {
            RateDecision::Allowed { remaining } => {
                let mut res = next.run(ctx)?;
                res.set_header("x-ratelimit-limit", self.max_requests.to_string());
                res.set_header("x-ratelimit-remaining", remaining.to_string());
                Ok(res)
            }
            RateDecision::Limited { retry_after } => {
                warn!(
                    request_id = %ctx.request_id,
                    identity = %identity,
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                let mut res = HandlerResponse::error(429, "Too Many Requests");
                // Round up so clients never retry early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                res.set_header("retry-after", secs.to_string());
                res.set_header("x-ratelimit-limit", self.max_requests.to_string());
                res.set_header("x-ratelimit-remaining", "0".to_string());
                Ok(res)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use http::Method;

    #[test]
    fn test_window_limits_and_resets() {
        let limiter = RateLimitMiddleware::new(2, Duration::from_secs(60), "user_id");
        let t0 = Instant::now();
        assert_eq!(
            limiter.check_at("ip:1.2.3.4", t0),
            RateDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("ip:1.2.3.4", t0),
            RateDecision::Allowed { remaining: 0 }
        );
        assert!(matches!(
            limiter.check_at("ip:1.2.3.4", t0 + Duration::from_secs(10)),
            RateDecision::Limited { retry_after } if retry_after == Duration::from_secs(50)
        ));
        // Other clients have their own window.
        assert_eq!(
            limiter.check_at("ip:5.6.7.8", t0),
            RateDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("ip:1.2.3.4", t0 + Duration::from_secs(60)),
            RateDecision::Allowed { remaining: 1 }
        );
    }

    #[test]
    fn test_identity_resolution() {
        let limiter = RateLimitMiddleware::new(10, Duration::from_secs(60), "user_id");
        let ctx = RequestContext::new(Method::GET, "/")
            .with_header("x-forwarded-for", "10.0.0.1, 172.16.0.1")
            .with_header("x-real-ip", "10.0.0.9");
        assert_eq!(limiter.identity(&ctx), "ip:10.0.0.1");

        let ctx = RequestContext::new(Method::GET, "/")
            .with_header("x-forwarded-for", "10.0.0.1")
            .with_session(Box::new(MemorySession::new().with("user_id", 42)));
        assert_eq!(limiter.identity(&ctx), "user:42");

        let ctx = RequestContext::new(Method::GET, "/");
        assert_eq!(limiter.identity(&ctx), "anonymous");
    }

    #[test]
    fn test_expired_windows_swept_while_checking() {
        let limiter = RateLimitMiddleware::new(5, Duration::from_secs(1), "user_id");
        let t0 = Instant::now();
        for i in 0..PURGE_EVERY {
            limiter.check_at(&format!("ip:10.0.{}.{}", i / 256, i % 256), t0);
        }
        assert_eq!(limiter.tracked_clients(), PURGE_EVERY as usize);

        let later = t0 + Duration::from_secs(2);
        for _ in 0..PURGE_EVERY {
            limiter.check_at("ip:192.168.0.1", later);
        }
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimitMiddleware::new(1, Duration::from_secs(1), "user_id");
        let t0 = Instant::now();
        limiter.check_at("a", t0);
        limiter.check_at("b", t0 + Duration::from_millis(900));
        limiter.purge_expired(t0 + Duration::from_millis(1500));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
