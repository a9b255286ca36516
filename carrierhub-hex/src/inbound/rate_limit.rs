//! Rate limiting middleware using Governor.
//!
//! Per-client token buckets keyed by the caller's address. A window of
//! `W` allowing `N` requests becomes a bucket of `N` tokens refilled at
//! one token every `W / N`. Forwarded-for headers only identify the client
//! when the server sits behind a trusted proxy.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use serde_json::json;

/// Checks between two sweeps of idle client buckets.
const SWEEP_EVERY: u64 = 1024;

/// Limits for the general and the authentication limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
    pub auth_max_requests: u32,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(900_000),
            max_requests: 100,
            auth_max_requests: 15,
            trust_proxy: false,
        }
    }
}

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
    checks: AtomicU64,
    trust_proxy: bool,
    message: &'static str,
}

impl RateLimiterState {
    pub fn new(requests: u32, window: Duration, message: &'static str) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            checks: AtomicU64::new(0),
            trust_proxy: false,
            message,
        }
    }

    pub fn trusting_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// General limiter applied to every route except `/health`.
    pub fn general(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            config.window,
            "Too many requests from this IP, please try again later.",
        )
        .trusting_proxy(config.trust_proxy)
    }

    /// Stricter limiter on registration and login.
    pub fn auth(config: &RateLimitConfig) -> Self {
        Self::new(
            config.auth_max_requests,
            config.window,
            "Too many authentication attempts, please try again later.",
        )
        .trusting_proxy(config.trust_proxy)
    }

    /// Takes a token for `key`, or returns how long until one is available.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep();
        }

        self.limiter
            .check_key(&key.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Drops buckets that have refilled completely.
    pub fn sweep(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Client address. Behind a trusted proxy: first `X-Forwarded-For` hop,
/// then `X-Real-IP`. Otherwise, and as the last resort, the socket peer.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if trust_proxy {
        if let Some(first) = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return first.to_string();
        }
        if let Some(real_ip) = header("x-real-ip") {
            return real_ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, limiter.trust_proxy);

    if let Err(wait) = limiter.check(&key) {
        let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        tracing::warn!(client = %key, retry_after, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": limiter.message,
                "error": "RATE_LIMIT_EXCEEDED",
                "retry_after_seconds": retry_after.max(1),
            })),
        )
            .into_response();
    }

    next.run(request).await
}
