//! Application-layer rate limiting for the hierarchy read surface.
//!
//! Fixed-window counter keyed by caller identity. Advisory backpressure
//! only: any internal failure falls open (allows the request).

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AppError;

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Injectable fixed-window rate limiter. Constructed at process start,
/// swept periodically, per-instance only.
#[derive(Clone)]
pub struct RateLimiter {
    /// caller identity -> window entry
    inner: Arc<Mutex<HashMap<String, WindowEntry>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_secs,
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, caller: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        let entry = map.entry(caller.to_owned()).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start).as_secs() >= self.window_secs {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }

    /// Remove entries whose window expired more than 5 minutes ago.
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let cutoff = std::time::Duration::from_secs(300);
        let now = Instant::now();
        map.retain(|_, entry| now.duration_since(entry.window_start) < cutoff);
    }
}

/// Caller identity: X-Forwarded-For first, then peer address.
fn extract_caller(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Rate limit middleware for the read surface.
pub async fn read_rate_limit(
    State(state): State<crate::state::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let caller = extract_caller(&request);
    if !state.rate_limiter.check(&caller).await {
        return Err(AppError::RateLimitExceeded.into_response());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_then_limits() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.check("a").await);
        assert!(limiter.check("a").await);
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
        // Independent caller key gets its own window
        assert!(limiter.check("b").await);
    }

    #[tokio::test]
    async fn zero_limit_fails_open() {
        let limiter = RateLimiter::new(0, 60);
        for _ in 0..10 {
            assert!(limiter.check("a").await);
        }
    }

    #[tokio::test]
    async fn cleanup_retains_live_windows() {
        let limiter = RateLimiter::new(5, 60);
        limiter.check("a").await;
        limiter.cleanup().await;
        // Fresh window survives the sweep
        assert!(limiter.inner.lock().await.contains_key("a"));
    }
}
