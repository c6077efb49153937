use crate::ip::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use leadrelay_core::{AppError, ErrorMetadata};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_SHARDS: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> Result<u32, Duration> {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            Ok(limit - self.count)
        } else {
            Err(self.reset_at.saturating_duration_since(now))
        }
    }
}

/// Fixed-window per-key rate limiter
///
/// Keys are spread across shards so concurrent requests from different clients rarely
/// contend on the same lock.
pub struct RateLimiter {
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
    limit: u32,
    window: Duration,
    trusted_proxy_count: usize,
}

impl RateLimiter {
    /// Limiter allowing `limit_per_minute` requests per key and minute.
    pub fn new(limit_per_minute: u32, trusted_proxy_count: usize) -> Self {
        Self::with_window(limit_per_minute, Duration::from_secs(60), trusted_proxy_count)
    }

    pub fn with_window(limit: u32, window: Duration, trusted_proxy_count: usize) -> Self {
        Self {
            shards: (0..DEFAULT_SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
            limit,
            window,
            trusted_proxy_count,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, RateLimitBucket>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Count one request for `key`. Returns the remaining allowance, or the time
    /// until the window resets when the limit is exhausted.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let mut buckets = self.shard(key).lock().await;

        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.reset_at > now);
            tracing::debug!(
                buckets_cleaned = before - buckets.len(),
                "Cleaned up expired rate limit buckets"
            );
        }

        let window = self.window;
        buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window))
            .check_and_increment(self.limit, window)
    }
}

fn insert_header(response: &mut Response, name: &'static str, value: impl ToString) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, header_value);
    }
}

/// Per-IP rate limiting middleware
///
/// Adds `X-RateLimit-Limit` and `X-RateLimit-Remaining` to every response, and answers
/// `429 Too Many Requests` with `Retry-After` once a client exhausts its window.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        limiter.trusted_proxy_count,
    );

    match limiter.check(&ip).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            insert_header(&mut response, "X-RateLimit-Limit", limiter.limit);
            insert_header(&mut response, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(reset_in) => {
            let retry_after_secs = reset_in.as_secs().max(1);
            let error = AppError::RateLimited { retry_after_secs };

            tracing::warn!(
                client_ip = %ip,
                path = %request.uri().path(),
                limit = limiter.limit,
                "Rate limit exceeded"
            );

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(serde_json::json!({
                    "error": error.client_message(),
                    "code": error.error_code(),
                    "recoverable": error.is_recoverable(),
                })),
            )
                .into_response();

            insert_header(&mut response, "X-RateLimit-Limit", limiter.limit);
            insert_header(&mut response, "X-RateLimit-Remaining", 0);
            insert_header(&mut response, "Retry-After", retry_after_secs);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::post, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_limit_per_key() {
        let limiter = RateLimiter::new(2, 0);
        assert_eq!(limiter.check("1.1.1.1").await, Ok(1));
        assert_eq!(limiter.check("1.1.1.1").await, Ok(0));
        assert!(limiter.check("1.1.1.1").await.is_err());
        assert_eq!(limiter.check("2.2.2.2").await, Ok(1));
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::with_window(1, Duration::from_millis(20), 0);
        assert!(limiter.check("k").await.is_ok());
        assert!(limiter.check("k").await.is_err());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("k").await.is_ok());
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let limiter = Arc::new(RateLimiter::new(1, 1));
        let app = Router::new()
            .route("/lead", post(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let request = || {
            Request::builder()
                .method("POST")
                .uri("/lead")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["X-RateLimit-Remaining"], "0");

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second.headers()["Retry-After"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));
    }
}
