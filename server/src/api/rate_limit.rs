//! Rate limiting middleware for the counting routes

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;

use super::extractors::ClientIp;
use crate::data::cache::{RateLimitBucket, RateLimitResult, RateLimiter};

/// Header carrying the bypass secret for internal callers
pub const BYPASS_HEADER: &str = "X-RateLimit-Bypass";

static SUSPICIOUS_UA: OnceLock<Regex> = OnceLock::new();

/// Whether a user agent looks like a script or crawler
pub fn is_suspicious_user_agent(user_agent: &str) -> bool {
    SUSPICIOUS_UA
        .get_or_init(|| {
            Regex::new(
                r"(?i)curl|wget|python-requests|scrapy|headless|bot|spider|crawler|go-http-client|java|libwww|httpclient|postman",
            )
            .expect("Invalid regex")
        })
        .is_match(user_agent)
}

/// Rate limit middleware state
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub bucket: RateLimitBucket,
    pub bypass_header: Option<String>,
}

/// Rate limit exceeded response
pub struct RateLimitExceeded(RateLimitResult);

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let r = &self.0;
        let body = axum::Json(serde_json::json!({
            "error": "too_many_requests",
            "code": "RATE_LIMITED",
            "message": "Rate limit exceeded"
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        add_rate_limit_headers(response.headers_mut(), r);
        if let Ok(v) = HeaderValue::from_str(&r.retry_after.unwrap_or(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, v);
        }
        response
    }
}

/// Add `X-RateLimit-*` headers
fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    if let Ok(v) = HeaderValue::from_str(&result.limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&result.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&result.reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    // Check bypass header (for internal services)
    if let Some(ref bypass_secret) = state.bypass_header
        && let Some(header_val) = request.headers().get(BYPASS_HEADER)
        && header_val.to_str().ok() == Some(bypass_secret.as_str())
    {
        tracing::trace!("Rate limit bypassed via header");
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ClientIp(client) = ClientIp::resolve(request.headers(), peer);

    if let Some(user_agent) = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        && is_suspicious_user_agent(user_agent)
    {
        tracing::warn!(%client, user_agent, "Suspicious user agent");
    }

    let result = state.limiter.check(&state.bucket, &client).await;

    if !result.allowed {
        tracing::debug!(
            bucket = state.bucket.name,
            %client,
            retry_after = result.retry_after,
            "Rate limit exceeded"
        );
        return Err(RateLimitExceeded(result));
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::core::config::CacheConfig;
    use crate::data::cache::CacheService;

    async fn app(requests: u32, bypass_header: Option<&str>) -> Router {
        let cache = Arc::new(CacheService::new(&CacheConfig::memory()).await.unwrap());
        let state = RateLimitState {
            limiter: Arc::new(RateLimiter::new(cache)),
            bucket: RateLimitBucket::counting(requests, 60),
            bypass_header: bypass_header.map(str::to_string),
        };
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                rate_limit_middleware,
            ))
    }

    fn request(ip: &str) -> Request {
        Request::builder()
            .uri("/")
            .header("x-real-ip", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_suspicious_user_agents() {
        assert!(is_suspicious_user_agent("curl/8.4.0"));
        assert!(is_suspicious_user_agent("python-requests/2.31"));
        assert!(is_suspicious_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(is_suspicious_user_agent("Mozilla/5.0 HeadlessChrome/120.0"));
        assert!(!is_suspicious_user_agent(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15"
        ));
    }

    #[test]
    fn test_rate_limit_exceeded_response() {
        let result = RateLimitResult {
            allowed: false,
            remaining: 0,
            limit: 100,
            reset_at: 1705593600,
            retry_after: Some(45),
        };
        let response = RateLimitExceeded(result).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "45");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }

    #[tokio::test]
    async fn test_admits_then_rejects() {
        let app = app(2, None).await;

        let first = app.clone().oneshot(request("203.0.113.9")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["X-RateLimit-Limit"], "2");
        assert_eq!(first.headers()["X-RateLimit-Remaining"], "1");

        let second = app.clone().oneshot(request("203.0.113.9")).await.unwrap();
        assert_eq!(second.headers()["X-RateLimit-Remaining"], "0");

        let third = app.clone().oneshot(request("203.0.113.9")).await.unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(third.headers().contains_key(header::RETRY_AFTER));

        // Other clients have their own window
        let other = app.oneshot(request("203.0.113.10")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bypass_header() {
        let app = app(1, Some("s3cret")).await;
        app.clone().oneshot(request("203.0.113.9")).await.unwrap();

        let mut req = request("203.0.113.9");
        req.headers_mut()
            .insert(BYPASS_HEADER, HeaderValue::from_static("s3cret"));
        let bypassed = app.clone().oneshot(req).await.unwrap();
        assert_eq!(bypassed.status(), StatusCode::OK);

        let mut req = request("203.0.113.9");
        req.headers_mut()
            .insert(BYPASS_HEADER, HeaderValue::from_static("wrong"));
        let rejected = app.oneshot(req).await.unwrap();
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
