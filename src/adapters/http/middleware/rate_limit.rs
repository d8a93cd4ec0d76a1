//! Rate limiting middleware for axum.
//!
//! This module provides middleware that enforces one bucket's limit using
//! the [`RateLimitService`] facade.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post, middleware};
//!
//! let state = RateLimitLayerState::new(service.clone(), Bucket::Chat);
//!
//! let app = Router::new()
//!     .route("/api/chat/messages", post(handler))
//!     .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::rate_limiter::RateLimitService;
use crate::domain::rate_limit::{Bucket, RateLimitStatus};

/// Client identifier used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// State for [`rate_limit_middleware`]: the checker plus the bucket it guards.
#[derive(Clone)]
pub struct RateLimitLayerState {
    check: RateLimitCheck,
    bucket: Bucket,
    proxies: TrustedProxies,
}

impl RateLimitLayerState {
    pub fn new(service: Arc<RateLimitService>, bucket: Bucket) -> Self {
        Self {
            check: RateLimitCheck::new(service),
            bucket,
            proxies: TrustedProxies::default(),
        }
    }

    /// Honor forwarding headers from these peers.
    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }
}

/// Rate limiting middleware for a single bucket.
///
/// This middleware:
/// 1. Resolves the client address (see [`TrustedProxies::client_ip`])
/// 2. Checks the bucket's limit for that client
/// 3. Returns 429 Too Many Requests if the limit is exceeded
/// 4. Adds rate limit headers to allowed responses
pub async fn rate_limit_middleware(
    State(state): State<RateLimitLayerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = state
        .proxies
        .client_ip(request.headers(), connect_info.as_ref())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    let status = match state.check.check(&client_ip, state.bucket).await {
        Ok(status) => status,
        Err(rejection) => return rejection.into_response(),
    };

    let mut response = next.run(request).await;
    add_rate_limit_headers(&mut response, &status);
    response
}

/// Reverse proxies whose `X-Forwarded-For` and `X-Real-IP` headers are believed.
///
/// Requests arriving from any other peer are identified by their socket
/// address, whatever headers they carry.
#[derive(Debug, Clone)]
pub struct TrustedProxies {
    addrs: Arc<[IpAddr]>,
}

impl Default for TrustedProxies {
    fn default() -> Self {
        Self::new(Vec::<IpAddr>::new())
    }
}

impl TrustedProxies {
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().collect(),
        }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.addrs.contains(ip)
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Resolve the address a request should be counted against.
    ///
    /// When the socket peer is a trusted proxy:
    /// 1. X-Forwarded-For, rightmost entry that is not itself a trusted proxy
    /// 2. X-Real-IP
    /// 3. the peer address
    ///
    /// Otherwise the peer address. `None` only when there is no peer.
    pub fn client_ip(
        &self,
        headers: &HeaderMap,
        connect_info: Option<&ConnectInfo<SocketAddr>>,
    ) -> Option<String> {
        let peer = connect_info.map(|ci| ci.0.ip())?;
        if !self.contains(&peer) {
            return Some(peer.to_string());
        }

        if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
            let client = forwarded
                .rsplit(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .find(|hop| !hop.parse::<IpAddr>().is_ok_and(|ip| self.contains(&ip)));
            if let Some(client) = client {
                return Some(client.to_string());
            }
        }

        if let Some(real_ip) = headers
            .get("X-Real-IP")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Some(real_ip.to_string());
        }

        Some(peer.to_string())
    }
}

/// Create a 429 Too Many Requests response.
fn rate_limit_response(bucket: Bucket, limit: u32, retry_after_secs: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "Too many requests, please try again later.",
            "code": "RATE_LIMIT_EXCEEDED",
            "bucket": bucket,
            "retry_after_secs": retry_after_secs
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
    headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after_secs));

    response
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(status.limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(status.remaining));
    headers.insert(
        headers::X_RATELIMIT_RESET.clone(),
        HeaderValue::from(status.reset_at.as_unix_secs()),
    );
}

/// Rate limit check for use inside handlers.
///
/// Use this when a handler needs a bucket other than the one its router
/// is layered with, e.g. a chat message endpoint nested under the API
/// router.
///
/// # Example
///
/// ```ignore
/// async fn send_message(
///     State(state): State<ChatState>,
///     ...
/// ) -> Result<impl IntoResponse, RateLimitRejection> {
///     state.rate_check.check(&client_ip, Bucket::Chat).await?;
///     // ... handle request
/// }
/// ```
#[derive(Clone)]
pub struct RateLimitCheck {
    service: Arc<RateLimitService>,
}

impl RateLimitCheck {
    pub fn new(service: Arc<RateLimitService>) -> Self {
        Self { service }
    }

    /// Record an attempt and return the client's standing afterwards.
    pub async fn check(&self, client_id: &str, bucket: Bucket) -> Result<RateLimitStatus, RateLimitRejection> {
        let (decision, status) = self.service.check_with_status(client_id, bucket).await;
        match decision.retry_after_secs() {
            Some(retry_after_secs) => Err(RateLimitRejection {
                bucket,
                limit: status.limit,
                retry_after_secs,
            }),
            None => Ok(status),
        }
    }
}

/// Rejection for rate limit exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    /// The bucket whose limit was exceeded.
    pub bucket: Bucket,
    /// Attempts allowed per window in that bucket.
    pub limit: u32,
    /// Seconds until the client may retry.
    pub retry_after_secs: u64,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        rate_limit_response(self.bucket, self.limit, self.retry_after_secs)
    }
}
