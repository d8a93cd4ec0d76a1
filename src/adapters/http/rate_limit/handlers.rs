//! HTTP handlers for rate limit endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::dto::{BucketStatusResponse, ErrorResponse, HealthResponse, SuspiciousActivityResponse};
use crate::adapters::http::middleware::{TrustedProxies, UNKNOWN_CLIENT};
use crate::adapters::rate_limiter::RateLimitService;
use crate::domain::rate_limit::Bucket;

/// Shared state for rate limit handlers.
#[derive(Clone)]
pub struct RateLimitAppState {
    pub service: Arc<RateLimitService>,
    pub proxies: TrustedProxies,
}

impl RateLimitAppState {
    pub fn new(service: Arc<RateLimitService>) -> Self {
        Self {
            service,
            proxies: TrustedProxies::default(),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.proxies = proxies;
        self
    }
}

/// GET /health
pub async fn health(State(state): State<RateLimitAppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        backend: state.service.backend().as_str(),
    })
}

/// GET /api/rate-limit/:bucket - caller's standing, without recording an attempt
pub async fn get_bucket_status(
    State(state): State<RateLimitAppState>,
    Path(bucket): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let bucket: Bucket = match bucket.parse() {
        Ok(bucket) => bucket,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("UNKNOWN_BUCKET", e.to_string())),
            )
                .into_response();
        }
    };

    let client_ip = state
        .proxies
        .client_ip(&headers, connect_info.as_ref())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    let status = state.service.status(&client_ip, bucket).await;

    Json(BucketStatusResponse::new(bucket, &status)).into_response()
}

/// GET /api/admin/rate-limit/suspicious
pub async fn get_suspicious_activity(State(state): State<RateLimitAppState>) -> impl IntoResponse {
    Json(SuspiciousActivityResponse {
        backend: state.service.backend().as_str(),
        entries: state.service.suspicious_activity().await,
    })
}
