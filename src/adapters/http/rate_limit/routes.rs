//! Axum router configuration for rate limit endpoints.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use super::handlers::{get_bucket_status, get_suspicious_activity, health, RateLimitAppState};
use crate::adapters::http::middleware::{
    admin_access_middleware, rate_limit_middleware, AdminAccess, RateLimitLayerState, TrustedProxies,
};
use crate::adapters::rate_limiter::RateLimitService;
use crate::config::ServerConfig;
use crate::domain::rate_limit::Bucket;

/// Deployment-specific router settings.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Peers whose forwarding headers identify the client.
    pub trusted_proxies: TrustedProxies,
    /// Mount admin routes for these peers; `None` leaves them unmounted.
    pub admin: Option<AdminAccess>,
}

impl RouterOptions {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            trusted_proxies: TrustedProxies::new(server.trusted_proxies.iter().copied()),
            admin: server
                .expose_admin_routes
                .then(|| AdminAccess::new(server.admin_allowlist.iter().copied())),
        }
    }
}

fn api_bucket_layer(service: Arc<RateLimitService>, proxies: &TrustedProxies) -> RateLimitLayerState {
    RateLimitLayerState::new(service, Bucket::Api).with_trusted_proxies(proxies.clone())
}

/// Public API routes, throttled by the `api` bucket.
///
/// # Routes
/// - `GET /rate-limit/:bucket` - Caller's standing in a bucket
pub fn api_routes(service: Arc<RateLimitService>, proxies: &TrustedProxies) -> Router<RateLimitAppState> {
    Router::new()
        .route("/rate-limit/:bucket", get(get_bucket_status))
        .route_layer(middleware::from_fn_with_state(
            api_bucket_layer(service, proxies),
            rate_limit_middleware,
        ))
}

/// Operator routes, restricted to `access` and throttled by the `api` bucket.
///
/// # Routes
/// - `GET /rate-limit/suspicious` - Clients currently over a limit
pub fn admin_routes(
    service: Arc<RateLimitService>,
    proxies: &TrustedProxies,
    access: AdminAccess,
) -> Router<RateLimitAppState> {
    Router::new()
        .route("/rate-limit/suspicious", get(get_suspicious_activity))
        .route_layer(middleware::from_fn_with_state(access, admin_access_middleware))
        .route_layer(middleware::from_fn_with_state(
            api_bucket_layer(service, proxies),
            rate_limit_middleware,
        ))
}

/// Create the complete application router.
///
/// ```ignore
/// let app = rate_limit_router(service.clone(), RouterOptions::from_config(&config.server));
/// axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
/// ```
pub fn rate_limit_router(service: Arc<RateLimitService>, options: RouterOptions) -> Router {
    let proxies = options.trusted_proxies;
    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(service.clone(), &proxies));

    if let Some(access) = options.admin {
        router = router.nest("/api/admin", admin_routes(service.clone(), &proxies, access));
    }

    router.with_state(RateLimitAppState::new(service).with_trusted_proxies(proxies))
}
