//! Peer allow-list for operator endpoints.
//!
//! Only the socket peer is consulted. Forwarding headers never grant access.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Socket peers permitted to reach admin routes.
#[derive(Debug, Clone)]
pub struct AdminAccess {
    allowed: Arc<[IpAddr]>,
}

impl AdminAccess {
    pub fn new(allowed: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn permits(&self, connect_info: Option<&ConnectInfo<SocketAddr>>) -> bool {
        connect_info.is_some_and(|ci| self.allowed.contains(&ci.0.ip()))
    }
}

/// Reject requests whose peer is not on the allow-list with 403.
pub async fn admin_access_middleware(
    State(access): State<AdminAccess>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if !access.permits(connect_info.as_ref()) {
        tracing::warn!(
            peer = ?connect_info.map(|ci| ci.0.ip()),
            path = %request.uri().path(),
            "admin request refused"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error_code": "FORBIDDEN",
                "message": "admin endpoints are not available to this client"
            })),
        )
            .into_response();
    }
    next.run(request).await
}
