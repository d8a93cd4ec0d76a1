use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chat_throttle::adapters::http::{rate_limit_router, RouterOptions};
use chat_throttle::adapters::rate_limiter::{LiveRateLimitSettings, RateLimitService};
use chat_throttle::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_configured()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "starting chat-throttle"
    );

    let settings = Arc::new(LiveRateLimitSettings::new(config.rate_limit.clone()));
    let service = Arc::new(RateLimitService::from_config(&config, settings.clone()).await?);
    spawn_reload_on_hangup(settings);

    let options = RouterOptions::from_config(&config.server);
    if !options.trusted_proxies.is_empty() {
        tracing::info!(proxies = ?config.server.trusted_proxies, "honoring forwarding headers from trusted proxies");
    }
    if options.admin.is_some() {
        tracing::info!(allowlist = ?config.server.admin_allowlist, "admin routes enabled");
    }
    let app = rate_limit_router(service.clone(), options)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, backend = service.backend().as_str(), "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }
}

/// Re-read rate limit settings each time the process receives SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_hangup(settings: Arc<LiveRateLimitSettings>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for SIGHUP, settings reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            match settings.reload_from_env() {
                Ok(()) => tracing::info!("rate limit settings reloaded"),
                Err(e) => tracing::error!(error = %e, "settings reload rejected, keeping current limits"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_settings: Arc<LiveRateLimitSettings>) {}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
