//! Email Deliverability Verification API Server
//!
//! HTTP boundary over the verifier_core pipeline: single and bulk
//! verification, metrics, and runtime rate-limit configuration, built
//! with axum and tokio.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verifier_core::{EmailVerifier, MetricsTracker, RateLimiter, WorkerPool};

mod api_handler;
mod config;
mod jobs;
mod routes;

use config::AppConfig;
use jobs::JobStore;

/// Shared application state. All process-lifetime services are
/// constructed explicitly at startup and threaded through the handlers.
pub struct AppState {
    pub verifier: Arc<EmailVerifier>,
    pub pool: Arc<WorkerPool>,
    pub limiter: Arc<RateLimiter>,
    pub metrics: Arc<MetricsTracker>,
    pub jobs: Arc<JobStore>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config)?;

    info!(
        "Starting Email Deliverability Verification API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = Arc::new(MetricsTracker::new());
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.to_core_config()));
    let verifier = Arc::new(
        EmailVerifier::new(
            config.verification.to_verifier_config(),
            metrics.clone(),
            limiter.clone(),
        )
        .map_err(|e| format!("Failed to initialize verifier: {}", e))?,
    );

    let max_workers = match config.verification.max_workers {
        0 => WorkerPool::default_max_workers(),
        configured => configured,
    };
    let pool = Arc::new(WorkerPool::new(verifier.clone(), max_workers));
    info!(max_workers, "worker pool started");

    let state = Arc::new(AppState {
        verifier,
        pool: pool.clone(),
        limiter,
        metrics,
        jobs: Arc::new(JobStore::new()),
        config: Arc::new(config.clone()),
    });

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Single verification: POST http://{}/api/validate-email", addr);
    info!("Bulk verification:   POST http://{}/api/validate-emails", addr);
    info!("Metrics:             GET  http://{}/api/metrics", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.terminate();
    info!("Server shut down gracefully");
    Ok(())
}

/// Assemble the router with CORS, tracing and compression layers.
fn create_router(state: Arc<AppState>) -> Router {
    routes::build_routes(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
}

/// Load configuration: defaults, then optional Config.toml, then
/// EMAIL_API_-prefixed environment variables.
fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if std::path::Path::new("Config.toml").exists() {
        figment = figment.merge(Toml::file("Config.toml"));
    }

    figment = figment.merge(Env::prefixed("EMAIL_API_").split("_"));

    let config: AppConfig = figment.extract()?;
    Ok(config)
}

/// Initialize tracing and logging.
fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
