//! PaperCast API Gateway
//!
//! Process entry point: loads configuration, initializes logging, metrics,
//! the paper store and the shared services, then serves the API.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use papercast_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    metrics, Repository, VERSION,
};
use papercast_gateway::{create_router, AppState};
use papercast_ingestion::{Pipeline, Services};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting PaperCast API Gateway v{}",
        VERSION
    );

    // Initialize metrics
    init_metrics(&config.observability)?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    db.ensure_schema().await?;

    // Capability services are built once and shared by every request
    let services = Services::from_config(&config)?;
    let pipeline = Pipeline::new(services, Repository::new(db.clone()), &config);

    tokio::fs::create_dir_all(pipeline.media().root())
        .await
        .context("Failed to create media root")?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        pipeline,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let drain_timeout = config.shutdown_timeout();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // in-flight pipelines get a bounded time to finish
            tokio::spawn(async move {
                tokio::time::sleep(drain_timeout).await;
                warn!("Shutdown timeout elapsed, exiting");
                std::process::exit(1);
            });
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// JSON or human-readable logs; `RUST_LOG` overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Prometheus exporter on its own listener; port 0 disables it
fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(metrics::PIPELINE_BUCKETS)?
        .install()
        .context("Failed to install Prometheus exporter")?;

    metrics::register_metrics();
    info!(%addr, "Metrics exporter listening");

    Ok(())
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
