use anyhow::{Context, Result};
use persistence::repositories::AuditLogRepository;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use warehouse_api::app;
use warehouse_api::config::Config;
use warehouse_api::jobs::{JobScheduler, PoolMetricsJob, RetentionSweepJob};
use warehouse_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!(
        "Starting warehouse audit service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let store = app::create_audit_store(&config)?;
    info!(
        backend = store.backend_name(),
        retention_days = store.retention().num_days(),
        "Audit store configured"
    );

    // Warm the store in the background; requests arriving first share the attempt
    {
        let store = store.clone();
        tokio::spawn(async move {
            if !store.ensure_ready().await {
                warn!("Audit store unavailable; audit writes are dropped and reads return empty pages");
            }
        });
    }

    let mut scheduler = JobScheduler::new();
    scheduler.register(RetentionSweepJob::new(
        store.clone(),
        config.audit.sweep_interval_minutes,
    ));
    if let Some(job) = PoolMetricsJob::for_store(&store) {
        scheduler.register(job);
    }
    scheduler.start();

    let addr = config.socket_addr().context("Invalid server address")?;
    let app = app::create_app(config, AuditLogRepository::new(store));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
