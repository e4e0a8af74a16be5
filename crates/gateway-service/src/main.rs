//! Gateway service
//!
//! Entry point. Loads configuration, fetches the Cognito key set, and serves
//! the API until SIGINT or SIGTERM.

use gateway_service::config::{Config, Stage};
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::server::Gateway;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(Stage::from_env());

    info!("Starting gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        region = %config.cognito_region,
        bind_address = %config.bind_address,
        stage = ?config.stage,
        jwks_refresh_interval_seconds = config.jwks_refresh_interval.as_secs(),
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Fatal if the key set cannot be loaded; nothing is served without keys
    let gateway = Gateway::start(config, metrics_handle).await.map_err(|e| {
        error!("Failed to start gateway: {}", e);
        e
    })?;

    gateway.serve(shutdown_signal()).await?;

    info!("Gateway shutdown complete");

    Ok(())
}

fn init_tracing(stage: Stage) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gateway_service=info,tower_http=info,gw=info".into());

    let (json_layer, plain_layer) = match stage {
        Stage::Prod => (Some(tracing_subscriber::fmt::layer().json()), None),
        Stage::Beta => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("GW_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}
