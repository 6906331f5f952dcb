//! Stock Stream Client Binary
//!
//! Connects to the stock price feed and keeps the latest symbols in memory.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stock-stream-client
//! ```
//!
//! # Environment Variables
//!
//! - `FEED_BASE_URL`: Feed endpoint (default: wss://mockly.me/ws/stream)
//! - `FEED_CLIENT_ID_PREFIX`: Client identifier prefix (default: stream-client)
//! - `FEED_FREQUENCY`: Requested updates per second (default: 1.0)
//! - `FEED_VOLATILITY`: Requested price volatility (default: 0.02)
//! - `FEED_RECONNECT_DELAY_MS`: Reconnect delay (default: 5000)
//! - `FEED_RETENTION_CAPACITY`: Retained records (default: 10)
//! - `FEED_RETENTION_POLICY`: reference | uniform (default: reference)
//! - `FEED_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `FEED_SNAPSHOT_LOG_INTERVAL_SECS`: Snapshot log interval, 0 disables (default: 30)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: stock-stream-client)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use stock_stream_client::infrastructure::health::{HealthServer, HealthServerState};
use stock_stream_client::infrastructure::telemetry;
use stock_stream_client::{
    ConnectionState, FeedConfig, FeedStatus, FeedView, StreamClient, WsTransport, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for the close handshake on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    tracing::info!("Starting stock stream client");

    let _metrics_handle = init_metrics()?;

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let client = Arc::new(StreamClient::from_config(WsTransport::default(), &config));

    if config.server.health_port > 0 {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&client) as Arc<dyn FeedStatus>,
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    if !config.server.snapshot_log_interval.is_zero() {
        let view = Arc::clone(&client) as Arc<dyn FeedView>;
        tokio::spawn(log_snapshots(
            view,
            config.server.snapshot_log_interval,
            shutdown_token.clone(),
        ));
    }

    client.start();

    tracing::info!("Stock stream client ready");

    await_shutdown(shutdown_token).await;

    if client.shutdown(SHUTDOWN_TIMEOUT).await {
        tracing::info!("Feed session closed");
    } else {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Feed session did not close in time"
        );
    }

    tracing::info!("Stock stream client stopped");
    Ok(())
}

/// Periodically log the retained records until cancelled.
async fn log_snapshots(view: Arc<dyn FeedView>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let state = view.connection_state();
        let snapshot = view.snapshot();

        if snapshot.is_empty() {
            if state == ConnectionState::Connected {
                tracing::info!("Connected, waiting for updates");
            } else {
                tracing::info!(state = %state, "No stock data");
            }
            continue;
        }

        tracing::info!(state = %state, retained = snapshot.len(), "Feed snapshot");
        for record in &snapshot {
            tracing::info!(
                symbol = %record.symbol,
                name = record.display_name.as_deref().unwrap_or("-"),
                industry = record.category.as_deref().unwrap_or("-"),
                price = %record.price.map_or_else(|| "N/A".to_string(), |p| format!("{p:.2}")),
                observed_at = %record.observed_at.format("%H:%M:%S"),
                "Retained record"
            );
        }
    }
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        base_url = %config.feed.base_url,
        frequency = config.feed.frequency,
        volatility = config.feed.volatility,
        reconnect_delay_ms = u64::try_from(config.feed.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
        capacity = config.retention.capacity,
        policy = config.retention.policy.as_str(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
