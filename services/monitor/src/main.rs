use anyhow::{Context, Result};
use binwatch_monitor::api::{start_api_server, AppState};
use binwatch_monitor::{
    notifier, AlertEvaluator, Config, FileRecorder, SensorSubscriber, SharedBinState,
};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        bin_height_mm = config.bin.height_mm,
        threshold_percentage = config.alerts.threshold_percentage,
        "Starting Binwatch Monitor"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    let bin_state = SharedBinState::new();

    let recorder = Arc::new(FileRecorder::new(&config.alerts.log_path));
    info!(path = %recorder.path().display(), "Recording alerts");

    let alerts = AlertEvaluator::new(
        bin_state.clone(),
        config.alerts.threshold_percentage,
        Arc::from(notifier::from_config(&config.speech)),
        recorder,
    );

    let subscriber = SensorSubscriber::new(&config.mqtt, bin_state.clone(), config.bin.height_mm);

    let api_state = AppState {
        service_name: config.service.name.clone(),
        bin_state,
        alerts,
    };

    // Spawn MQTT subscriber task
    let shutdown = CancellationToken::new();
    let subscriber_handle = tokio::spawn(subscriber.run(shutdown.clone()));

    // Spawn API server task
    let api_config = config.api.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, &api_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Binwatch monitor started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down binwatch monitor");

    shutdown.cancel();
    match subscriber_handle.await {
        Ok(Err(e)) => error!(error = %e, "MQTT subscriber error"),
        Err(e) => error!(error = %e, "MQTT subscriber task failed"),
        Ok(Ok(())) => {}
    }
    api_handle.abort();

    info!("Binwatch monitor stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
