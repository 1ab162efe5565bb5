//! alertrelay - Prometheus Alertmanager webhook relay
//!
//! Receives Alertmanager webhooks over HTTP and fans each batch out to the
//! enabled notification channels.

use alertrelay::{
    cli::Cli,
    config::Config,
    internal_metrics::MetricsBuilder,
    notification::manager::NotificationManager,
    server::{AppState, WebhookServer},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).context("Failed to load configuration")?;

    // RUST_LOG, when set, wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("alertrelay starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("Metrics: {}", enabled(config.metrics.enabled));
    info!("HTTP Timeout: {}s", config.http.timeout_seconds);
    info!(
        "Fail On Error Status: {}",
        enabled(config.http.fail_on_error_status)
    );
    info!("Email (SNS): {}", enabled(config.email.is_active()));
    info!("Slack: {}", enabled(config.slack.is_active()));
    info!("Discord: {}", enabled(config.discord.is_active()));
    info!("Teams: {}", enabled(config.teams.is_active()));
    info!("PagerDuty: {}", enabled(config.pagerduty.is_active()));
    info!("-------------------------------------------------------");

    // =========================================================================
    // Create Shutdown Channel
    // =========================================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // =========================================================================
    // 1. Metrics and Notifiers
    // =========================================================================
    let prom_handle = MetricsBuilder::new(config.metrics.clone()).build();
    let manager = NotificationManager::from_config(&config)
        .await
        .context("Failed to build notification channels")?;
    info!("Active channels: {:?}", manager.channels());

    // =========================================================================
    // 2. Start the Webhook Server
    // =========================================================================
    let listener = TcpListener::bind(config.server.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_address))?;
    let state = AppState {
        manager: Arc::new(manager),
        prom_handle,
    };
    let server = WebhookServer::new(listener, state, shutdown_rx);
    info!("Listening for webhooks on {}", server.local_addr()?);
    let server_task = tokio::spawn(server.run());

    info!("alertrelay initialized successfully. Waiting for webhooks...");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");

    if shutdown_tx.send(true).is_err() {
        error!("Webhook server already stopped.");
    }

    if let Err(e) = server_task.await {
        error!("Webhook server task panicked: {:?}", e);
    }

    info!("Shutdown complete. Exiting.");

    Ok(())
}
