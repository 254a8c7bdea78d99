mod bootstrap;
mod health;
mod openai;
mod webhook;
mod woocommerce;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use storechat_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use storechat_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_ascii_lowercase()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config_path = std::env::var_os("STORECHAT_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    })?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        agents = app.agents.len(),
        "storechat-server listening"
    );

    axum::serve(listener, app.router()).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "storechat-server stopping"
    );
    app.writes.drain(Duration::from_secs(app.config.server.shutdown_grace_secs)).await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
