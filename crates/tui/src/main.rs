mod app;
mod widgets;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use gamelog_core::{
    config::{self, AppConfig},
    DashboardApi, DataFetcher, HttpBackend, VersionPoller,
};
use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let backend = HttpBackend::from_config(&config).context("failed to build HTTP client")?;
    let probe = backend.clone();
    tokio::spawn(async move {
        if let Err(err) = probe.health().await {
            tracing::warn!(error = %err, "Backend health check failed");
        }
    });

    let api: Arc<dyn DashboardApi> = Arc::new(backend);
    let fetcher = DataFetcher::new(api.clone(), &config.api_base);

    let (poll_tx, poll_rx) = mpsc::channel(16);
    let poller = VersionPoller::new(api, config.poll_interval()).with_diagnostics(poll_tx);

    let mut app = app::DashboardApp::new(fetcher, poller, poll_rx);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("gamelog.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The dashboard owns the terminal, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
