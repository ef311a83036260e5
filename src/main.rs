use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dgwatch::config::{spawn_config_watcher, ConfigStore, LoggingConfig};
use dgwatch::health::{HealthChecker, ProbeSettings};
use dgwatch::server::{self, AppState};

/// Oracle Data Guard health monitor
#[derive(Debug, Parser)]
#[command(name = "dgwatch", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'f', long = "config", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = ConfigStore::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let store = Arc::new(store);
    let config = store.snapshot();

    init_logging(&config.logging)?;
    info!(
        path = %cli.config.display(),
        databases = config.databases.len(),
        "Loaded configuration"
    );

    let shutdown = CancellationToken::new();
    let watcher = match spawn_config_watcher(store.clone(), shutdown.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let checker = HealthChecker::oracle(ProbeSettings::from(&config.probe));
    let state = Arc::new(AppState::new(store.clone(), checker));

    let addr = config.server.addr();
    let mut http = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { server::serve(&addr, state, shutdown).await }
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
            shutdown.cancel();
            http.await.context("HTTP server task failed")??;
        }
        result = &mut http => {
            shutdown.cancel();
            result.context("HTTP server task failed")??;
        }
    }

    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }

    info!("dgwatch stopped");
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    match &config.filename {
        Some(filename) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("failed to open log file {}", filename))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
