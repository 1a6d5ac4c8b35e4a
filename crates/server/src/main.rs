// crates/server/src/main.rs
//! FACTS server binary.
//!
//! Loads configuration, creates the three storage roots and serves the API
//! until interrupted. Jobs are started over HTTP, never at startup.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use facts_server::{create_app, init_metrics, AppState, Cli, ServerConfig};

/// stderr always; a daily-rolling file under `log_dir` when configured.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let stderr = fmt::layer().with_writer(std::io::stderr).compact();

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "facts.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().json().with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .try_init()?;
            Ok(None)
        }
    }
}

fn create_roots(config: &ServerConfig) -> Result<()> {
    for root in [&config.downloads_root, &config.data_root, &config.analysis_root] {
        std::fs::create_dir_all(root)
            .with_context(|| format!("creating directory {}", root.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(&cli)?;
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    init_metrics();
    create_roots(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        locale = ?config.locale,
        generator = %config.generator_command,
        downloads_root = %config.downloads_root.display(),
        data_root = %config.data_root.display(),
        analysis_root = %config.analysis_root.display(),
        "starting facts server"
    );

    let state = AppState::from_config(config).context("invalid generator command")?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
