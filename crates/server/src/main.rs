//! stmtpdf server binary

use anyhow::Context;
use clap::Parser;
use statement::RenderConfig;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stmtpdf_server::{app, AppState};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "stmtpdf_server=info,statement=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(name = "stmtpdf-server", version, about = "Serve statement PDFs over HTTP")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "STMTPDF_PORT", default_value_t = 9090)]
    port: u16,

    /// Path to the JSON render configuration
    #[arg(long, env = "STMTPDF_CONFIG", default_value = "conf.json")]
    config: PathBuf,

    /// Append log output to this file instead of stdout
    #[arg(long, env = "STMTPDF_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Seconds a render may take before it is cancelled
    #[arg(long, default_value_t = 10)]
    render_timeout_secs: u64,
}

fn init_tracing(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let (stdout_layer, file_layer) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (Some(tracing_subscriber::fmt::layer()), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    tracing::info!("Starting stmtpdf server v{}", env!("CARGO_PKG_VERSION"));

    let config = RenderConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.validate().context("invalid configuration")?;
    tracing::info!(
        text = %config.path_to_text.display(),
        pdf = %config.path_to_pdf.display(),
        font = %config.font_file.display(),
        "configuration loaded"
    );

    let state = AppState::new(
        Arc::new(config),
        Duration::from_secs(cli.render_timeout_secs),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("stmtpdf server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
