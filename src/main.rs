use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use voxgate_archive::{Archiver, HttpObjectStore, ObjectStore};
use voxgate_core::config::GatewayConfig;
use voxgate_decode::DecodeConfig;
use voxgate_server::AppState;
use voxgate_telemetry::{init_telemetry, TelemetryConfig};

/// Speech ingest gateway: accepts compressed audio uploads, decodes
/// them in a sandboxed subprocess, and relays the recognizer's
/// transcript back to the caller.
#[derive(Parser, Debug)]
#[command(name = "voxgate", version)]
struct Args {
    /// Port to listen on (overrides the PORT env var).
    #[arg(long)]
    port: Option<u16>,

    /// Plain-text logs instead of JSON, for local development.
    #[arg(long)]
    plain_logs: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig {
        log_level: args.log_level,
        module_levels: Vec::new(),
        json: !args.plain_logs,
    });

    let mut config = GatewayConfig::from_env().context("loading configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    let decode = DecodeConfig {
        disable_jail: config.disable_jail,
        ..Default::default()
    };
    if config.disable_jail {
        tracing::warn!("decoder sandbox disabled");
    }

    let archiver = config.store_url.as_deref().map(|url| {
        Archiver::new(Arc::new(HttpObjectStore::new(url)) as Arc<dyn ObjectStore>)
    });
    if archiver.is_none() {
        tracing::info!("no store configured, archiving disabled");
    }

    tracing::info!(
        port = config.port,
        asr_url = %config.asr_url,
        max_body_bytes = config.max_body_bytes,
        "starting gateway"
    );

    let state = AppState::new(config, decode, archiver);
    let handle = voxgate_server::start(state)
        .await
        .context("binding listener")?;
    tracing::info!(port = handle.port, "gateway ready");

    shutdown_signal().await;
    tracing::info!("shutting down");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
