use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::UnixListener;
use tokio::sync::Mutex;

use knot_cloud::InMemoryCloud;
use knot_gateway::{Dispatcher, GatewayConfig};

#[derive(Parser)]
#[command(name = "knot-gateway", about = "KNOT IoT gateway daemon")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/knot/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config first: the [logging] section feeds the subscriber setup.
    let config = match GatewayConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        knot_gateway::logging::init_json(&config.logging.level);
    } else {
        knot_gateway::logging::init(&config.logging.level);
    }

    // A socket file left behind by a previous run would fail the bind.
    if config.gateway.socket_path.exists() {
        let _ = std::fs::remove_file(&config.gateway.socket_path);
    }
    if let Some(parent) = config.gateway.socket_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), error = %e, "failed to create socket directory");
            std::process::exit(1);
        }
    }
    let listener = match UnixListener::bind(&config.gateway.socket_path) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(
                path = %config.gateway.socket_path.display(),
                error = %e,
                "failed to bind node socket"
            );
            std::process::exit(1);
        }
    };
    tracing::info!(path = %config.gateway.socket_path.display(), "listening for nodes");

    // The in-memory cloud is the only shipped backend; the CloudAdapter
    // trait is the seam for wiring a real remote.
    let dispatcher = Arc::new(Mutex::new(Dispatcher::new(InMemoryCloud::new())));

    let serve = knot_gateway::transport::serve(listener, Arc::clone(&dispatcher));
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node transport failed");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
        }
    }

    // Roll back provisional registrations before exit.
    dispatcher.lock().await.shutdown().await;
    let _ = std::fs::remove_file(&config.gateway.socket_path);
}

/// Completes on SIGINT, or on SIGTERM where available (Docker sends
/// SIGTERM on `docker stop`).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
