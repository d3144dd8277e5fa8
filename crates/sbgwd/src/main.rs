//! sbgwd - Southbound Gateway Daemon
//!
//! Serves the device get/set HTTP API and translates calls to gNMI or
//! NETCONF according to the device registry.
//!
//! Usage:
//!   sbgwd [--config sbgwd.toml] [--registry connect.json] [--port 5000]

mod config;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sbgw_api::{create_router, AppState};
use sbgw_conv::UnwrapRules;
use sbgw_core::{
    CredentialResolver, DeviceRegistry, EnvCredentialStore, FallbackPolicy, FileRegistry,
};
use sbgw_gateway::{Dispatcher, GatewayContext};
use sbgw_gnmi::{GnmiDriver, GnmiPathMapper, TonicConnector};
use sbgw_netconf::{NetconfDriver, SshConnector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const DEFAULT_LOG_FILTER: &str =
    "sbgwd=info,sbgw_api=info,sbgw_gateway=info,sbgw_gnmi=info,sbgw_netconf=info";

#[derive(Parser)]
#[command(name = "sbgwd")]
#[command(author, version, about = "Southbound gateway for gNMI and NETCONF devices")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "SBGW_CONFIG")]
    config: Option<PathBuf>,

    /// Device registry file, overrides [registry] path
    #[arg(short, long, env = "SBGW_REGISTRY")]
    registry: Option<PathBuf>,

    /// Listen port, overrides [server] port
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    tracing::info!("Starting sbgwd (Southbound Gateway Daemon)");

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            Config::load_from(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            Config::default()
        }
    }
    .merge_with_args(cli.registry, cli.port);

    tracing::info!(?config, "Effective configuration");

    let context = build_context(&config);
    let app = create_router(AppState::new(Dispatcher::new(Arc::new(context))));

    let ip: IpAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    let addr = SocketAddr::new(ip, config.server.port);
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("sbgwd stopped");
    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wire registry, credentials and both drivers into one context
fn build_context(config: &Config) -> GatewayContext {
    let registry = DeviceRegistry::new(Arc::new(FileRegistry::new(&config.registry.path)));
    tracing::info!(registry = %registry.describe(), "Device registry");

    let fallback = match &config.credentials.fallback {
        Some(secret) => {
            tracing::warn!("Credential fallback enabled; devices without a stored secret use it");
            FallbackPolicy::Default(secret.clone())
        }
        None => FallbackPolicy::Deny,
    };
    let credentials = CredentialResolver::new(
        Arc::new(EnvCredentialStore::new(config.credentials.env_prefix.clone())),
        fallback,
    );

    let gnmi = GnmiDriver::new(
        Arc::new(TonicConnector::new(Duration::from_millis(
            config.gnmi.connect_timeout_ms,
        ))),
        GnmiPathMapper::new(config.gnmi.path_prefix.clone()),
    );
    let netconf = NetconfDriver::new(
        Arc::new(SshConnector::new(Duration::from_millis(
            config.netconf.connect_timeout_ms,
        ))),
        UnwrapRules::new(config.netconf.envelopes.iter().cloned()),
    );

    GatewayContext::new(registry, credentials)
        .with_driver(Arc::new(gnmi))
        .with_driver(Arc::new(netconf))
        .with_request_timeout(config.request.timeout())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
