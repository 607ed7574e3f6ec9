//! Tether Subserver
//!
//! A worker behind NAT that takes client requests from a relay hub without
//! accepting inbound connections.
//!
//! Architecture:
//! - Configuration: Load settings from a JSON file or the environment
//! - Repositories: HTTP communication with the hub
//! - Services: Cancellation tracking, dispatch, response batching, download relay
//! - Handler: Local capability that executes requests against the origin server
//! - Scheduler: The poll loop
//!
//! The subserver long-polls the hub, runs each delivered request against the
//! origin server and sends results back in batches. Downloads are streamed
//! from the origin straight to the hub.

mod config;
mod context;
mod handler;
mod repository;
mod scheduler;
mod service;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::context::SubserverContext;
use crate::handler::{OriginServerHandler, RequestHandler};
use crate::repository::{HttpHubRepository, HubRepository};
use crate::scheduler::PollScheduler;
use crate::service::DownloadRelayProxy;
use tether_client::{HubClient, OriginClient, Transport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// Detects half-open hub connections while a poll is held open
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_subserver=info,tether_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tether Subserver");

    let config = load_config()?;
    info!(
        "Loaded configuration: subserver_name={}, hub_url={}, origin_url={}",
        config.subserver_name, config.hub_url, config.origin_url
    );

    // One connection pool for both the hub and the origin
    let transport = Transport::with_timeouts(CONNECT_TIMEOUT, TCP_KEEPALIVE)
        .context("Failed to build HTTP client")?;
    let hub_client = HubClient::with_transport(
        config.hub_url.clone(),
        config.subserver_name.clone(),
        config.subserver_passcode.clone(),
        transport.clone(),
    );
    let origin = OriginClient::with_transport(config.origin_url.clone(), transport.clone());

    let hub: Arc<dyn HubRepository> = Arc::new(HttpHubRepository::new(hub_client));
    let relay = DownloadRelayProxy::new(origin.clone(), transport);
    let handler: Arc<dyn RequestHandler> = Arc::new(OriginServerHandler::new(origin, relay));

    let context = SubserverContext::new(config, hub, handler);
    let scheduler = PollScheduler::new(&context);

    let shutdown = CancellationToken::new();
    let poll_loop = tokio::spawn(scheduler.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    shutdown.cancel();
    poll_loop.await.context("Poll loop task failed")?;

    let flushed = context.batcher.flush_now().await;
    info!(
        "Subserver stopped ({} pending response(s) flushed, {} request(s) still active)",
        flushed,
        context.tracker.active_count()
    );

    Ok(())
}

/// Loads configuration from a JSON file if one is named, otherwise from the
/// environment
///
/// The file is taken from the first command-line argument, then from
/// `TETHER_CONFIG`.
fn load_config() -> Result<Config> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TETHER_CONFIG").ok());

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::from_file(Path::new(&path))?
        }
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    config.validate()?;
    Ok(config)
}
