use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blobdisco::agent::DiscoveryAgent;
use blobdisco::api;
use blobdisco::cli;
use blobdisco::cluster::{DiscoveryInput, MembershipDirectory};
use blobdisco::config::ConfigReader;
use blobdisco::record::SystemClock;
use blobdisco::storage::{StorageClient, StoreConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blobdisco=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings();
    // Socket server listen address setup
    let listen_address: IpAddr = settings
        .listen_address
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid ip address: {}", settings.listen_address))?;
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    // Discovery wiring
    let storage = StorageClient::new(
        Arc::new(ConfigReader::new(settings.home.clone())),
        StoreConnector::new(),
        settings.reload_policy,
    );
    let directory =
        MembershipDirectory::new(storage, Arc::new(SystemClock), settings.unavailable_policy);
    let input = DiscoveryInput::new(settings.node_id(), settings.cluster_address());
    let agent = DiscoveryAgent::new(directory, input, settings.default_reload_interval());
    let status = agent.status();

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let agent_handle = tokio::spawn(agent.run(async move {
        let _ = shutdown_rx.changed().await;
    }));

    // Start server
    info!("Starting {} on {}", blobdisco::settings::APP_NAME, socket_address);
    axum::Server::bind(&socket_address)
        .serve(api::api(status).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    // Give the agent a chance to remove this node's record
    let _ = shutdown_tx.send(true);
    agent_handle.await?;

    Ok(())
}
