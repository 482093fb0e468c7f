//! Proximity TCP server.

use anyhow::Result;
use proximity_server::config::Config;
use proximity_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    info!(
        "starting proximity-server on {}:{} (max_clients = {}, precision = {})",
        config.bind_addr, config.port, config.max_clients, config.geohash_precision
    );

    server::run(config).await
}
