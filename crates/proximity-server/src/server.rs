//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Builds the region index and connection registry (the only instance
//!   for the process) and hands them to the hub task.
//! - Listens on the configured address/port.
//! - Accepts new TCP connections and assigns each a fresh `ConnectionId`.
//! - Spawns a per-client task to handle I/O.
//!
//! The per-client logic and hub loop live in `client` and `hub_task`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use proximity_core::{ConnectionId, RegionIndex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::client;
use crate::config::Config;
use crate::directory::{self, SharedDirectory};
use crate::hub_task;
use crate::types::{HubRx, HubTx, Registry};

/// Counter for assigning unique `ConnectionId`s; never reused.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind the configured address and serve forever.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("listening on {}", addr);

    let directory = directory::load(config.directory_file.as_deref())?;
    serve(listener, config, directory).await
}

/// Serve clients on an already-bound listener.
pub async fn serve(listener: TcpListener, config: Config, directory: SharedDirectory) -> Result<()> {
    config.validate()?;

    let index = RegionIndex::new(config.geohash_precision)?;
    let registry = Registry::new(index, config.query_options())?;
    info!(
        precision = config.geohash_precision,
        radius = config.query_radius,
        exclude_self = config.exclude_self,
        "region index ready"
    );

    // Channel from clients → hub task.
    let (hub_tx, hub_rx): (HubTx, HubRx) = mpsc::unbounded_channel();

    // Spawn the central hub task.
    {
        let directory = directory.clone();
        tokio::spawn(async move {
            hub_task::run_hub_loop(hub_rx, registry, directory).await;
        });
    }

    // Sockets currently open, admitted or not.
    let live = Arc::new(AtomicUsize::new(0));

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        if live.load(Ordering::Acquire) >= config.max_clients {
            warn!(
                %peer_addr,
                max_clients = config.max_clients,
                "rejecting connection: max_clients reached"
            );
            // Just drop the stream; client will see the connection closed.
            continue;
        }

        let conn = next_connection_id();
        live.fetch_add(1, Ordering::AcqRel);
        info!(%conn, %peer_addr, "accepted connection");

        let hub_tx = hub_tx.clone();
        let directory = directory.clone();
        let live = live.clone();

        tokio::spawn(async move {
            if let Err(e) = client::run_client(conn, stream, hub_tx, directory).await {
                error!(%conn, error = %e, "client error");
            }
            live.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
