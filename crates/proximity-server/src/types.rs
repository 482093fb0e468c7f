//! Shared types for the proximity TCP server.
//!
//! This module defines:
//! - channel aliases between client tasks and the hub task
//! - `HubRequest`: events flowing from clients to the hub

use proximity_core::{ConnectionId, ConnectionRegistry, Profile, UserId};
use proximity_protocol::{ClientRequest, ServerFrame};
use tokio::sync::mpsc;

/// Outbound frames to a given client.
pub type OutboundTx = mpsc::UnboundedSender<ServerFrame>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerFrame>;

/// The registry as the server uses it: records carry the client's
/// outbound channel.
pub type Registry = ConnectionRegistry<OutboundTx>;

/// Event flowing from a client task into the hub task.
#[derive(Debug)]
pub enum HubRequest {
    /// Handshake succeeded; add the connection to the registry.
    Admit {
        conn: ConnectionId,
        ack: Option<u64>,
        user: UserId,
        profile: Profile,
        outbound: OutboundTx,
    },

    /// A request from an admitted connection.
    Request {
        conn: ConnectionId,
        ack: Option<u64>,
        request: ClientRequest,
    },

    /// Socket closed; drop the connection.
    Evict { conn: ConnectionId },
}

/// Channel from clients → hub task.
pub type HubTx = mpsc::UnboundedSender<HubRequest>;
pub type HubRx = mpsc::UnboundedReceiver<HubRequest>;
