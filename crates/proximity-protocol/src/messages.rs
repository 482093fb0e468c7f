//! Logical frames exchanged with clients.
//!
//! These are codec-agnostic; [`json_codec`](crate::json_codec) and
//! [`text_codec`](crate::text_codec) turn them into lines.

use proximity_core::{NearbyUsers, Profile, Relocation, UserId};

/// A request from a client, with an optional ack id to echo back.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFrame {
    pub ack: Option<u64>,
    pub request: ClientRequest,
}

impl ClientFrame {
    pub fn new(ack: Option<u64>, request: ClientRequest) -> Self {
        ClientFrame { ack, request }
    }
}

/// Everything a client can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// Handshake; must be the first frame on a connection.
    Auth { token: String },

    Ping,

    /// Report the client's current position.
    UpdateLocation { lat: f64, lon: f64 },

    /// List users near the client's last reported position.
    GetNearbyUsers,

    /// Relay `text` to everyone nearby.
    SendMessage { text: String },

    /// The client's stored profile changed; re-fetch it.
    NotifyUpdateProfile,
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Successful reply to a request.
    Ack { ack: Option<u64>, reply: Reply },

    /// Failed request (or failed handshake).
    Error { ack: Option<u64>, message: String },

    /// Chat message relayed from a nearby user.
    Message {
        from: UserId,
        display_name: String,
        text: String,
    },
}

impl ServerFrame {
    pub fn ack(ack: Option<u64>, reply: Reply) -> Self {
        ServerFrame::Ack { ack, reply }
    }

    pub fn error(ack: Option<u64>, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            ack,
            message: message.into(),
        }
    }
}

/// Payload of a successful reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Authenticated { user: UserId },
    Pong,
    Location { bucket: String, outcome: LocationOutcome },
    NearbyUsers(NearbyUsers),
    MessageSent { recipients: usize },
    ProfileUpdated(Profile),
}

/// How a location update affected the sender's bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LocationOutcome {
    Placed,
    Moved,
    Unchanged,
}

impl LocationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationOutcome::Placed => "placed",
            LocationOutcome::Moved => "moved",
            LocationOutcome::Unchanged => "unchanged",
        }
    }
}

impl Reply {
    /// Build a location reply from what the index did.
    pub fn location(relocation: &Relocation) -> Self {
        let outcome = match relocation {
            Relocation::Placed { .. } => LocationOutcome::Placed,
            Relocation::Moved { .. } => LocationOutcome::Moved,
            Relocation::Unchanged { .. } => LocationOutcome::Unchanged,
        };
        Reply::Location {
            bucket: relocation.bucket().to_string(),
            outcome,
        }
    }
}
