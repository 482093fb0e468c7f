//! JSON line codec.
//!
//! Every frame is one JSON object on its own line.
//!
//! Client → server:
//!
//! ```text
//! {"event":"auth","ack":1,"data":{"token":"..."}}
//! {"event":"ping","ack":2}
//! {"event":"updateLocation","ack":3,"data":{"lat":37.77,"lon":-122.41}}
//! {"event":"getNearbyUsers","ack":4}
//! {"event":"sendMessage","ack":5,"data":{"text":"hi"}}
//! {"event":"notifyUpdateProfile","ack":6}
//! ```
//!
//! Server → client:
//!
//! ```text
//! {"ack":4,"ok":true,"data":{"uid-a":{"displayName":"A","profilePicture":"a.png"}}}
//! {"ack":3,"ok":false,"error":"invalid coordinates (lat = 91, lon = 0)"}
//! {"event":"message","data":{"from":"uid-b","displayName":"B","text":"hi"}}
//! ```
//!
//! `ack` is optional on requests and echoed as `null` when absent.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProtocolError;
use crate::messages::{ClientFrame, ClientRequest, Reply, ServerFrame};
use crate::wire_types::event;

#[derive(Debug, Deserialize)]
struct RawRequest {
    event: String,
    #[serde(default)]
    ack: Option<u64>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct LocationData {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    text: String,
}

/// Parse one JSON line into a [`ClientFrame`].
pub fn parse_input_line(line: &str) -> Result<ClientFrame, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let raw: RawRequest = serde_json::from_str(trimmed)?;

    let request = match raw.event.as_str() {
        event::AUTH => {
            let AuthData { token } = serde_json::from_value(raw.data)?;
            ClientRequest::Auth { token }
        }
        event::PING => ClientRequest::Ping,
        event::UPDATE_LOCATION => {
            let LocationData { lat, lon } = serde_json::from_value(raw.data)?;
            ClientRequest::UpdateLocation { lat, lon }
        }
        event::GET_NEARBY_USERS => ClientRequest::GetNearbyUsers,
        event::SEND_MESSAGE => {
            let MessageData { text } = serde_json::from_value(raw.data)?;
            ClientRequest::SendMessage { text }
        }
        event::NOTIFY_UPDATE_PROFILE => ClientRequest::NotifyUpdateProfile,
        _ => return Err(ProtocolError::UnknownEvent(raw.event)),
    };

    Ok(ClientFrame::new(raw.ack, request))
}

/// Format a [`ClientFrame`] as a JSON line (client side; no newline).
pub fn format_input(frame: &ClientFrame) -> String {
    let (name, data) = match &frame.request {
        ClientRequest::Auth { token } => (event::AUTH, json!({ "token": token })),
        ClientRequest::Ping => (event::PING, Value::Null),
        ClientRequest::UpdateLocation { lat, lon } => {
            (event::UPDATE_LOCATION, json!({ "lat": lat, "lon": lon }))
        }
        ClientRequest::GetNearbyUsers => (event::GET_NEARBY_USERS, Value::Null),
        ClientRequest::SendMessage { text } => (event::SEND_MESSAGE, json!({ "text": text })),
        ClientRequest::NotifyUpdateProfile => (event::NOTIFY_UPDATE_PROFILE, Value::Null),
    };

    let mut obj = json!({ "event": name, "ack": frame.ack });
    if !data.is_null() {
        obj["data"] = data;
    }
    obj.to_string()
}

/// Format a [`ServerFrame`] as a JSON line (no newline).
pub fn format_output(frame: &ServerFrame) -> String {
    let value = match frame {
        ServerFrame::Ack { ack, reply } => json!({
            "ack": ack,
            "ok": true,
            "data": reply_data(reply),
        }),
        ServerFrame::Error { ack, message } => json!({
            "ack": ack,
            "ok": false,
            "error": message,
        }),
        ServerFrame::Message {
            from,
            display_name,
            text,
        } => json!({
            "event": event::MESSAGE,
            "data": {
                "from": from,
                "displayName": display_name,
                "text": text,
            },
        }),
    };
    value.to_string()
}

fn reply_data(reply: &Reply) -> Value {
    match reply {
        Reply::Authenticated { user } => json!({ "uid": user }),
        Reply::Pong => json!("pong"),
        Reply::Location { bucket, outcome } => json!({
            "bucket": bucket,
            "outcome": outcome.as_str(),
        }),
        Reply::NearbyUsers(users) => json!(users),
        Reply::MessageSent { recipients } => json!({ "recipients": recipients }),
        Reply::ProfileUpdated(profile) => json!(profile),
    }
}
