// crates/proximity-protocol/src/text_codec.rs

//! Comma-separated text codec, for poking the server with netcat.
//!
//! Input format (lines → `ClientFrame`, never carries an ack id):
//!
//! - Auth:            `A, token`
//! - Ping:            `P`
//! - Update location: `L, lat, lon`
//! - Nearby users:    `N`
//! - Send message:    `M, text` (text may itself contain commas)
//! - Profile changed: `U`
//!
//! Output format (`ServerFrame` → line):
//!
//! - Authenticated:   `A, uid`
//! - Pong:            `P`
//! - Location:        `L, bucket, placed|moved|unchanged`
//! - Nearby users:    `N, count, uid:displayName, ...`
//! - Message sent:    `S, recipients`
//! - Profile updated: `U, displayName, profilePicture`
//! - Relayed message: `M, fromUid, displayName, text`
//! - Error:           `E, message`

use crate::error::ProtocolError;
use crate::messages::{ClientFrame, ClientRequest, Reply, ServerFrame};

/// Parse a single text line into a [`ClientFrame`].
pub fn parse_input_line(line: &str) -> Result<ClientFrame, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let (tag, rest) = match trimmed.split_once(',') {
        Some((tag, rest)) => (tag.trim(), Some(rest.trim())),
        None => (trimmed, None),
    };

    let request = match tag {
        "A" => ClientRequest::Auth {
            token: single_field("auth", rest)?.to_string(),
        },
        "P" => no_fields("ping", rest, ClientRequest::Ping)?,
        "L" => parse_location(rest)?,
        "N" => no_fields("nearby", rest, ClientRequest::GetNearbyUsers)?,
        "M" => ClientRequest::SendMessage {
            text: single_field("message", rest)?.to_string(),
        },
        "U" => no_fields("profile", rest, ClientRequest::NotifyUpdateProfile)?,
        other => return Err(ProtocolError::UnknownEvent(other.to_string())),
    };

    Ok(ClientFrame::new(None, request))
}

fn parse_location(rest: Option<&str>) -> Result<ClientRequest, ProtocolError> {
    // L, lat, lon
    let tokens = split_and_trim(rest.unwrap_or(""), ',');
    if tokens.len() != 2 {
        return Err(ProtocolError::FieldCount {
            event: "location",
            expected: 2,
            got: rest.map_or(0, |_| tokens.len()),
        });
    }

    let lat = parse_f64(&tokens[0])?;
    let lon = parse_f64(&tokens[1])?;
    Ok(ClientRequest::UpdateLocation { lat, lon })
}

/// Format a [`ServerFrame`] as a text line (no newline).
pub fn format_output(frame: &ServerFrame) -> String {
    match frame {
        ServerFrame::Ack { reply, .. } => match reply {
            Reply::Authenticated { user } => format!("A, {}", user),
            Reply::Pong => "P".to_string(),
            Reply::Location { bucket, outcome } => {
                format!("L, {}, {}", bucket, outcome.as_str())
            }
            Reply::NearbyUsers(users) => {
                let mut line = format!("N, {}", users.len());
                for (uid, profile) in users {
                    line.push_str(&format!(", {}:{}", uid, profile.display_name));
                }
                line
            }
            Reply::MessageSent { recipients } => format!("S, {}", recipients),
            Reply::ProfileUpdated(p) => {
                format!("U, {}, {}", p.display_name, p.profile_picture)
            }
        },
        ServerFrame::Error { message, .. } => format!("E, {}", message),
        ServerFrame::Message {
            from,
            display_name,
            text,
        } => format!("M, {}, {}, {}", from, display_name, text),
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn single_field<'a>(event: &'static str, rest: Option<&'a str>) -> Result<&'a str, ProtocolError> {
    match rest {
        Some(field) if !field.is_empty() => Ok(field),
        _ => Err(ProtocolError::FieldCount {
            event,
            expected: 1,
            got: 0,
        }),
    }
}

fn no_fields(
    event: &'static str,
    rest: Option<&str>,
    request: ClientRequest,
) -> Result<ClientRequest, ProtocolError> {
    match rest {
        None => Ok(request),
        Some(rest) => Err(ProtocolError::FieldCount {
            event,
            expected: 0,
            got: split_and_trim(rest, ',').len(),
        }),
    }
}

fn split_and_trim(s: &str, delimiter: char) -> Vec<String> {
    s.split(delimiter)
        .map(|tok| tok.trim().to_string())
        .collect()
}

fn parse_f64(s: &str) -> Result<f64, ProtocolError> {
    s.parse::<f64>()
        .map_err(|_| ProtocolError::InvalidNumber(s.to_string()))
}
