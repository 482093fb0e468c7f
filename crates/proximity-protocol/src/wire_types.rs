//! Low-level wire constants.
//!
//! This module defines:
//! - event names shared by both codecs,
//! - line/message size limits,
//! - [`WireFormat`] detection from the first byte a client sends.

/// Event names used by the JSON codec (`"event"` field).
pub mod event {
    pub const AUTH: &str = "auth";
    pub const PING: &str = "ping";
    pub const UPDATE_LOCATION: &str = "updateLocation";
    pub const GET_NEARBY_USERS: &str = "getNearbyUsers";
    pub const SEND_MESSAGE: &str = "sendMessage";
    pub const NOTIFY_UPDATE_PROFILE: &str = "notifyUpdateProfile";

    /// Server push: relayed chat message.
    pub const MESSAGE: &str = "message";
}

/// Longest line (in bytes, excluding the newline) a client may send.
///
/// Readers should drop the connection rather than buffer past this.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Longest chat text that will be relayed.
pub const MAX_MESSAGE_LEN: usize = 2 * 1024;

/// Which codec a connection speaks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireFormat {
    /// One JSON object per line.
    Json,

    /// Comma-separated commands, friendly to netcat.
    Text,
}

impl WireFormat {
    /// Pick a codec from the first byte of a connection.
    ///
    /// JSON frames always start with `{`; anything else is treated as
    /// the text protocol.
    pub fn detect(first_byte: u8) -> Self {
        if first_byte == b'{' {
            WireFormat::Json
        } else {
            WireFormat::Text
        }
    }
}

/// Chat text must be non-empty and at most [`MAX_MESSAGE_LEN`] bytes.
pub fn validate_message_len(len: usize) -> bool {
    len > 0 && len <= MAX_MESSAGE_LEN
}
