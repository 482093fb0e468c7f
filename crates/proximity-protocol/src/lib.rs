//! proximity-protocol
//!
//! Wire-level encoding/decoding for the proximity server.
//!
//! This crate turns logical frames ([`ClientFrame`] / [`ServerFrame`])
//! into lines of text and back again.
//!
//! - [`json_codec`] : one JSON object per line (apps)
//! - [`text_codec`] : comma-separated commands (netcat / debugging)

pub mod wire_types;
pub mod messages;
pub mod error;
pub mod json_codec;
pub mod text_codec;

pub use error::ProtocolError;
pub use messages::{ClientFrame, ClientRequest, LocationOutcome, Reply, ServerFrame};
pub use wire_types::WireFormat;

impl WireFormat {
    /// Decode one line in this format.
    pub fn parse_input_line(self, line: &str) -> Result<ClientFrame, ProtocolError> {
        match self {
            WireFormat::Json => json_codec::parse_input_line(line),
            WireFormat::Text => text_codec::parse_input_line(line),
        }
    }

    /// Encode one frame in this format (no trailing newline).
    pub fn format_output(self, frame: &ServerFrame) -> String {
        match self {
            WireFormat::Json => json_codec::format_output(frame),
            WireFormat::Text => text_codec::format_output(frame),
        }
    }
}
