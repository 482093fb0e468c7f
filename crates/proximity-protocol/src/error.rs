use thiserror::Error;

/// Errors while decoding a client line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("`{event}` expects {expected} field(s), got {got}")]
    FieldCount {
        event: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
