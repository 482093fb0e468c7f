//! Error types for the proximity core.
//!
//! The index operations themselves are infallible; errors only come from
//! validating input at the registry boundary and from construction.

use thiserror::Error;

use crate::connection::ConnectionId;
use crate::position::POSITION_PRECISION;
use crate::region_index::MAX_QUERY_RADIUS;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Latitude/longitude is NaN, infinite, or outside valid degrees.
    #[error("invalid coordinates (lat = {lat}, lon = {lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// Bucket precision outside what positions can provide.
    #[error("bucket precision {0} is out of range (1..={max})", max = POSITION_PRECISION)]
    InvalidPrecision(usize),

    /// Query radius wider than a registry will search.
    #[error("query radius {0} is out of range (0..={max})", max = MAX_QUERY_RADIUS)]
    InvalidRadius(u32),

    /// The connection id is already live.
    #[error("connection {0} is already admitted")]
    DuplicateConnection(ConnectionId),

    /// A string that is not a geohash cell.
    #[error("invalid geohash: {0}")]
    InvalidGeohash(String),
}

impl From<::geohash::GeohashError> for CoreError {
    fn from(e: ::geohash::GeohashError) -> Self {
        CoreError::InvalidGeohash(e.to_string())
    }
}
