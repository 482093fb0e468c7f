//! Reported positions and the placement state of a connection.

use crate::error::CoreError;
use crate::geohash::{self, GeoHash};

/// Precision of the geohash carried by every [`Position`].
///
/// Region buckets use a prefix of this hash, so it must be at least as
/// long as any bucket precision.
pub const POSITION_PRECISION: usize = 9;

/// A validated WGS84 position and its derived geohash.
///
/// The geohash is computed in [`Position::new`] and cannot be set any
/// other way.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    lat: f64,
    lon: f64,
    geohash: GeoHash,
}

impl Position {
    /// Build a position from degrees.
    ///
    /// Rejects NaN/infinite values, latitudes outside `[-90, 90]` and
    /// longitudes outside `[-180, 180]`.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoreError> {
        if !lat.is_finite()
            || !lon.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lon)
        {
            return Err(CoreError::InvalidCoordinates { lat, lon });
        }

        Ok(Position {
            lat,
            lon,
            geohash: geohash::encode(lat, lon, POSITION_PRECISION)?,
        })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn geohash(&self) -> &GeoHash {
        &self.geohash
    }
}

/// Where a connection currently sits in the region index.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Placement {
    /// Admitted, but no location has been reported yet (or it was removed).
    #[default]
    Unplaced,

    /// Last reported position.
    PlacedAt(Position),
}

impl Placement {
    pub fn position(&self) -> Option<&Position> {
        match self {
            Placement::Unplaced => None,
            Placement::PlacedAt(p) => Some(p),
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::PlacedAt(_))
    }
}
