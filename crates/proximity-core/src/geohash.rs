//! Geohash encoding and neighbourhood enumeration.
//!
//! A geohash interleaves longitude and latitude bisection bits (longitude
//! first) and packs them five at a time into a base32 alphabet. Points
//! that are close together usually share a long common prefix, so a
//! fixed-length prefix makes a convenient spatial bucket key.
//!
//! Cell sizes at the equator:
//!
//! ```text
//! len  width      height
//!  1   5000 km    5000 km
//!  2   1250 km     625 km
//!  3    156 km     156 km
//!  4     39 km      19.5 km
//!  5      4.9 km     4.9 km
//!  6      1.2 km     0.61 km
//! ```

use std::collections::HashSet;
use std::fmt;

use ::geohash::{Coord, Neighbors};

use crate::error::CoreError;

/// Longest geohash this crate will produce.
pub const MAX_PRECISION: usize = 12;

/// A geohash string.
///
/// Values are only produced by [`encode`] (or by taking a prefix of an
/// existing hash), so every `GeoHash` is a valid, non-empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoHash(String);

/// Latitude/longitude bounds of a geohash cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl CellBounds {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Rows and columns of cells this size needed to tile the globe.
    fn grid_size(&self) -> (i64, i64) {
        (
            (180.0 / self.height()).ceil() as i64,
            (360.0 / self.width()).ceil() as i64,
        )
    }
}

/// Encode `(lat, lon)` into a geohash of `precision` characters.
///
/// `precision` is clamped to `1..=MAX_PRECISION`. Out-of-range or
/// non-finite degrees are rejected.
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<GeoHash, CoreError> {
    let precision = precision.clamp(1, MAX_PRECISION);
    ::geohash::encode(Coord { x: lon, y: lat }, precision)
        .map(GeoHash)
        .map_err(|_| CoreError::InvalidCoordinates { lat, lon })
}

impl GeoHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters (the precision of this cell).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept alongside `len` for clippy.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The enclosing cell at `precision` characters.
    ///
    /// Returns a clone of `self` if `precision` is not shorter than the
    /// hash, and never produces an empty hash.
    pub fn prefix(&self, precision: usize) -> GeoHash {
        let n = precision.clamp(1, self.0.len());
        GeoHash(self.0[..n].to_string())
    }

    /// Decode this cell into its lat/lon bounds.
    pub fn bounds(&self) -> Result<CellBounds, CoreError> {
        let rect = ::geohash::decode_bbox(&self.0)?;
        Ok(CellBounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        })
    }

    /// This cell plus every cell within `radius` steps of it, at the
    /// same precision.
    ///
    /// `radius = 1` gives the cell and its 8 neighbours. Rows that would
    /// fall past a pole are skipped, so polar cells have fewer
    /// neighbours; columns wrap around the antimeridian. The centre cell
    /// is always first and the result holds no duplicates.
    ///
    /// A radius wider than the globe is cut down to the grid size, so
    /// the result never holds more cells than exist at this precision.
    pub fn neighbourhood(&self, radius: u32) -> Vec<GeoHash> {
        if radius == 1 {
            // Fails near the poles and the antimeridian; the ring walk
            // below handles both.
            if let Ok(ring) = ::geohash::neighbors(&self.0) {
                return self.with_ring(ring);
            }
        }
        self.walk_rings(radius)
    }

    fn with_ring(&self, ring: Neighbors) -> Vec<GeoHash> {
        let Neighbors {
            n,
            ne,
            e,
            se,
            s,
            sw,
            w,
            nw,
        } = ring;

        let mut seen = HashSet::new();
        seen.insert(self.clone());
        let mut cells = vec![self.clone()];
        for cell in [n, ne, e, se, s, sw, w, nw].map(GeoHash) {
            if seen.insert(cell.clone()) {
                cells.push(cell);
            }
        }
        cells
    }

    fn walk_rings(&self, radius: u32) -> Vec<GeoHash> {
        let Ok(bounds) = self.bounds() else {
            return vec![self.clone()];
        };
        let (center_lat, center_lon) = bounds.center();
        let (dlat, dlon) = (bounds.height(), bounds.width());
        let (rows, cols) = bounds.grid_size();
        let r_lat = i64::from(radius).min(rows);
        let r_lon = i64::from(radius).min(cols);

        let mut seen = HashSet::new();
        let mut cells = Vec::new();

        seen.insert(self.clone());
        cells.push(self.clone());

        for dy in -r_lat..=r_lat {
            let lat = center_lat + dy as f64 * dlat;
            if !(-90.0..=90.0).contains(&lat) {
                continue;
            }
            for dx in -r_lon..=r_lon {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let lon = wrap_longitude(center_lon + dx as f64 * dlon);
                let Ok(cell) = encode(lat, lon, self.len()) else {
                    continue;
                };
                if seen.insert(cell.clone()) {
                    cells.push(cell);
                }
            }
        }

        cells
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map any longitude into `[-180, 180)`.
fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
