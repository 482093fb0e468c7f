//! Geohash-bucketed index of placed connections.
//!
//! Each bucket is a geohash prefix of fixed length (the index
//! precision) and holds the ids of every connection whose last position
//! falls inside that cell. A proximity query looks at the query cell
//! plus a ring of neighbouring cells, which keeps lookups independent of
//! the total population.
//!
//! Two points a few metres apart can still land in non-adjacent cells
//! when they straddle a boundary at a coarse radius; that is the usual
//! fixed-precision geohash trade-off and is accepted here.
//!
//! The index stores ids only. Connection records are owned by the
//! [`ConnectionRegistry`](crate::registry::ConnectionRegistry).

use std::collections::{HashMap, HashSet};

use crate::connection::{ActiveConnection, ConnectionId};
use crate::error::CoreError;
use crate::geohash::GeoHash;
use crate::position::{Placement, Position, POSITION_PRECISION};

/// Widest neighbourhood a query will search, in rings around the
/// query cell.
pub const MAX_QUERY_RADIUS: u32 = 8;

/// What a call to [`RegionIndex::place`] did to bucket membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// First placement of an unplaced connection.
    Placed { bucket: GeoHash },

    /// Moved between buckets.
    Moved { from: GeoHash, to: GeoHash },

    /// New position is in the same bucket; membership untouched.
    Unchanged { bucket: GeoHash },
}

impl Relocation {
    /// Bucket the connection is in after the call.
    pub fn bucket(&self) -> &GeoHash {
        match self {
            Relocation::Placed { bucket } | Relocation::Unchanged { bucket } => bucket,
            Relocation::Moved { to, .. } => to,
        }
    }
}

/// Spatial index: bucket prefix -> connection ids.
#[derive(Debug)]
pub struct RegionIndex {
    precision: usize,
    buckets: HashMap<GeoHash, HashSet<ConnectionId>>,
}

impl RegionIndex {
    /// Create an empty index with buckets of `precision` geohash characters.
    ///
    /// The precision is fixed for the life of the index.
    pub fn new(precision: usize) -> Result<Self, CoreError> {
        if precision == 0 || precision > POSITION_PRECISION {
            return Err(CoreError::InvalidPrecision(precision));
        }

        Ok(RegionIndex {
            precision,
            buckets: HashMap::new(),
        })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Bucket key for a position at this index's precision.
    pub fn bucket_of(&self, position: &Position) -> GeoHash {
        position.geohash().prefix(self.precision)
    }

    /// Move `conn` to the bucket of `position` and store the position.
    ///
    /// Small moves inside one bucket leave membership alone.
    pub fn place<C>(&mut self, conn: &mut ActiveConnection<C>, position: Position) -> Relocation {
        let new_bucket = self.bucket_of(&position);
        let old_bucket = conn.placement.position().map(|p| self.bucket_of(p));

        let relocation = match old_bucket {
            Some(old) if old == new_bucket => Relocation::Unchanged { bucket: new_bucket },
            Some(old) => {
                self.detach(&old, conn.id());
                self.attach(new_bucket.clone(), conn.id());
                Relocation::Moved {
                    from: old,
                    to: new_bucket,
                }
            }
            None => {
                self.attach(new_bucket.clone(), conn.id());
                Relocation::Placed { bucket: new_bucket }
            }
        };

        conn.placement = Placement::PlacedAt(position);
        relocation
    }

    /// Take `conn` out of its bucket and mark it unplaced.
    ///
    /// Returns `false` if it was not placed. Calling it again is a no-op.
    pub fn remove<C>(&mut self, conn: &mut ActiveConnection<C>) -> bool {
        let placement = std::mem::take(&mut conn.placement);
        match placement.position() {
            Some(position) => {
                let bucket = self.bucket_of(position);
                self.detach(&bucket, conn.id())
            }
            None => false,
        }
    }

    /// Ids of every connection in the bucket of `position` and in the
    /// buckets within `radius` cells of it.
    ///
    /// The result is computed lazily from current membership on every
    /// call; nothing is cached. The requester is not filtered out.
    /// `radius` is capped at [`MAX_QUERY_RADIUS`].
    pub fn query(&self, position: &Position, radius: u32) -> impl Iterator<Item = ConnectionId> + '_ {
        self.bucket_of(position)
            .neighbourhood(radius.min(MAX_QUERY_RADIUS))
            .into_iter()
            .filter_map(move |cell| self.buckets.get(&cell))
            .flat_map(|members| members.iter().copied())
    }

    /// Ids in exactly one bucket.
    pub fn members(&self, bucket: &GeoHash) -> impl Iterator<Item = ConnectionId> + '_ {
        self.buckets
            .get(bucket)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    /// Every bucket that currently holds `id`.
    ///
    /// Used to check the one-bucket-per-connection invariant; this scans
    /// all buckets.
    pub fn buckets_containing(&self, id: ConnectionId) -> Vec<&GeoHash> {
        self.buckets
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(bucket, _)| bucket)
            .collect()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of placed connections.
    pub fn len(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn attach(&mut self, bucket: GeoHash, id: ConnectionId) {
        self.buckets.entry(bucket).or_default().insert(id);
    }

    /// Remove `id` from `bucket`, dropping the bucket once empty.
    fn detach(&mut self, bucket: &GeoHash, id: ConnectionId) -> bool {
        let Some(members) = self.buckets.get_mut(bucket) else {
            return false;
        };

        let removed = members.remove(&id);
        if members.is_empty() {
            self.buckets.remove(bucket);
        }
        removed
    }
}
