//! proximity-core
//!
//! Pure proximity logic:
//! - geohash encoding and neighbourhoods
//! - validated positions and connection placement
//! - geohash-bucketed region index
//! - registry of live connections

pub mod geohash;
pub mod position;
pub mod connection;
pub mod region_index;
pub mod registry;
pub mod error;

pub use crate::geohash::GeoHash;
pub use position::{Placement, Position, POSITION_PRECISION};

pub use connection::{ActiveConnection, ConnectionId, Profile, UserId};
pub use region_index::{RegionIndex, Relocation, MAX_QUERY_RADIUS};
pub use registry::{ConnectionRegistry, LocationUpdate, NearbyUsers, QueryOptions, SelfPolicy};
pub use error::CoreError;
