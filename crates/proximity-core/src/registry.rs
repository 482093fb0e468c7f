//! Registry of live connections.
//!
//! The registry owns every [`ActiveConnection`] record and is the only
//! thing that talks to the [`RegionIndex`], so bucket membership always
//! matches each record's placement:
//!
//! ```text
//! admit ──► Unplaced ──report_location──► Placed ──report_location──► Placed
//!              │                             │
//!              └────────────evict────────────┴──► gone
//! ```
//!
//! Unknown ids are tolerated on `report_location` and `evict`: duplicate
//! disconnect events are expected and must not be fatal.

use std::collections::{BTreeMap, HashMap};

use crate::connection::{ActiveConnection, ConnectionId, Profile, UserId};
use crate::error::CoreError;
use crate::position::Position;
use crate::region_index::{RegionIndex, Relocation, MAX_QUERY_RADIUS};

/// Result of a proximity query as handed to clients: uid -> profile.
pub type NearbyUsers = BTreeMap<UserId, Profile>;

/// Whether the requester shows up in its own proximity results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfPolicy {
    /// Requester is listed like anyone else.
    #[default]
    Include,

    /// Every connection of the requesting user is left out.
    Exclude,
}

/// Query tuning for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Neighbour rings searched around the query cell (1 = 3x3 cells).
    pub radius: u32,
    pub self_policy: SelfPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            radius: 1,
            self_policy: SelfPolicy::Include,
        }
    }
}

/// Outcome of [`ConnectionRegistry::report_location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationUpdate {
    Relocated(Relocation),

    /// The id is not live (already evicted, or never admitted).
    UnknownConnection,
}

/// Live connection records plus the region index that locates them.
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    index: RegionIndex,
    connections: HashMap<ConnectionId, ActiveConnection<C>>,
    options: QueryOptions,
}

impl<C> ConnectionRegistry<C> {
    /// Build a registry around an (empty) index.
    ///
    /// Fails if `options.radius` is above [`MAX_QUERY_RADIUS`].
    pub fn new(index: RegionIndex, options: QueryOptions) -> Result<Self, CoreError> {
        if options.radius > MAX_QUERY_RADIUS {
            return Err(CoreError::InvalidRadius(options.radius));
        }
        Ok(ConnectionRegistry {
            index,
            connections: HashMap::new(),
            options,
        })
    }

    /// Add a freshly authorised connection. It is not placed until its
    /// first location report.
    pub fn admit(
        &mut self,
        id: ConnectionId,
        user: UserId,
        profile: Profile,
        channel: C,
    ) -> Result<(), CoreError> {
        if self.connections.contains_key(&id) {
            return Err(CoreError::DuplicateConnection(id));
        }

        self.connections
            .insert(id, ActiveConnection::new(id, user, profile, channel));
        Ok(())
    }

    /// Validate `(lat, lon)` and move the connection's bucket accordingly.
    ///
    /// Invalid coordinates are rejected before anything is touched.
    pub fn report_location(
        &mut self,
        id: ConnectionId,
        lat: f64,
        lon: f64,
    ) -> Result<LocationUpdate, CoreError> {
        let position = Position::new(lat, lon)?;

        let Some(conn) = self.connections.get_mut(&id) else {
            return Ok(LocationUpdate::UnknownConnection);
        };

        Ok(LocationUpdate::Relocated(self.index.place(conn, position)))
    }

    /// Users near `position`, keyed by uid.
    ///
    /// `requester` only matters under [`SelfPolicy::Exclude`].
    pub fn query_nearby(&self, position: &Position, requester: Option<ConnectionId>) -> NearbyUsers {
        let excluded = match self.options.self_policy {
            SelfPolicy::Include => None,
            SelfPolicy::Exclude => requester
                .and_then(|id| self.connections.get(&id))
                .map(|conn| conn.user()),
        };

        let mut nearby = NearbyUsers::new();
        for conn in self.connections_near(position) {
            if Some(conn.user()) == excluded {
                continue;
            }
            nearby.insert(conn.user().clone(), conn.profile().clone());
        }
        nearby
    }

    /// Users near the connection's own last position.
    ///
    /// Empty for unknown or still unplaced connections.
    pub fn query_nearby_of(&self, id: ConnectionId) -> NearbyUsers {
        match self.position_of(id) {
            Some(position) => self.query_nearby(position, Some(id)),
            None => NearbyUsers::new(),
        }
    }

    /// Other connections in the neighbourhood of `id`, for relaying
    /// messages. The sender itself is always left out.
    pub fn neighbours_of(&self, id: ConnectionId) -> Vec<&ActiveConnection<C>> {
        let Some(position) = self.position_of(id) else {
            return Vec::new();
        };

        self.connections_near(position)
            .filter(|conn| conn.id() != id)
            .collect()
    }

    /// Remove the connection from its bucket, then drop the record.
    ///
    /// Returns the record if it was live.
    pub fn evict(&mut self, id: ConnectionId) -> Option<ActiveConnection<C>> {
        if let Some(conn) = self.connections.get_mut(&id) {
            self.index.remove(conn);
        }
        self.connections.remove(&id)
    }

    /// Replace the cached profile. Returns `false` for unknown ids.
    pub fn refresh_profile(&mut self, id: ConnectionId, profile: Profile) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) => {
                conn.set_profile(profile);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ActiveConnection<C>> {
        self.connections.get(&id)
    }

    pub fn index(&self) -> &RegionIndex {
        &self.index
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Number of live connections (placed or not).
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn position_of(&self, id: ConnectionId) -> Option<&Position> {
        self.connections.get(&id)?.placement().position()
    }

    fn connections_near<'a>(
        &'a self,
        position: &Position,
    ) -> impl Iterator<Item = &'a ActiveConnection<C>> + 'a {
        self.index
            .query(position, self.options.radius)
            .filter_map(move |id| self.connections.get(&id))
    }
}
