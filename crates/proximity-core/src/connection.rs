//! Active connection records and their identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::Placement;

/// Identifier for a single connection attempt.
///
/// Opaque; the transport layer hands out a fresh one per accepted socket
/// and never reuses it for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Authenticated user identity (the uid handed back by the identity
/// provider). One user may hold several connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Public profile shown to nearby users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub profile_picture: String,
}

impl Profile {
    pub fn new(display_name: impl Into<String>, profile_picture: impl Into<String>) -> Self {
        Profile {
            display_name: display_name.into(),
            profile_picture: profile_picture.into(),
        }
    }
}

/// One live connection.
///
/// `C` is the transport's outbound handle. The registry stores it so
/// handlers can push messages to the client; the index never looks at it.
#[derive(Debug, Clone)]
pub struct ActiveConnection<C> {
    id: ConnectionId,
    user: UserId,
    profile: Profile,
    pub(crate) placement: Placement,
    channel: C,
}

impl<C> ActiveConnection<C> {
    /// New, unplaced connection.
    pub fn new(id: ConnectionId, user: UserId, profile: Profile, channel: C) -> Self {
        ActiveConnection {
            id,
            user,
            profile,
            placement: Placement::Unplaced,
            channel,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub(crate) fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
    }
}
