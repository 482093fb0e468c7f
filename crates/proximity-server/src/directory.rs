//! User directory: token verification and profile lookup.
//!
//! The identity provider and profile store live outside this server;
//! [`UserDirectory`] is the seam. Two implementations ship here:
//!
//! - [`StaticDirectory`]: tokens and profiles loaded from a JSON file,
//! - [`DevDirectory`]: accepts any non-empty token as the uid.
//!
//! File format:
//!
//! ```json
//! {
//!   "tokens":   { "secret-a": "uid-a" },
//!   "profiles": { "uid-a": { "displayName": "Ann", "profilePicture": "ann.png" } }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use proximity_core::{Profile, UserId};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing auth token")]
    MissingToken,

    #[error("auth token rejected")]
    InvalidToken,
}

/// Identity + profile lookups needed by the handshake and
/// `notifyUpdateProfile`.
pub trait UserDirectory: Send + Sync {
    /// Map a client token to a uid.
    fn authorize(&self, token: &str) -> Result<UserId, AuthError>;

    /// Current profile for `user`, or `None` if it was never created.
    fn profile(&self, user: &UserId) -> Option<Profile>;
}

/// Shared handle used by client tasks and the hub.
pub type SharedDirectory = Arc<dyn UserDirectory>;

/// Directory backed by a fixed token/profile table.
#[derive(Debug, Default, Deserialize)]
pub struct StaticDirectory {
    #[serde(default)]
    tokens: HashMap<String, UserId>,
    #[serde(default)]
    profiles: HashMap<UserId, Profile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        StaticDirectory::default()
    }

    /// Load a directory from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading directory file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing directory file {}", path.display()))
    }

    /// Register a token for `user`.
    pub fn with_token(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    /// Register (or replace) the profile for `user`.
    pub fn with_profile(mut self, user: UserId, profile: Profile) -> Self {
        self.profiles.insert(user, profile);
        self
    }
}

impl UserDirectory for StaticDirectory {
    fn authorize(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    fn profile(&self, user: &UserId) -> Option<Profile> {
        self.profiles.get(user).cloned()
    }
}

/// Development directory: the token *is* the uid, and every user has a
/// profile named after it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevDirectory;

impl UserDirectory for DevDirectory {
    fn authorize(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(UserId(token.to_string()))
    }

    fn profile(&self, user: &UserId) -> Option<Profile> {
        Some(Profile::new(user.as_str(), ""))
    }
}

/// Build the directory selected by the configuration.
pub fn load(path: Option<&Path>) -> Result<SharedDirectory> {
    match path {
        Some(path) => Ok(Arc::new(StaticDirectory::from_file(path)?)),
        None => Ok(Arc::new(DevDirectory)),
    }
}
