//! Configuration for the proximity TCP server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `PROX_BIND_ADDR`         (default: "0.0.0.0")
//! - `PROX_PORT`              (default: "8080")
//! - `PROX_MAX_CLIENTS`       (default: "1024")
//! - `PROX_GEOHASH_PRECISION` (default: "4", ~39 km x 20 km buckets)
//! - `PROX_QUERY_RADIUS`      (default: "1", the bucket plus its 8 neighbours)
//! - `PROX_EXCLUDE_SELF`      (default: "false")
//! - `PROX_DIRECTORY_FILE`    (default: unset, development directory)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use proximity_core::{QueryOptions, SelfPolicy, MAX_QUERY_RADIUS, POSITION_PRECISION};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Bucket size as a geohash length. Fixed for the process lifetime.
    pub geohash_precision: usize,

    /// Neighbour rings searched by proximity queries.
    pub query_radius: u32,

    /// Leave the requester out of its own nearby list.
    pub exclude_self: bool,

    /// JSON file with tokens and profiles; `None` accepts any token.
    pub directory_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            max_clients: 1024,
            geohash_precision: 4,
            query_radius: 1,
            exclude_self: false,
            directory_file: None,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to [`Config::default`].
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            bind_addr: env::var("PROX_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: read_env_or_default("PROX_PORT", defaults.port)?,
            max_clients: read_env_or_default("PROX_MAX_CLIENTS", defaults.max_clients)?,
            geohash_precision: read_env_or_default(
                "PROX_GEOHASH_PRECISION",
                defaults.geohash_precision,
            )?,
            query_radius: read_env_or_default("PROX_QUERY_RADIUS", defaults.query_radius)?,
            exclude_self: read_env_or_default("PROX_EXCLUDE_SELF", defaults.exclude_self)?,
            directory_file: env::var_os("PROX_DIRECTORY_FILE").map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the index cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.geohash_precision == 0 || self.geohash_precision > POSITION_PRECISION {
            bail!(
                "PROX_GEOHASH_PRECISION must be in 1..={}, got {}",
                POSITION_PRECISION,
                self.geohash_precision
            );
        }
        if self.query_radius > MAX_QUERY_RADIUS {
            bail!(
                "PROX_QUERY_RADIUS must be at most {}, got {}",
                MAX_QUERY_RADIUS,
                self.query_radius
            );
        }
        if self.max_clients == 0 {
            bail!("PROX_MAX_CLIENTS must be positive");
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Query settings handed to the connection registry.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            radius: self.query_radius,
            self_policy: if self.exclude_self {
                SelfPolicy::Exclude
            } else {
                SelfPolicy::Include
            },
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr_string(), "0.0.0.0:8080");
        assert_eq!(config.query_options().self_policy, SelfPolicy::Include);
    }

    #[test]
    fn rejects_bad_precision_and_radius() {
        let config = Config {
            geohash_precision: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            query_radius: 50,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn exclude_self_maps_to_policy() {
        let config = Config {
            exclude_self: true,
            ..Config::default()
        };
        assert_eq!(config.query_options().self_policy, SelfPolicy::Exclude);
    }
}
