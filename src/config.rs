use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AuthzError, AuthzResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_AUDIT_CAPACITY: usize = 1024;

/// Settings that change how principals are resolved and how grant changes are audited.
#[derive(Debug, Clone)]
pub struct RightsConfig {
    /// When false, every link-share context is rejected as unauthenticated.
    pub link_sharing_enabled: bool,
    pub audit_channel_capacity: usize,
}

impl Default for RightsConfig {
    fn default() -> Self {
        Self {
            link_sharing_enabled: true,
            audit_channel_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

impl RightsConfig {
    pub fn from_env() -> AuthzResult<Self> {
        Ok(Self {
            link_sharing_enabled: env_or("LINK_SHARING_ENABLED", true)?,
            audit_channel_capacity: env_or("AUDIT_CHANNEL_CAPACITY", DEFAULT_AUDIT_CAPACITY)?,
        })
    }

    pub fn with_link_sharing(mut self, enabled: bool) -> Self {
        self.link_sharing_enabled = enabled;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> AuthzResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AuthzError::configuration("DATABASE_URL not set"))?;
        let max_connections = env_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let timeout_secs = env_or("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS)?;

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
/// A value that is set but does not parse is a configuration error, not a fallback.
fn env_or<T: FromStr>(key: &str, default: T) -> AuthzResult<T> {
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AuthzResult<T> {
    let raw = raw.trim();
    // Accept the usual spellings for booleans
    let normalized = match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "on" => "true".to_string(),
        "0" | "no" | "off" => "false".to_string(),
        other => other.to_string(),
    };

    normalized
        .parse::<T>()
        .or_else(|_| raw.parse::<T>())
        .map_err(|_| AuthzError::configuration(format!("{key} has an invalid value: {raw}")))
}
