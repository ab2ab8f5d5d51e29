//! Connection configuration.
//!
//! A [`ConnectionConfiguration`] describes how to reach one database. It is
//! immutable once built; defaults for missing fields are applied by
//! [`ConnectionConfiguration::resolve`], never at construction.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{DataError, DataResult};

/// Database name used when none is configured.
pub const DEFAULT_NAME: &str = "perfect";
/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 3306;
/// SQLite database name that selects an in-memory database.
pub const SQLITE_MEMORY: &str = ":memory:";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding [`PoolSettings::max_connections`].
pub const MAX_CONNECTIONS_ENV: &str = "DBKIT_MAX_CONNECTIONS";
/// Environment variable overriding [`PoolSettings::connect_timeout_secs`].
pub const CONNECT_TIMEOUT_ENV: &str = "DBKIT_CONNECT_TIMEOUT_SECS";

/// Supported database drivers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// MySQL / MariaDB.
    MySQL,
    /// PostgreSQL.
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// Embedded SQLite; `name` is the database file path.
    SQLite,
}

impl DriverKind {
    /// Returns the URL scheme for this driver.
    pub fn scheme(&self) -> &'static str {
        match self {
            DriverKind::MySQL => "mysql",
            DriverKind::PostgreSQL => "postgres",
            DriverKind::SQLite => "sqlite",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::MySQL => write!(f, "mysql"),
            DriverKind::PostgreSQL => write!(f, "postgresql"),
            DriverKind::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Connection parameters for one database instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfiguration {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "host must be 1-255 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[validate(range(min = 1, message = "port must not be 0"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pass: Option<String>,
    driver_kind: DriverKind,
}

impl ConnectionConfiguration {
    /// Creates a configuration with every optional field unset.
    pub fn new(driver_kind: DriverKind) -> Self {
        Self {
            name: None,
            host: None,
            port: None,
            user: None,
            pass: None,
            driver_kind,
        }
    }

    /// Sets the database name (SQLite: the file path).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the login credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn pass(&self) -> Option<&str> {
        self.pass.as_deref()
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver_kind
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> DataResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DataError::Connection(format!("invalid configuration JSON: {}", e)))
    }

    /// Serializes the configuration to JSON, credentials included.
    pub fn to_json_string(&self) -> DataResult<String> {
        serde_json::to_string(self)
            .map_err(|e| DataError::Connection(format!("configuration not serializable: {}", e)))
    }

    /// Validates the configuration and fills in the defaults.
    ///
    /// Missing `name` becomes `"perfect"`, missing `host` becomes
    /// `"localhost"` and missing `port` becomes `3306`.
    pub fn resolve(&self) -> DataResult<ResolvedConfiguration> {
        self.validate()?;

        Ok(ResolvedConfiguration {
            name: self.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string()),
            host: self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: self.user.clone(),
            pass: self.pass.clone(),
            driver_kind: self.driver_kind,
        })
    }
}

impl fmt::Debug for ConnectionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfiguration")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "***"))
            .field("driver_kind", &self.driver_kind)
            .finish()
    }
}

/// A configuration with every default applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub driver_kind: DriverKind,
}

impl ResolvedConfiguration {
    /// Whether this names an in-memory SQLite database.
    pub fn is_in_memory(&self) -> bool {
        self.driver_kind == DriverKind::SQLite && self.name == SQLITE_MEMORY
    }

    /// Builds the connection URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        match self.driver_kind {
            DriverKind::SQLite if self.is_in_memory() => "sqlite::memory:".to_string(),
            DriverKind::SQLite => format!("sqlite:{}", self.name),
            kind => {
                let auth = match (&self.user, &self.pass) {
                    (Some(user), Some(_)) => format!("{}:***@", user),
                    (Some(user), None) => format!("{}@", user),
                    (None, _) => String::new(),
                };
                format!(
                    "{}://{}{}:{}/{}",
                    kind.scheme(),
                    auth,
                    self.host,
                    self.port,
                    self.name
                )
            }
        }
    }
}

impl fmt::Debug for ResolvedConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfiguration")
            .field("url", &self.redacted_url())
            .field("driver_kind", &self.driver_kind)
            .finish()
    }
}

/// Pool sizing and timeouts handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on pooled connections (SQLite always uses one).
    pub max_connections: u32,
    /// Connect / acquire timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl PoolSettings {
    /// Reads [`MAX_CONNECTIONS_ENV`] and [`CONNECT_TIMEOUT_ENV`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_connections: parse_setting(&lookup, MAX_CONNECTIONS_ENV)
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_connections),
            connect_timeout_secs: parse_setting(&lookup, CONNECT_TIMEOUT_ENV)
                .unwrap_or(defaults.connect_timeout_secs),
        }
    }
}

fn parse_setting<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable pool setting");
            None
        }
    }
}
