//! Connection and pool configuration, loadable with serde.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::SqlContractDbError;

static URL_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(://[^:/@]+:)[^@]*@").expect("url password pattern is valid")
});

static KV_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(password\s*=\s*)(?:'[^']*'|\S+)").expect("password pattern is valid")
});

/// Where a database lives: a connection string or discrete parameters.
///
/// ```rust
/// use sql_contract::prelude::*;
///
/// let from_url: ConnectionConfig = "postgres://app:secret@db:5432/shop".parse()?;
/// assert_eq!(from_url.label(), "postgres://app:***@db:5432/shop");
///
/// let from_json: ConnectionConfig = serde_json::from_str(
///     r#"{"host":"db","database":"shop","user":"app"}"#,
/// ).map_err(|e| SqlContractDbError::ConfigError(e.to_string()))?;
/// assert_eq!(from_json.label(), "app@db:5432/shop");
/// # Ok::<(), SqlContractDbError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConnectionConfig {
    /// `postgres://` URL or `key=value` connection string.
    Url(String),
    Params(ConnectionParams),
}

impl ConnectionConfig {
    /// Human-readable name for logs and events, with any password masked.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            ConnectionConfig::Url(url) => {
                let masked = URL_PASSWORD.replace(url, "${1}***@");
                KV_PASSWORD.replace_all(&masked, "${1}***").into_owned()
            }
            ConnectionConfig::Params(params) => params.to_string(),
        }
    }

    /// Check the fields a connection cannot do without.
    ///
    /// # Errors
    /// Returns `SqlContractDbError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlContractDbError> {
        match self {
            ConnectionConfig::Url(url) if url.trim().is_empty() => Err(
                SqlContractDbError::ConfigError("connection string is empty".to_string()),
            ),
            ConnectionConfig::Url(_) => Ok(()),
            ConnectionConfig::Params(params) => params.validate(),
        }
    }
}

impl FromStr for ConnectionConfig {
    type Err = SqlContractDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config = ConnectionConfig::Url(s.trim().to_string());
        config.validate()?;
        Ok(config)
    }
}

impl From<ConnectionParams> for ConnectionConfig {
    fn from(params: ConnectionParams) -> Self {
        ConnectionConfig::Params(params)
    }
}

fn default_port() -> u16 {
    5432
}

/// Discrete connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(alias = "dbname")]
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub application_name: Option<String>,
}

impl ConnectionParams {
    #[must_use]
    pub fn new(host: &str, database: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            port: default_port(),
            database: database.to_string(),
            user: user.to_string(),
            password: None,
            application_name: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    #[must_use]
    pub fn with_application_name(mut self, name: &str) -> Self {
        self.application_name = Some(name.to_string());
        self
    }

    /// # Errors
    /// Returns `SqlContractDbError::ConfigError` when host, database or user is blank.
    pub fn validate(&self) -> Result<(), SqlContractDbError> {
        if self.database.trim().is_empty() {
            return Err(SqlContractDbError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(SqlContractDbError::ConfigError(
                "host is required".to_string(),
            ));
        }
        if self.user.trim().is_empty() {
            return Err(SqlContractDbError::ConfigError(
                "user is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// What a lease does when every pooled connection is checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PoolExhaustion {
    /// Wait until a connection is returned.
    #[default]
    Queue,
    /// Wait up to `wait_ms`, then fail with a pool error.
    Timeout { wait_ms: u64 },
    /// Fail immediately.
    FailFast,
}

impl PoolExhaustion {
    /// The pool's wait timeout; `None` waits forever.
    #[must_use]
    pub fn wait_timeout(self) -> Option<Duration> {
        match self {
            PoolExhaustion::Queue => None,
            PoolExhaustion::Timeout { wait_ms } => Some(Duration::from_millis(wait_ms)),
            PoolExhaustion::FailFast => Some(Duration::ZERO),
        }
    }
}

fn default_max_size() -> usize {
    10
}

/// Pool sizing and exhaustion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PoolOptions {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default)]
    pub exhaustion: PoolExhaustion,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            exhaustion: PoolExhaustion::default(),
        }
    }
}

impl PoolOptions {
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_exhaustion(mut self, exhaustion: PoolExhaustion) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// # Errors
    /// Returns `SqlContractDbError::ConfigError` for a zero-sized pool.
    pub fn validate(&self) -> Result<(), SqlContractDbError> {
        if self.max_size == 0 {
            return Err(SqlContractDbError::ConfigError(
                "max_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_hide_passwords() {
        let url = ConnectionConfig::Url("postgres://u:p%40ss@h/db".into());
        assert_eq!(url.label(), "postgres://u:***@h/db");
        let kv = ConnectionConfig::Url("host=h user=u password='x y' dbname=d".into());
        assert_eq!(kv.label(), "host=h user=u password=*** dbname=d");
        let params = ConnectionParams::new("h", "d", "u").with_password("secret");
        assert_eq!(ConnectionConfig::from(params).label(), "u@h:5432/d");
    }

    #[test]
    fn params_require_host_database_user() {
        let missing_user = ConnectionParams::new("h", "d", " ");
        assert!(matches!(
            missing_user.validate(),
            Err(SqlContractDbError::ConfigError(ref msg)) if msg == "user is required"
        ));
        assert!(ConnectionParams::new("h", "d", "u").validate().is_ok());
        assert!("  ".parse::<ConnectionConfig>().is_err());
    }

    #[test]
    fn deserializes_both_forms() {
        let url: Result<ConnectionConfig, _> = serde_json::from_str(r#""postgres://h/db""#);
        assert!(matches!(url, Ok(ConnectionConfig::Url(_))));

        let params: Result<ConnectionConfig, _> =
            serde_json::from_str(r#"{"host":"h","port":6543,"dbname":"d","user":"u"}"#);
        match params {
            Ok(ConnectionConfig::Params(p)) => {
                assert_eq!(p.port, 6543);
                assert_eq!(p.database, "d");
                assert_eq!(p.password, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pool_options_from_json() {
        let opts: PoolOptions =
            serde_json::from_str(r#"{"max_size":4,"exhaustion":{"policy":"timeout","wait_ms":250}}"#)
                .unwrap_or_default();
        assert_eq!(opts.max_size, 4);
        assert_eq!(
            opts.exhaustion.wait_timeout(),
            Some(Duration::from_millis(250))
        );

        let defaults: PoolOptions = serde_json::from_str("{}").unwrap_or_else(|_| PoolOptions {
            max_size: 0,
            exhaustion: PoolExhaustion::FailFast,
        });
        assert_eq!(defaults, PoolOptions::default());
        assert_eq!(PoolExhaustion::FailFast.wait_timeout(), Some(Duration::ZERO));
        assert!(PoolOptions::default().with_max_size(0).validate().is_err());
    }
}
