// src/config.rs

//! Manages server configuration: loading, resolving defaults, and validation.
//! Scoped down from the original config surface to the tunables this server
//! actually has a use for: networking, the number of databases, replication
//! role, and the slow log's admission/retention knobs.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

/// This node's replication role, as configured on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum ReplicationConfig {
    Primary,
    Replica {
        primary_host: String,
        primary_port: u16,
    },
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self::Primary
    }
}

/// Slow query log tunables, named after the `slowlog-log-slower-than` and
/// `slowlog-max-len` directives they're equivalent to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowlogConfig {
    /// Commands taking at least this many microseconds are logged. Negative
    /// disables logging entirely; `0` logs every command.
    #[serde(default = "default_slowlog_log_slower_than")]
    pub log_slower_than: i64,
    /// The maximum number of entries retained; oldest entries are dropped
    /// first once this is exceeded.
    #[serde(default = "default_slowlog_max_len")]
    pub max_len: usize,
}

impl Default for SlowlogConfig {
    fn default() -> Self {
        Self {
            log_slower_than: default_slowlog_log_slower_than(),
            max_len: default_slowlog_max_len(),
        }
    }
}

fn default_slowlog_log_slower_than() -> i64 {
    10_000
}
fn default_slowlog_max_len() -> usize {
    128
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7878
}
fn default_databases() -> usize {
    16
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_replica_read_only() -> bool {
    true
}

/// A raw representation of the config file before validation.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_databases")]
    databases: usize,
    #[serde(default)]
    replication: ReplicationConfig,
    #[serde(default = "default_replica_read_only")]
    replica_read_only: bool,
    #[serde(default)]
    slowlog: SlowlogConfig,
}

/// The final, validated, resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub databases: usize,
    pub replication: ReplicationConfig,
    /// Whether a replica rejects queued writes issued by ordinary clients.
    pub replica_read_only: bool,
    pub slowlog: SlowlogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            databases: default_databases(),
            replication: ReplicationConfig::default(),
            replica_read_only: default_replica_read_only(),
            slowlog: SlowlogConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
    }

    fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(contents).with_context(|| "Failed to parse TOML configuration")?;
        let config = Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            databases: raw.databases,
            replication: raw.replication,
            replica_read_only: raw.replica_read_only,
            slowlog: raw.slowlog,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.databases == 0 {
            return Err(anyhow!("databases cannot be 0"));
        }
        if let ReplicationConfig::Replica { primary_port, .. } = &self.replication
            && *primary_port == 0
        {
            return Err(anyhow!("primary_port cannot be 0"));
        }
        if self.slowlog.max_len == 0 {
            warn!("slowlog.max_len is 0: no entries will ever be retained");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_replica_role() {
        let toml = r#"
            [replication]
            role = "replica"
            primary_host = "10.0.0.1"
            primary_port = 6380
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        match config.replication {
            ReplicationConfig::Replica {
                primary_host,
                primary_port,
            } => {
                assert_eq!(primary_host, "10.0.0.1");
                assert_eq!(primary_port, 6380);
            }
            _ => panic!("expected replica role"),
        }
    }

    #[test]
    fn rejects_zero_port() {
        let toml = "port = 0";
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn rejects_zero_databases() {
        let toml = "databases = 0";
        assert!(Config::from_toml_str(toml).is_err());
    }
}
