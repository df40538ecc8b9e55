//! Configuration file handling.
//!
//! Shape mirrors the teacher's `client::Config` (read file, deserialize,
//! wrap the error with the path that failed) but the format here is JSON, as
//! specified in `spec.md §6`, rather than the teacher's TOML.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Connection kind for the message bus (`spec.md §6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    /// A Unix domain socket at `path-or-hostname`.
    Unix,
    /// A TCP/IP connection to `path-or-hostname:port`.
    Inet,
}

#[derive(Debug, Clone, Deserialize)]
struct BusConfigRaw {
    #[serde(rename = "type")]
    kind: BusType,
    #[serde(rename = "path-or-hostname")]
    path_or_hostname: String,
    #[serde(default)]
    port: Option<u16>,
}

/// Bus connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Whether to connect over INET or a UNIX-domain socket.
    pub kind: BusType,
    /// Hostname (INET) or filesystem path (UNIX) of the bus endpoint.
    pub path_or_hostname: String,
    /// TCP port, meaningful only when `kind == BusType::Inet`.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigRaw {
    #[serde(rename = "mongodb-uri")]
    mongodb_uri: Option<String>,
    #[serde(rename = "dflat-db-name")]
    dflat_db_name: Option<String>,
    #[serde(rename = "curl.user-agent")]
    user_agent: Option<String>,
    buxtehude: Option<BusConfigRaw>,
    #[serde(rename = "entry-expiry-time-seconds")]
    entry_expiry_time_seconds: Option<u64>,
    #[serde(rename = "max-concurrent-transfers")]
    max_concurrent_transfers: Option<usize>,
}

/// Default cache TTL: 48 hours, per `spec.md §6`.
pub const DEFAULT_ENTRY_EXPIRY_SECONDS: u64 = 172_800;
/// Default HTTP transfer pool size, per `spec.md §4.1`/`§6`.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 32;
const DEFAULT_USER_AGENT: &str = "pricehound/0.1";

/// Parsed, defaulted application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Document-store connection string, if any (e.g. a MongoDB URI).
    pub document_store_uri: Option<String>,
    /// Logical document-store database name, if the backend needs one.
    pub document_store_name: Option<String>,
    /// User-agent string applied to every outgoing HTTP transfer.
    pub user_agent: String,
    /// Message-bus connection settings, if the process should connect to one.
    pub bus: Option<BusConfig>,
    /// Cache entry time-to-live, in seconds.
    pub entry_expiry_seconds: u64,
    /// HTTP transfer pool size.
    pub max_concurrent_transfers: usize,
}

impl Config {
    /// Load and parse a configuration file from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.display().to_string();

        let contents = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        let raw: ConfigRaw =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Invalid {
                path: path_str,
                source,
            })?;

        Ok(Self {
            document_store_uri: raw.mongodb_uri,
            document_store_name: raw.dflat_db_name,
            user_agent: raw.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            bus: raw.buxtehude.map(|b| BusConfig {
                kind: b.kind,
                path_or_hostname: b.path_or_hostname,
                port: b.port,
            }),
            entry_expiry_seconds: raw
                .entry_expiry_time_seconds
                .unwrap_or(DEFAULT_ENTRY_EXPIRY_SECONDS),
            max_concurrent_transfers: raw
                .max_concurrent_transfers
                .unwrap_or(DEFAULT_MAX_CONCURRENT_TRANSFERS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_keys() {
        let dir = std::env::temp_dir();
        let path = dir.join("pricehound-test-config-defaults.json");
        std::fs::write(&path, r#"{}"#).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.entry_expiry_seconds, DEFAULT_ENTRY_EXPIRY_SECONDS);
        assert_eq!(cfg.max_concurrent_transfers, DEFAULT_MAX_CONCURRENT_TRANSFERS);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert!(cfg.bus.is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn parses_full_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("pricehound-test-config-full.json");
        std::fs::write(
            &path,
            r#"{
                "mongodb-uri": "mongodb://localhost:27017",
                "curl.user-agent": "test-agent/1.0",
                "buxtehude": { "type": "inet", "path-or-hostname": "localhost", "port": 1637 },
                "entry-expiry-time-seconds": 60,
                "max-concurrent-transfers": 4
            }"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.document_store_uri.as_deref(), Some("mongodb://localhost:27017"));
        assert_eq!(cfg.user_agent, "test-agent/1.0");
        assert_eq!(cfg.entry_expiry_seconds, 60);
        assert_eq!(cfg.max_concurrent_transfers, 4);
        let bus = cfg.bus.unwrap();
        assert_eq!(bus.kind, BusType::Inet);
        assert_eq!(bus.port, Some(1637));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/path/pricehound.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_json_is_invalid_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("pricehound-test-config-invalid.json");
        std::fs::write(&path, "not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        std::fs::remove_file(&path).ok();
    }
}
