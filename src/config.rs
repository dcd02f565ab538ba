//! Configuration management for sqlite-proxy.
//!
//! Handles loading configuration from TOML files: which database the
//! proxy talks to, how the SQLite engine connects, and how statement
//! failures are reported.

use crate::error::{ProxyError, Result};
use crate::proxy::StatementErrorPolicy;
use crate::storage::{Locator, SqliteEngineOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Storage engine configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Proxy behavior configuration.
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Storage engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Database locator: a file path, `sqlite:` URL, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Directory relative database paths are resolved against.
    pub resource_dir: Option<PathBuf>,

    /// Create the database file if it does not exist.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections per database file.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database() -> String {
    "test.db".to_string()
}

fn default_create_if_missing() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_connections() -> u32 {
    1
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            resource_dir: None,
            create_if_missing: default_create_if_missing(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_connections: default_max_connections(),
        }
    }
}

impl StorageConfig {
    /// Builds the locator for the configured database.
    pub fn locator(&self) -> Locator {
        let locator = Locator::new(self.database.clone());
        match &self.resource_dir {
            Some(dir) => locator.with_resource_dir(dir.clone()),
            None => locator,
        }
    }

    /// Builds SQLite engine options from this config.
    pub fn engine_options(&self) -> SqliteEngineOptions {
        SqliteEngineOptions {
            create_if_missing: self.create_if_missing,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            max_connections: self.max_connections,
        }
    }
}

/// Proxy behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProxyConfig {
    /// What to do when the engine rejects a statement.
    #[serde(default)]
    pub on_statement_error: StatementErrorPolicy,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlite-proxy")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ProxyError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ProxyError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
