//! Command-line argument parsing for sqlite-proxy.
//!
//! Uses clap to parse the statement to run and overrides for the
//! configuration file.

use clap::Parser;
use sqlite_proxy::config::{Config, StorageConfig};
use sqlite_proxy::proxy::{Method, StatementErrorPolicy};
use sqlite_proxy::storage::Value;
use std::path::PathBuf;

/// Run one query-builder statement against a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "sqlite-proxy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL text to run
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Positional parameter; parsed as JSON, or taken as text if it is not JSON
    #[arg(short = 'p', long = "param", value_name = "VALUE", value_parser = parse_param)]
    pub params: Vec<Value>,

    /// Query-builder method tag: run, all, get, or values
    #[arg(short = 'm', long, value_name = "METHOD", default_value = "all")]
    pub method: Method,

    /// Database locator (file path, sqlite: URL, or :memory:)
    #[arg(short = 'd', long, value_name = "LOCATOR", env = "SQLITE_PROXY_DATABASE")]
    pub database: Option<String>,

    /// Directory relative database paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub resource_dir: Option<PathBuf>,

    /// Fail instead of creating a missing database file
    #[arg(long)]
    pub no_create: bool,

    /// Report statement failures instead of returning empty rows
    #[arg(long)]
    pub propagate_errors: bool,

    /// Print the engine's keyed rows without classification or normalization
    #[arg(long)]
    pub raw: bool,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Parses a `--param` value.
fn parse_param(s: &str) -> std::result::Result<Value, String> {
    match serde_json::from_str::<Value>(s) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::Text(s.to_string())),
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies CLI overrides on top of the file's storage config.
    pub fn storage_config(&self, config: &Config) -> StorageConfig {
        let mut storage = config.storage.clone();
        if let Some(database) = &self.database {
            storage.database = database.clone();
        }
        if let Some(dir) = &self.resource_dir {
            storage.resource_dir = Some(dir.clone());
        }
        if self.no_create {
            storage.create_if_missing = false;
        }
        storage
    }

    /// Returns the statement failure policy, CLI flag first.
    pub fn policy(&self, config: &Config) -> StatementErrorPolicy {
        if self.propagate_errors {
            StatementErrorPolicy::Propagate
        } else {
            config.proxy.on_statement_error
        }
    }
}
