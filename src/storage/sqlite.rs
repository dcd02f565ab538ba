//! SQLite storage engine implementation.
//!
//! Provides `SqliteEngine`, which implements `StorageEngine` on top of sqlx.
//! Pools are an internal detail: each locator gets one lazily created pool,
//! and every acquired handle is just a cheap clone of it.

use crate::error::{ProxyError, Result};
use crate::storage::locator::Target;
use crate::storage::{Locator, RawRow, StorageEngine, StorageHandle, Value, WriteOutcome};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Time to wait for a pooled connection before giving up.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Connection settings applied to every pool the engine opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteEngineOptions {
    /// Create the database file when it does not exist.
    pub create_if_missing: bool,

    /// How long SQLite waits on a locked database before failing a statement.
    pub busy_timeout: Duration,

    /// Maximum connections per database file.
    pub max_connections: u32,
}

impl Default for SqliteEngineOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            busy_timeout: Duration::from_secs(5),
            max_connections: 1,
        }
    }
}

type PoolCell = Arc<OnceCell<SqlitePool>>;

/// SQLite engine backed by per-locator sqlx pools.
#[derive(Debug, Default)]
pub struct SqliteEngine {
    options: SqliteEngineOptions,
    pools: Mutex<HashMap<Target, PoolCell>>,
}

impl SqliteEngine {
    /// Creates an engine with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given options.
    pub fn with_options(options: SqliteEngineOptions) -> Self {
        Self {
            options,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Closes every pool the engine has opened.
    ///
    /// Later acquisitions reconnect.
    pub async fn close(&self) {
        let cells: Vec<PoolCell> = self.pools.lock().await.drain().map(|(_, c)| c).collect();
        for cell in cells {
            if let Some(pool) = cell.get() {
                pool.close().await;
            }
        }
    }

    /// Returns the pool for `locator`, connecting on first use.
    ///
    /// The registry lock only covers the map lookup. Concurrent acquisitions
    /// of one locator wait on that locator's cell, so they share a single
    /// pool without blocking other locators.
    async fn pool_for(&self, locator: &Locator) -> Result<SqlitePool> {
        let target = locator.target()?;

        if let Target::File { path, .. } = &target {
            // A pool opened before the file was removed still points at the unlinked file
            if !path.exists() {
                self.evict(&target).await;
            }
        }

        let cell = self.cell_for(&target).await;
        let pool = cell
            .get_or_try_init(|| self.connect(locator, &target))
            .await?;
        if !pool.is_closed() {
            return Ok(pool.clone());
        }

        self.evict(&target).await;
        let cell = self.cell_for(&target).await;
        let pool = cell
            .get_or_try_init(|| self.connect(locator, &target))
            .await?;
        Ok(pool.clone())
    }

    async fn cell_for(&self, target: &Target) -> PoolCell {
        let mut pools = self.pools.lock().await;
        Arc::clone(pools.entry(target.clone()).or_default())
    }

    /// Drops the cached pool for `target`, closing it if it was open.
    async fn evict(&self, target: &Target) {
        let cell = self.pools.lock().await.remove(target);
        if let Some(pool) = cell.as_ref().and_then(|c| c.get()) {
            debug!("Closing cached pool for {:?}", target);
            pool.close().await;
        }
    }

    async fn connect(&self, locator: &Locator, target: &Target) -> Result<SqlitePool> {
        let invalid = |e: sqlx::Error| {
            ProxyError::storage_unavailable(format!("Invalid database locator {locator}: {e}"))
        };

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS));

        let options = match target {
            Target::Memory => {
                // Each connection to :memory: is a separate database, so keep exactly one alive
                pool_options = pool_options
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None);
                SqliteConnectOptions::from_str("sqlite::memory:").map_err(invalid)?
            }
            Target::File { path, options } => {
                let base = match options {
                    Some(query) => {
                        SqliteConnectOptions::from_str(&format!("sqlite://?{query}"))
                            .map_err(invalid)?
                    }
                    None => SqliteConnectOptions::new(),
                };
                let mut file_options = base.filename(path);

                if !target.is_read_only() {
                    if self.options.create_if_missing {
                        ensure_parent_dirs(path)?;
                    }
                    file_options = file_options
                        .create_if_missing(self.options.create_if_missing)
                        .journal_mode(SqliteJournalMode::Wal);
                }
                pool_options = pool_options.max_connections(self.options.max_connections.max(1));
                file_options
            }
        }
        .busy_timeout(self.options.busy_timeout);

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            warn!("Failed to open {}: {}", locator, e);
            ProxyError::storage_unavailable(format!("Cannot open database {locator}: {e}"))
        })?;
        info!("Opened SQLite database {}", locator);
        Ok(pool)
    }
}

#[async_trait]
impl StorageEngine for SqliteEngine {
    async fn acquire(&self, locator: &Locator) -> Result<Box<dyn StorageHandle>> {
        let pool = self.pool_for(locator).await?;
        Ok(Box::new(SqliteHandle { pool }))
    }
}

/// Handle onto one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteHandle {
    pool: SqlitePool,
}

#[async_trait]
impl StorageHandle for SqliteHandle {
    async fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(engine_error)?;

        Ok(rows.iter().map(convert_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<WriteOutcome> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(engine_error)?;

        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
        })
    }
}

/// Binds parameters positionally, in the order the query builder emitted them.
fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Converts a sqlx SqliteRow to a keyed row, in the statement's column order.
fn convert_row(row: &SqliteRow) -> RawRow {
    let mut raw = RawRow::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        raw.push(col.name(), convert_value(row, i));
    }
    raw
}

/// Converts a single column value using its runtime storage class.
///
/// SQLite is dynamically typed, so the value's own type is used rather
/// than the declared column type.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // TEXT, and anything else SQLite can render as text
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Creates the database file's parent directories.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ProxyError::storage_unavailable(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Maps a sqlx error from a handle operation onto the proxy's error kinds.
///
/// Losing the connection is a storage failure; everything else is the
/// engine rejecting the statement.
fn engine_error(error: sqlx::Error) -> ProxyError {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => {
            ProxyError::storage_unavailable(format!("Database connection lost: {error}"))
        }
        other => ProxyError::statement(format_statement_error(other)),
    }
}

/// Formats an engine error, keeping SQLite's extended result code when present.
fn format_statement_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("{} (code {code})", db_error.message()),
            None => db_error.message().to_string(),
        },
        None => {
            debug!("Non-database statement error: {:?}", error);
            error.to_string()
        }
    }
}
