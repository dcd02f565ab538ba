//! Storage engine abstraction for sqlite-proxy.
//!
//! Provides the trait-based driver contract the proxy runs statements
//! through, so the SQLite engine and the in-process mock can be used
//! interchangeably.

mod locator;
mod mock;
mod sqlite;
mod types;

pub use locator::{Locator, Target};
pub use mock::{MockCalls, MockEngine};
pub use sqlite::{SqliteEngine, SqliteEngineOptions};
pub use types::{NormalizedRow, RawRow, Value, WriteOutcome};

use crate::error::Result;
use async_trait::async_trait;

/// An engine that hands out short-lived handles keyed by locator.
///
/// Implementations may pool connections internally, but every call to
/// `acquire` must return a handle that is valid on its own.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Acquires a handle for the database named by `locator`.
    ///
    /// Fails with `ProxyError::StorageUnavailable` when the database cannot
    /// be reached.
    async fn acquire(&self, locator: &Locator) -> Result<Box<dyn StorageHandle>>;
}

/// A session used to issue statements against one database.
#[async_trait]
pub trait StorageHandle: Send + Sync {
    /// Runs a row-returning statement and returns the keyed rows.
    async fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>>;

    /// Runs a mutating statement and returns what the engine reports about it.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<WriteOutcome>;
}
