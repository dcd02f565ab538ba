//! Mock storage engine for testing.
//!
//! Returns scripted rows, can be told to fail at any stage, and counts the
//! operations it receives so tests can check what the proxy dispatched.

use super::{Locator, RawRow, StorageEngine, StorageHandle, Value, WriteOutcome};
use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Snapshot of the operations a mock engine has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub acquire: usize,
    pub select: usize,
    pub execute: usize,
}

#[derive(Debug, Default)]
struct MockState {
    rows: Mutex<Vec<RawRow>>,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    rows_affected: AtomicU64,
    fail_acquire: AtomicBool,
    fail_select: AtomicBool,
    fail_execute: AtomicBool,
    lose_connection: AtomicBool,
    acquire_calls: AtomicUsize,
    select_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

/// A mock engine whose handles return predefined results.
///
/// Clones share state, so a test can keep one clone for assertions while
/// the proxy owns another.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    /// Creates a mock engine that returns no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rows every select returns.
    pub fn with_rows(self, rows: Vec<RawRow>) -> Self {
        if let Ok(mut guard) = self.state.rows.lock() {
            *guard = rows;
        }
        self
    }

    /// Sets the affected-row count every execute reports.
    pub fn with_rows_affected(self, count: u64) -> Self {
        self.state.rows_affected.store(count, Ordering::SeqCst);
        self
    }

    /// Makes every acquisition fail.
    pub fn failing_acquire(self) -> Self {
        self.state.fail_acquire.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every select fail.
    pub fn failing_select(self) -> Self {
        self.state.fail_select.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every execute fail.
    pub fn failing_execute(self) -> Self {
        self.state.fail_execute.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every handle operation fail as if the database went away.
    pub fn losing_connection(self) -> Self {
        self.state.lose_connection.store(true, Ordering::SeqCst);
        self
    }

    /// Returns how many operations of each kind were received.
    pub fn calls(&self) -> MockCalls {
        MockCalls {
            acquire: self.state.acquire_calls.load(Ordering::SeqCst),
            select: self.state.select_calls.load(Ordering::SeqCst),
            execute: self.state.execute_calls.load(Ordering::SeqCst),
        }
    }

    /// Returns the SQL and params of every statement that reached a handle.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state
            .statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageEngine for MockEngine {
    async fn acquire(&self, locator: &Locator) -> Result<Box<dyn StorageHandle>> {
        self.state.acquire_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_acquire.load(Ordering::SeqCst) {
            return Err(ProxyError::storage_unavailable(format!(
                "Mock engine refused to open {locator}"
            )));
        }

        Ok(Box::new(MockHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    state: Arc<MockState>,
}

impl MockHandle {
    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        if let Ok(mut statements) = self.state.statements.lock() {
            statements.push((sql.to_string(), params.to_vec()));
        }
        if self.state.lose_connection.load(Ordering::SeqCst) {
            return Err(ProxyError::storage_unavailable("Mock connection lost"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageHandle for MockHandle {
    async fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>> {
        self.state.select_calls.fetch_add(1, Ordering::SeqCst);
        self.record(sql, params)?;

        if self.state.fail_select.load(Ordering::SeqCst) {
            return Err(ProxyError::statement(format!("Mock select failed for: {sql}")));
        }

        Ok(self
            .state
            .rows
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<WriteOutcome> {
        self.state.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.record(sql, params)?;

        if self.state.fail_execute.load(Ordering::SeqCst) {
            return Err(ProxyError::statement(format!("Mock execute failed for: {sql}")));
        }

        Ok(WriteOutcome {
            rows_affected: self.state.rows_affected.load(Ordering::SeqCst),
            last_insert_id: 0,
        })
    }
}
