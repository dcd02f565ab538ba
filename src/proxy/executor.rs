//! Statement execution through a storage engine.
//!
//! Implements the query builder's `execute(sql, params, method)` contract:
//! acquire a fresh handle, classify, dispatch to the select or execute path,
//! normalize keyed rows to positional ones, and shape the result for the
//! method.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::classify::{classify, StatementKind};
use crate::error::{ProxyError, Result};
use crate::storage::{Locator, RawRow, StorageEngine, StorageHandle, Value};

use super::{Method, ProxyResult, Statement, StatementErrorPolicy};

/// Executes query-builder statements against one database.
///
/// No handle is kept between calls: every `execute` acquires its own and
/// drops it before returning.
pub struct ProxyExecutor<E> {
    engine: Arc<E>,
    locator: Locator,
    policy: StatementErrorPolicy,
}

impl<E> Clone for ProxyExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            locator: self.locator.clone(),
            policy: self.policy,
        }
    }
}

impl<E: StorageEngine> ProxyExecutor<E> {
    /// Creates an executor that owns its engine.
    pub fn new(engine: E, locator: impl Into<Locator>) -> Self {
        Self::from_shared(Arc::new(engine), locator)
    }

    /// Creates an executor over an engine shared with other executors.
    pub fn from_shared(engine: Arc<E>, locator: impl Into<Locator>) -> Self {
        Self {
            engine,
            locator: locator.into(),
            policy: StatementErrorPolicy::default(),
        }
    }

    /// Sets how engine-level statement failures are handled.
    pub fn with_policy(mut self, policy: StatementErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the locator handles are acquired for.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Runs one statement and returns rows in the shape the query builder expects.
    ///
    /// Fails with `StorageUnavailable` when no handle can be acquired, in which
    /// case no statement reaches the engine. Engine rejections of the statement
    /// itself follow the configured [`StatementErrorPolicy`].
    pub async fn execute(&self, sql: &str, params: &[Value], method: Method) -> Result<ProxyResult> {
        let handle = self.acquire().await?;
        let kind = classify(sql);
        debug!(
            "Dispatching {} statement (method={}): {} [{}]",
            kind,
            method,
            sql,
            format_params(params)
        );

        let start = Instant::now();
        let result = match kind {
            StatementKind::Read => match handle.select(sql, params).await {
                Ok(raw_rows) => {
                    debug!("Select returned {} rows", raw_rows.len());
                    let rows = raw_rows.into_iter().map(RawRow::into_values).collect();
                    Ok(ProxyResult::from_rows(rows, method))
                }
                Err(e) => self.contain(e, sql, kind, ProxyResult::empty(method)),
            },
            StatementKind::Write => match handle.execute(sql, params).await {
                Ok(outcome) => {
                    debug!(
                        "Execute affected {} rows (last insert id {})",
                        outcome.rows_affected, outcome.last_insert_id
                    );
                    Ok(ProxyResult::write())
                }
                Err(e) => self.contain(e, sql, kind, ProxyResult::write()),
            },
        };
        debug!("Statement finished in {:?}", start.elapsed());

        result
    }

    /// Runs a [`Statement`] built by the caller.
    pub async fn execute_statement(&self, statement: &Statement) -> Result<ProxyResult> {
        self.execute(&statement.text, &statement.params, statement.method)
            .await
    }

    /// Runs SQL through the select path and returns the engine's keyed rows.
    ///
    /// Unlike [`ProxyExecutor::execute`], the statement is not classified,
    /// rows are not normalized, and statement failures are always returned.
    pub async fn raw_query(&self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>> {
        let handle = self.acquire().await?;
        handle.select(sql, params).await
    }

    async fn acquire(&self) -> Result<Box<dyn StorageHandle>> {
        self.engine.acquire(&self.locator).await.map_err(|e| {
            warn!("Could not acquire handle for {}: {}", self.locator, e);
            match e {
                ProxyError::StorageUnavailable(_) => e,
                other => ProxyError::storage_unavailable(other.to_string()),
            }
        })
    }

    /// Applies the statement failure policy.
    ///
    /// Losing the database mid-call is not a statement failure and is always
    /// returned.
    fn contain(
        &self,
        err: ProxyError,
        sql: &str,
        kind: StatementKind,
        fallback: ProxyResult,
    ) -> Result<ProxyResult> {
        if err.is_storage_unavailable() {
            warn!("{} statement lost its database: {} [{}]", kind, err, sql);
            return Err(err);
        }

        match self.policy {
            StatementErrorPolicy::Empty => {
                error!("{} statement failed, returning no rows: {} [{}]", kind, err, sql);
                Ok(fallback)
            }
            StatementErrorPolicy::Propagate => {
                debug!("{} statement failed: {} [{}]", kind, err, sql);
                match err {
                    ProxyError::Statement(_) => Err(err),
                    other => Err(ProxyError::statement(other.to_string())),
                }
            }
        }
    }
}

fn format_params(params: &[Value]) -> String {
    params
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
