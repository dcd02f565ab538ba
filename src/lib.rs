//! sqlite-proxy - a query-proxy adapter for embedded SQLite.
//!
//! A query builder that only produces SQL text, parameters and a method tag
//! hands them to [`proxy::ProxyExecutor::execute`], which runs them on a
//! freshly acquired storage handle and returns positional rows.

pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod storage;
