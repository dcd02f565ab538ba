//! Query proxy for sqlite-proxy.
//!
//! Runs the statements a query builder produces against a storage engine
//! and hands results back in the positional shape the builder expects.

pub mod executor;
mod types;

pub use executor::ProxyExecutor;
pub use types::{Method, ProxyResult, Rows, Statement, StatementErrorPolicy};
