//! Types exchanged across the proxy boundary.

use crate::classify::{classify, StatementKind};
use crate::error::ProxyError;
use crate::storage::{NormalizedRow, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Method tag the query builder attaches to each statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Single-row expectation.
    Run,
    /// All matching rows.
    All,
    /// Single-row expectation.
    Get,
    /// All matching rows as positional values.
    Values,
}

impl Method {
    /// Returns true if the caller expects only the first row back.
    pub fn expects_single_row(&self) -> bool {
        matches!(self, Self::Run | Self::Get)
    }

    /// Returns the method as the query builder spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::All => "all",
            Self::Get => "get",
            Self::Values => "values",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProxyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(Self::Run),
            "all" => Ok(Self::All),
            "get" => Ok(Self::Get),
            "values" => Ok(Self::Values),
            _ => Err(ProxyError::invalid_method(format!(
                "'{s}'. Expected: run, all, get, or values"
            ))),
        }
    }
}

/// What the executor does when the engine rejects a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementErrorPolicy {
    /// Log the failure and return an empty result.
    #[default]
    Empty,
    /// Return the failure to the caller.
    Propagate,
}

impl FromStr for StatementErrorPolicy {
    type Err = ProxyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "propagate" => Ok(Self::Propagate),
            _ => Err(ProxyError::config(format!(
                "Invalid statement error policy '{s}'. Expected: empty or propagate"
            ))),
        }
    }
}

/// One unit of SQL text with its parameters and method tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub method: Method,
}

impl Statement {
    /// Creates a statement.
    pub fn new(text: impl Into<String>, params: Vec<Value>, method: Method) -> Self {
        Self {
            text: text.into(),
            params,
            method,
        }
    }

    /// Classifies the statement text.
    pub fn kind(&self) -> StatementKind {
        classify(&self.text)
    }
}

/// Row payload of a proxy result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Rows {
    /// Every row, for all-rows methods and for writes.
    Many(Vec<NormalizedRow>),
    /// The first row only, for single-row methods.
    Single(Option<NormalizedRow>),
}

/// Result handed back to the query builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyResult {
    pub rows: Rows,
}

impl ProxyResult {
    /// Result for a write statement: always an empty row list.
    pub fn write() -> Self {
        Self {
            rows: Rows::Many(Vec::new()),
        }
    }

    /// Shapes normalized rows according to the method.
    pub fn from_rows(rows: Vec<NormalizedRow>, method: Method) -> Self {
        let rows = if method.expects_single_row() {
            Rows::Single(rows.into_iter().next())
        } else {
            Rows::Many(rows)
        };
        Self { rows }
    }

    /// Empty read result in the shape the method expects.
    pub fn empty(method: Method) -> Self {
        Self::from_rows(Vec::new(), method)
    }

    /// Returns the number of rows carried.
    pub fn len(&self) -> usize {
        match &self.rows {
            Rows::Many(rows) => rows.len(),
            Rows::Single(row) => usize::from(row.is_some()),
        }
    }

    /// Returns true if no rows are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
