//! Statement classification module.
//!
//! Decides whether a SQL statement is a row-returning read or a
//! write/DDL statement, which selects the driver operation used to run it.
//!
//! The check is purely syntactic: only the leading keyword is inspected.
//! Statements that return rows without starting with `SELECT`
//! (`WITH ... SELECT`, `PRAGMA table_info(..)`, `INSERT ... RETURNING`)
//! are classified as writes and their rows are not collected.

use std::fmt;

/// Keyword that introduces a row-producing query.
const READ_KEYWORD: &str = "SELECT";

/// Classification of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Row-returning statement, executed through the engine's select path.
    Read,
    /// Any other statement (INSERT, UPDATE, DELETE, CREATE, ALTER, ...).
    Write,
}

impl StatementKind {
    /// Returns true if the statement should go through the select path.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
        }
    }
}

/// Classifies a SQL string by its leading keyword.
///
/// Never fails. Anything that does not start with the read keyword,
/// including empty input, is a [`StatementKind::Write`].
pub fn classify(sql: &str) -> StatementKind {
    let trimmed = sql.trim_start();

    let Some(head) = trimmed.get(..READ_KEYWORD.len()) else {
        return StatementKind::Write;
    };
    if !head.eq_ignore_ascii_case(READ_KEYWORD) {
        return StatementKind::Write;
    }

    // "SELECTED_ROWS" is an identifier, not the keyword
    match trimmed[READ_KEYWORD.len()..].chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => StatementKind::Write,
        _ => StatementKind::Read,
    }
}
