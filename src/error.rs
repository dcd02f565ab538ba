//! Error types for sqlite-proxy.
//!
//! Defines the main error enum used throughout the adapter.

use thiserror::Error;

/// Main error type for proxy operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Handle acquisition failed (missing database file, engine not reachable, etc.)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The engine rejected a statement (syntax errors, constraint violations, etc.)
    #[error("Statement failed: {0}")]
    Statement(String),

    /// Unknown query-builder method tag.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Configuration errors (invalid config file, bad option values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Creates a storage-unavailable error with the given message.
    pub fn storage_unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Creates a statement error with the given message.
    pub fn statement(msg: impl Into<String>) -> Self {
        Self::Statement(msg.into())
    }

    /// Creates an invalid-method error with the given message.
    pub fn invalid_method(msg: impl Into<String>) -> Self {
        Self::InvalidMethod(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "Storage Error",
            Self::Statement(_) => "Statement Error",
            Self::InvalidMethod(_) => "Method Error",
            Self::Config(_) => "Configuration Error",
        }
    }

    /// Returns true if this error came from handle acquisition.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// Result type alias using ProxyError.
pub type Result<T> = std::result::Result<T, ProxyError>;
