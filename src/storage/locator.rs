//! Resource locators for SQLite databases.
//!
//! A locator is what the proxy hands to `acquire`: a `sqlite:` URL,
//! the in-memory marker, or a file path that may be relative to a
//! resource directory. URL query options such as `?mode=ro` are kept
//! alongside the resolved path.

use crate::error::{ProxyError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

const URL_PREFIX: &str = "sqlite:";
const MEMORY: &str = ":memory:";

/// Identifies the database a handle is acquired for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    raw: String,
    resource_dir: Option<PathBuf>,
}

/// The database a locator resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Private in-memory database.
    Memory,

    /// Database file, with the URL query options it was given.
    File {
        path: PathBuf,
        options: Option<String>,
    },
}

impl Target {
    /// Returns true if the locator asked for `mode=ro`.
    pub fn is_read_only(&self) -> bool {
        match self {
            Target::Memory => false,
            Target::File { options, .. } => options
                .as_deref()
                .is_some_and(|q| q.split('&').any(|pair| pair == "mode=ro")),
        }
    }
}

impl Locator {
    /// Creates a locator resolved against the working directory.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            resource_dir: None,
        }
    }

    /// Resolves relative paths against `dir` instead of the working directory.
    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    /// Returns true if the locator names an in-memory database.
    pub fn is_memory(&self) -> bool {
        let raw = self.raw.trim();
        raw == MEMORY || raw.strip_prefix(URL_PREFIX) == Some(MEMORY)
    }

    /// Resolves the locator to the database it names.
    pub fn target(&self) -> Result<Target> {
        let raw = self.raw.trim();
        if raw.is_empty() {
            return Err(ProxyError::storage_unavailable("Empty database locator"));
        }
        if self.is_memory() {
            return Ok(Target::Memory);
        }

        // sqlite:path and sqlite://path both name a file
        let rest = match raw.strip_prefix(URL_PREFIX) {
            Some(rest) => rest.strip_prefix("//").unwrap_or(rest),
            None => raw,
        };
        let (path_part, options) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query).filter(|q| !q.is_empty())),
            None => (rest, None),
        };
        if path_part.is_empty() {
            return Err(ProxyError::storage_unavailable(format!(
                "Locator '{raw}' does not name a database file"
            )));
        }

        let path = Path::new(path_part);
        let path = match &self.resource_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };

        Ok(Target::File {
            path,
            options: options.map(str::to_string),
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_dir {
            Some(dir) => write!(f, "{} (in {})", self.raw, dir.display()),
            None => write!(f, "{}", self.raw),
        }
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Locator {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
