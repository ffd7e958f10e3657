//! Typed errors for the scholar crawler.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the CLI wraps these
//! with context at the process boundary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while walking profiles or search results.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Browser interaction failed
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Record log could not be read or written
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A profile reference carried no usable identity
    #[error(transparent)]
    MalformedReference(#[from] MalformedReference),

    /// Reference could not be resolved against the site URL
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A required piece of a page was missing or unreadable
    #[error("required field `{field}` unavailable: {reason}")]
    RequiredField { field: &'static str, reason: String },

    /// Snapshot file could not be written
    #[error("failed to write snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by a [`crate::traits::BrowserPage`] implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Element did not show up within the bounded wait
    #[error("timed out after {waited:?} waiting for `{selector}`")]
    Timeout { selector: String, waited: Duration },

    /// Element is not on the page
    #[error("no element matches `{selector}`")]
    NotFound { selector: String },

    /// Page could not be loaded
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Local file operation failed (snapshots, downloads)
    #[error("browser io error: {0}")]
    Io(#[from] std::io::Error),

    /// Automation backend failed
    #[error("browser backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BrowserError {
    /// Timeouts and missing elements both mean "the thing is not there".
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NotFound { .. })
    }
}

/// Identity key derivation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed profile reference `{reference}`: {reason}")]
pub struct MalformedReference {
    pub reference: String,
    pub reason: &'static str,
}

/// Errors from the append-only record log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A committed line could not be decoded
    #[error("corrupt record log {path:?} at line {line}: {source}")]
    CorruptLog {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Record could not be encoded
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// Filesystem operation failed
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the offline repair pass.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Destination already exists or would shadow the source log
    #[error("refusing to write repair output to {path:?}: {reason}")]
    Destination { path: PathBuf, reason: &'static str },

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for traversal operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for repair operations.
pub type RepairResult<T> = std::result::Result<T, RepairError>;
