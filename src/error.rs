//! Error types for the Spillway library.
//!
//! All failures are represented by the [`SpillwayError`] enum. Most of them
//! never reach a caller: the commit path is fire-and-forget and the query
//! facade converts every failure into a safe default. They still flow through
//! this type internally so that logs and statistics can classify them.
//!
//! # Examples
//!
//! ```
//! use spillway::error::{Result, SpillwayError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SpillwayError::malformed("unknown field `foo`"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// The main error type for Spillway operations.
#[derive(Error, Debug)]
pub enum SpillwayError {
    /// Transport or connectivity failure, or any backend failure that is not
    /// otherwise classified.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the request body.
    #[error("Query malformed: {0}")]
    QueryMalformed(String),

    /// The addressed index does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bulk response carried one or more per-item failures.
    #[error("Bulk partial failure on index {index}: {message}")]
    BulkPartialFailure { index: String, message: String },

    /// A pending window was dropped because the pending queue was full.
    #[error("Overflow: {0}")]
    Overflow(String),

    /// The pipeline has been shut down and no longer accepts commits.
    #[error("Pipeline closed")]
    Closed,

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SpillwayError.
pub type Result<T> = std::result::Result<T, SpillwayError>;

impl SpillwayError {
    /// Create a new backend unavailable error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        SpillwayError::BackendUnavailable(msg.into())
    }

    /// Create a new malformed query error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        SpillwayError::QueryMalformed(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        SpillwayError::NotFound(msg.into())
    }

    /// Create a new bulk partial failure error.
    pub fn bulk_failure<I: Into<String>, S: Into<String>>(index: I, msg: S) -> Self {
        SpillwayError::BulkPartialFailure {
            index: index.into(),
            message: msg.into(),
        }
    }

    /// Create a new overflow error.
    pub fn overflow<S: Into<String>>(msg: S) -> Self {
        SpillwayError::Overflow(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SpillwayError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SpillwayError::Other(msg.into())
    }

    /// Classification used by logs and query statistics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpillwayError::NotFound(_) => ErrorKind::NotFound,
            SpillwayError::QueryMalformed(_) => ErrorKind::QueryMalformed,
            SpillwayError::BulkPartialFailure { .. } => ErrorKind::BulkPartialFailure,
            SpillwayError::Overflow(_) => ErrorKind::Overflow,
            _ => ErrorKind::BackendUnavailable,
        }
    }
}

/// Coarse classification of a [`SpillwayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BackendUnavailable,
    QueryMalformed,
    NotFound,
    BulkPartialFailure,
    Overflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::QueryMalformed => "query_malformed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BulkPartialFailure => "bulk_partial_failure",
            ErrorKind::Overflow => "overflow",
        };
        f.write_str(name)
    }
}
