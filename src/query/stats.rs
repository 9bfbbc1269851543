//! Outcome counters for the query facade.
//!
//! Query operations never return errors to their caller, so every outcome
//! is classified here as well as in the log.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Query-facing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperation {
    QueryPage,
    Query,
    Count,
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryOperation::QueryPage => "query_page",
            QueryOperation::Query => "query",
            QueryOperation::Count => "count",
        };
        f.write_str(name)
    }
}

/// How a query operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The backend answered.
    Answered,
    /// No request could be built or the index does not exist.
    Empty,
    /// The operation failed and the safe default was returned.
    Failed(ErrorKind),
}

/// Point-in-time view of the query counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    pub answered: u64,
    pub empty: u64,
    pub malformed: u64,
    pub backend_errors: u64,
}

impl QueryStats {
    /// Operations that fell back to a safe default because of an error.
    pub fn failures(&self) -> u64 {
        self.malformed + self.backend_errors
    }
}

#[derive(Debug, Default)]
pub struct QueryMetrics {
    answered: AtomicU64,
    empty: AtomicU64,
    malformed: AtomicU64,
    backend_errors: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: QueryOutcome) {
        let counter = match outcome {
            QueryOutcome::Answered => &self.answered,
            QueryOutcome::Empty | QueryOutcome::Failed(ErrorKind::NotFound) => &self.empty,
            QueryOutcome::Failed(ErrorKind::QueryMalformed) => &self.malformed,
            QueryOutcome::Failed(_) => &self.backend_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueryStats {
        QueryStats {
            answered: self.answered.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            backend_errors: self.backend_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let metrics = QueryMetrics::new();
        metrics.record(QueryOutcome::Answered);
        metrics.record(QueryOutcome::Empty);
        metrics.record(QueryOutcome::Failed(ErrorKind::NotFound));
        metrics.record(QueryOutcome::Failed(ErrorKind::QueryMalformed));
        metrics.record(QueryOutcome::Failed(ErrorKind::BackendUnavailable));

        let stats = metrics.snapshot();
        assert_eq!(stats.answered, 1);
        assert_eq!(stats.empty, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.backend_errors, 1);
        assert_eq!(stats.failures(), 2);
    }
}
