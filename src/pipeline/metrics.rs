//! Diagnostic counters for the commit path.
//!
//! Overflow and bulk failures never reach the caller of `commit`; these
//! counters are where they become observable.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Commits buffered into a window.
    pub commits_accepted: u64,

    /// Commits refused because the pipeline was shut down.
    pub commits_rejected: u64,

    /// Non-empty windows closed by size, time or shutdown.
    pub windows_closed: u64,

    /// Windows whose dispatch finished (successfully or not).
    pub windows_dispatched: u64,

    /// Windows evicted from a full pending queue.
    pub windows_dropped: u64,

    /// Documents lost with evicted windows.
    pub documents_dropped: u64,

    /// Documents acknowledged by the backend.
    pub documents_written: u64,

    /// Documents in bulk groups that failed.
    pub documents_failed: u64,

    /// Bulk requests issued.
    pub bulk_requests: u64,

    /// Bulk requests that failed or reported item failures.
    pub bulk_failures: u64,

    /// Windows currently waiting for dispatch.
    pub pending_windows: u64,

    /// Completion time of the last bulk request that succeeded.
    pub last_write_at: Option<DateTime<Utc>>,
}

/// Thread-safe collector behind [`PipelineStats`].
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    commits_accepted: AtomicU64,
    commits_rejected: AtomicU64,
    windows_closed: AtomicU64,
    windows_dispatched: AtomicU64,
    windows_dropped: AtomicU64,
    documents_dropped: AtomicU64,
    documents_written: AtomicU64,
    documents_failed: AtomicU64,
    bulk_requests: AtomicU64,
    bulk_failures: AtomicU64,
    last_write_at: Mutex<Option<DateTime<Utc>>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self, count: usize) {
        self.commits_accepted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, count: usize) {
        self.commits_rejected
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_window_closed(&self) {
        self.windows_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_dispatched(&self) {
        self.windows_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self, documents: usize) {
        self.windows_dropped.fetch_add(1, Ordering::Relaxed);
        self.documents_dropped
            .fetch_add(documents as u64, Ordering::Relaxed);
    }

    pub fn record_bulk_success(&self, documents: usize) {
        self.bulk_requests.fetch_add(1, Ordering::Relaxed);
        self.documents_written
            .fetch_add(documents as u64, Ordering::Relaxed);
        *self.last_write_at.lock() = Some(Utc::now());
    }

    pub fn record_bulk_failure(&self, documents: usize) {
        self.bulk_requests.fetch_add(1, Ordering::Relaxed);
        self.bulk_failures.fetch_add(1, Ordering::Relaxed);
        self.documents_failed
            .fetch_add(documents as u64, Ordering::Relaxed);
    }

    /// Snapshot the counters. The pending queue length is supplied by the caller.
    pub fn snapshot(&self, pending_windows: usize) -> PipelineStats {
        PipelineStats {
            commits_accepted: self.commits_accepted.load(Ordering::Relaxed),
            commits_rejected: self.commits_rejected.load(Ordering::Relaxed),
            windows_closed: self.windows_closed.load(Ordering::Relaxed),
            windows_dispatched: self.windows_dispatched.load(Ordering::Relaxed),
            windows_dropped: self.windows_dropped.load(Ordering::Relaxed),
            documents_dropped: self.documents_dropped.load(Ordering::Relaxed),
            documents_written: self.documents_written.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            bulk_requests: self.bulk_requests.load(Ordering::Relaxed),
            bulk_failures: self.bulk_failures.load(Ordering::Relaxed),
            pending_windows: pending_windows as u64,
            last_write_at: *self.last_write_at.lock(),
        }
    }
}
