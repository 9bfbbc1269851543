//! Size and time bounded windowing of accepted commits.
//!
//! A window opens lazily with its first entry and closes as soon as it holds
//! `size_threshold` entries or has been open for `timeout`, whichever comes
//! first. Empty windows are never emitted.

use std::time::Duration;

use tokio::time::Instant;

use crate::document::DocumentSource;
use crate::index::IndexRef;

/// One accepted commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitEntry {
    pub index: IndexRef,
    pub source: DocumentSource,
}

impl CommitEntry {
    pub fn new(index: IndexRef, source: DocumentSource) -> Self {
        Self { index, source }
    }
}

/// Why a window was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The entry count reached the size threshold.
    Size,
    /// The window outlived the time threshold.
    Timeout,
    /// The window was closed on shutdown.
    Flush,
}

/// A closed, immutable batch of commits.
#[derive(Debug)]
pub struct Window {
    sequence: u64,
    opened_at: Instant,
    reason: CloseReason,
    entries: Vec<CommitEntry>,
}

impl Window {
    /// Monotonic sequence number assigned at close.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the first entry arrived.
    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub fn close_reason(&self) -> CloseReason {
        self.reason
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CommitEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CommitEntry> {
        self.entries
    }
}

/// Buffers commits into windows.
#[derive(Debug)]
pub struct WindowAccumulator {
    size_threshold: usize,
    timeout: Duration,
    open: Vec<CommitEntry>,
    opened_at: Option<Instant>,
    next_sequence: u64,
}

impl WindowAccumulator {
    /// Create an accumulator. A zero size threshold is treated as one.
    pub fn new(size_threshold: usize, timeout: Duration) -> Self {
        Self {
            size_threshold: size_threshold.max(1),
            timeout,
            open: Vec::new(),
            opened_at: None,
            next_sequence: 0,
        }
    }

    /// Append an entry to the open window.
    ///
    /// Windows closed by this call are pushed onto `closed`: an already
    /// expired window is closed before the entry is added, and the window
    /// receiving the entry is closed if it reaches the size threshold.
    pub fn accept(&mut self, entry: CommitEntry, now: Instant, closed: &mut Vec<Window>) {
        if let Some(expired) = self.poll_expired(now) {
            closed.push(expired);
        }

        if self.open.is_empty() {
            self.opened_at = Some(now);
            self.open.reserve(self.size_threshold.min(1024));
        }
        self.open.push(entry);

        if self.open.len() >= self.size_threshold {
            if let Some(full) = self.close(CloseReason::Size) {
                closed.push(full);
            }
        }
    }

    /// Close the open window if it has outlived the time threshold.
    pub fn poll_expired(&mut self, now: Instant) -> Option<Window> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.close(CloseReason::Timeout),
            _ => None,
        }
    }

    /// Close the open window regardless of thresholds.
    pub fn flush(&mut self) -> Option<Window> {
        self.close(CloseReason::Flush)
    }

    /// Instant at which the open window expires.
    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened_at| opened_at + self.timeout)
    }

    /// Number of entries in the open window.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    fn close(&mut self, reason: CloseReason) -> Option<Window> {
        let opened_at = self.opened_at.take()?;
        if self.open.is_empty() {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Some(Window {
            sequence,
            opened_at,
            reason,
            entries: std::mem::take(&mut self.open),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(index: &str, n: u64) -> CommitEntry {
        CommitEntry::new(
            IndexRef::new(index),
            DocumentSource::from_value(json!({ "n": n })),
        )
    }

    #[test]
    fn test_size_threshold_closes_window() {
        let mut acc = WindowAccumulator::new(3, Duration::from_secs(3));
        let now = Instant::now();
        let mut closed = Vec::new();

        acc.accept(entry("a", 1), now, &mut closed);
        acc.accept(entry("a", 2), now, &mut closed);
        assert!(closed.is_empty());
        assert_eq!(acc.len(), 2);

        acc.accept(entry("a", 3), now, &mut closed);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].len(), 3);
        assert_eq!(closed[0].close_reason(), CloseReason::Size);
        assert!(acc.is_empty());
        assert_eq!(acc.deadline(), None);
    }

    #[test]
    fn test_time_threshold_closes_window() {
        let mut acc = WindowAccumulator::new(1000, Duration::from_secs(3));
        let start = Instant::now();
        let mut closed = Vec::new();

        acc.accept(entry("a", 1), start, &mut closed);
        assert_eq!(acc.deadline(), Some(start + Duration::from_secs(3)));

        assert!(acc.poll_expired(start + Duration::from_secs(2)).is_none());

        let window = acc.poll_expired(start + Duration::from_secs(3)).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.close_reason(), CloseReason::Timeout);
        assert!(closed.is_empty());
    }

    #[test]
    fn test_empty_window_is_never_emitted() {
        let mut acc = WindowAccumulator::new(10, Duration::from_millis(1));
        let later = Instant::now() + Duration::from_secs(60);

        assert!(acc.poll_expired(later).is_none());
        assert!(acc.flush().is_none());
    }

    #[test]
    fn test_expired_window_closes_before_accepting() {
        let mut acc = WindowAccumulator::new(10, Duration::from_secs(1));
        let start = Instant::now();
        let mut closed = Vec::new();

        acc.accept(entry("a", 1), start, &mut closed);
        acc.accept(entry("a", 2), start + Duration::from_secs(2), &mut closed);

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].len(), 1);
        assert_eq!(acc.len(), 1);
        assert_eq!(
            acc.deadline(),
            Some(start + Duration::from_secs(2) + Duration::from_secs(1))
        );
    }

    #[test]
    fn test_sequences_are_monotonic() {
        let mut acc = WindowAccumulator::new(1, Duration::from_secs(1));
        let now = Instant::now();
        let mut closed = Vec::new();

        for n in 0..3 {
            acc.accept(entry("a", n), now, &mut closed);
        }

        let sequences: Vec<u64> = closed.iter().map(Window::sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }
}
