//! Bounded queue of closed windows awaiting dispatch.
//!
//! When the queue is full the oldest pending window is discarded to make
//! room for the newest one. Dropped windows are lost; the only trace they
//! leave is a warning and the overflow counters.

use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::SpillwayError;
use crate::pipeline::metrics::PipelineMetrics;
use crate::pipeline::window::Window;

/// Fixed-capacity FIFO of closed windows with drop-oldest overflow.
#[derive(Debug)]
pub struct PendingQueue {
    windows: VecDeque<Window>,
    capacity: usize,
}

impl PendingQueue {
    /// Create a queue. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            windows: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a window, returning the window evicted to stay within capacity.
    pub fn enqueue(&mut self, window: Window) -> Option<Window> {
        let evicted = if self.windows.len() >= self.capacity {
            self.windows.pop_front()
        } else {
            None
        };
        self.windows.push_back(window);
        evicted
    }

    /// Take the longest-pending window.
    pub fn dequeue(&mut self) -> Option<Window> {
        self.windows.pop_front()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Shared front of the [`PendingQueue`] used by producers and the dispatch loop.
#[derive(Debug)]
pub struct OverflowGuard {
    queue: Mutex<PendingQueue>,
    available: Notify,
    metrics: Arc<PipelineMetrics>,
}

impl OverflowGuard {
    pub fn new(capacity: usize, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            queue: Mutex::new(PendingQueue::new(capacity)),
            available: Notify::new(),
            metrics,
        }
    }

    /// Queue a closed window, evicting the oldest one if the queue is full.
    pub fn enqueue(&self, window: Window) {
        let (evicted, capacity) = {
            let mut queue = self.queue.lock();
            (queue.enqueue(window), queue.capacity())
        };

        if let Some(evicted) = evicted {
            self.metrics.record_overflow(evicted.len());
            let err = SpillwayError::overflow(format!(
                "pending queue full ({capacity} windows), dropped window {} with {} documents",
                evicted.sequence(),
                evicted.len()
            ));
            warn!("{err}");
        }

        self.available.notify_one();
    }

    /// Take the longest-pending window, if any.
    pub fn dequeue(&self) -> Option<Window> {
        self.queue.lock().dequeue()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Wait until a window may be available.
    pub async fn wait_available(&self) {
        self.available.notified().await;
    }

    /// Wake a waiter without queueing anything.
    pub fn wake(&self) {
        self.available.notify_one();
    }
}
