//! Write-buffering commit pipeline.
//!
//! Producers append commits to the open window under a single lock and
//! return immediately. Two background tasks do the rest:
//!
//! - the window ticker closes the open window when it outlives the time
//!   threshold (the size threshold is enforced inline by `commit`),
//! - the dispatch loop pulls closed windows from the [`OverflowGuard`] and
//!   spawns one [`BulkDispatcher::dispatch`] per window, at most
//!   `max_in_flight` at a time.
//!
//! ```text
//! commit ─► WindowAccumulator ─► OverflowGuard ─► BulkDispatcher ─► backend
//!                 ▲                (drop-oldest)     (per-index bulk)
//!            window ticker
//! ```

pub mod dispatcher;
pub mod metrics;
pub mod overflow;
pub mod window;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{Stream, StreamExt};
use log::{debug, error, info};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use crate::backend::SearchBackend;
use crate::config::PipelineConfig;
use crate::document::DocumentSource;
use crate::error::{Result, SpillwayError};
use crate::index::IndexRef;
use crate::pipeline::dispatcher::BulkDispatcher;
use crate::pipeline::metrics::{PipelineMetrics, PipelineStats};
use crate::pipeline::overflow::OverflowGuard;
use crate::pipeline::window::{CommitEntry, Window, WindowAccumulator};

/// Window state guarded by the ingress lock.
struct Ingress {
    accumulator: WindowAccumulator,
    closed: bool,
}

struct Shared {
    config: PipelineConfig,
    ingress: Mutex<Ingress>,
    guard: OverflowGuard,
    dispatcher: BulkDispatcher,
    metrics: Arc<PipelineMetrics>,
    window_opened: Notify,
    draining: AtomicBool,
}

impl Shared {
    fn append(&self, entries: Vec<CommitEntry>) -> Result<usize> {
        let count = entries.len();
        let mut ingress = self.ingress.lock();
        if ingress.closed {
            drop(ingress);
            self.metrics.record_rejected(count);
            return Err(SpillwayError::Closed);
        }

        let was_empty = ingress.accumulator.is_empty();
        let now = Instant::now();
        let mut closed = Vec::new();
        for entry in entries {
            ingress.accumulator.accept(entry, now, &mut closed);
        }
        let opened = !ingress.accumulator.is_empty() && (was_empty || !closed.is_empty());

        // Enqueue under the ingress lock so shutdown never misses a window.
        for window in closed {
            self.close_window(window);
        }
        drop(ingress);

        self.metrics.record_accepted(count);
        if opened {
            self.window_opened.notify_one();
        }
        Ok(count)
    }

    fn close_window(&self, window: Window) {
        self.metrics.record_window_closed();
        debug!(
            "Closed window {} ({:?}) with {} documents",
            window.sequence(),
            window.close_reason(),
            window.len()
        );
        self.guard.enqueue(window);
    }
}

/// Buffers commits into windows and writes them to the backend in bulk.
///
/// Construct once, call [`init`](Self::init) from inside a tokio runtime,
/// and [`shutdown`](Self::shutdown) to stop accepting commits and drain.
pub struct CommitPipeline {
    shared: Arc<Shared>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CommitPipeline {
    /// Create a pipeline writing to `backend`.
    pub fn new(config: PipelineConfig, backend: Arc<dyn SearchBackend>) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(PipelineMetrics::new());
        let shared = Shared {
            ingress: Mutex::new(Ingress {
                accumulator: WindowAccumulator::new(config.window_size, config.window_timeout),
                closed: false,
            }),
            guard: OverflowGuard::new(config.pending_capacity, metrics.clone()),
            dispatcher: BulkDispatcher::new(backend, metrics.clone()),
            metrics,
            window_opened: Notify::new(),
            draining: AtomicBool::new(false),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start the window ticker and dispatch loop. Calling it again is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let ticker = tokio::spawn(run_window_ticker(self.shared.clone()));
        let dispatch = tokio::spawn(run_dispatch_loop(self.shared.clone()));
        self.tasks.lock().extend([ticker, dispatch]);

        info!(
            "Commit pipeline started: window_size={}, window_timeout={:?}, pending_capacity={}, max_in_flight={}",
            self.shared.config.window_size,
            self.shared.config.window_timeout,
            self.shared.config.pending_capacity,
            self.shared.config.max_in_flight
        );
    }

    /// Buffer one document for `index`.
    pub fn commit<T>(&self, index: impl Into<IndexRef>, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let entry = CommitEntry::new(index.into(), DocumentSource::from_payload(payload)?);
        self.shared.append(vec![entry]).map(|_| ())
    }

    /// Buffer every document of a collection, in order.
    ///
    /// All documents are serialized before any is buffered, so a
    /// serialization error leaves nothing behind.
    pub fn commit_all<I>(&self, index: impl Into<IndexRef>, payloads: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let index = index.into();
        let entries = payloads
            .into_iter()
            .map(|payload| {
                DocumentSource::from_payload(&payload)
                    .map(|source| CommitEntry::new(index.clone(), source))
            })
            .collect::<Result<Vec<_>>>()?;

        if entries.is_empty() {
            return Ok(0);
        }
        self.shared.append(entries)
    }

    /// Forward every element of a stream as an individual commit.
    ///
    /// Resolves once the stream ends, with the number of forwarded elements.
    pub async fn commit_stream<S>(&self, index: impl Into<IndexRef>, stream: S) -> Result<usize>
    where
        S: Stream,
        S::Item: Serialize,
    {
        let index = index.into();
        let mut stream = std::pin::pin!(stream);
        let mut forwarded = 0;

        while let Some(payload) = stream.next().await {
            self.commit(index.clone(), &payload)?;
            forwarded += 1;
        }
        Ok(forwarded)
    }

    /// Stop accepting commits and drain.
    ///
    /// The open window is closed, pending windows are dispatched through the
    /// normal path and in-flight dispatches run to completion. If `init` was
    /// never called the drain runs on the calling task.
    pub async fn shutdown(&self) {
        {
            let mut ingress = self.shared.ingress.lock();
            if ingress.closed {
                return;
            }
            ingress.closed = true;
            if let Some(window) = ingress.accumulator.flush() {
                self.shared.close_window(window);
            }
        }

        self.shared.draining.store(true, Ordering::Release);
        self.shared.window_opened.notify_one();
        self.shared.guard.wake();

        if self.started.swap(true, Ordering::AcqRel) {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
            for task in tasks {
                if let Err(e) = task.await {
                    log_join_error(e);
                }
            }
        } else {
            run_dispatch_loop(self.shared.clone()).await;
        }

        let stats = self.stats();
        info!(
            "Commit pipeline stopped: {} documents written, {} failed, {} dropped",
            stats.documents_written, stats.documents_failed, stats.documents_dropped
        );
    }

    /// Whether commits are still accepted.
    pub fn is_open(&self) -> bool {
        !self.shared.ingress.lock().closed
    }

    /// Number of closed windows waiting for dispatch.
    pub fn pending_windows(&self) -> usize {
        self.shared.guard.len()
    }

    /// Number of entries in the open window.
    pub fn open_entries(&self) -> usize {
        self.shared.ingress.lock().accumulator.len()
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> PipelineStats {
        self.shared.metrics.snapshot(self.shared.guard.len())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }
}

async fn run_window_ticker(shared: Arc<Shared>) {
    loop {
        if shared.draining.load(Ordering::Acquire) {
            break;
        }

        let deadline = shared.ingress.lock().accumulator.deadline();
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = time::sleep_until(deadline) => {}
                    _ = shared.window_opened.notified() => {}
                }
            }
            None => shared.window_opened.notified().await,
        }

        {
            let mut ingress = shared.ingress.lock();
            if let Some(window) = ingress.accumulator.poll_expired(Instant::now()) {
                shared.close_window(window);
            }
        }
    }
    debug!("Window ticker stopped");
}

async fn run_dispatch_loop(shared: Arc<Shared>) {
    let permits = Arc::new(Semaphore::new(shared.config.max_in_flight));
    let mut in_flight: JoinSet<usize> = JoinSet::new();

    loop {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let window = loop {
            if let Some(window) = shared.guard.dequeue() {
                break Some(window);
            }
            if shared.draining.load(Ordering::Acquire) {
                break None;
            }
            shared.guard.wait_available().await;
        };
        let Some(window) = window else {
            break;
        };

        let dispatcher = shared.dispatcher.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            dispatcher.dispatch(window).await
        });

        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                log_join_error(e);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            log_join_error(e);
        }
    }
    debug!("Dispatch loop stopped");
}

fn log_join_error(err: JoinError) {
    error!("Pipeline task failed: {err}");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn pipeline(config: PipelineConfig) -> (CommitPipeline, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let pipeline = CommitPipeline::new(config, backend.clone()).unwrap();
        (pipeline, backend)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let backend = Arc::new(MemoryBackend::new());
        let result = CommitPipeline::new(PipelineConfig::default().with_window_size(0), backend);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_size_close_enqueues_before_init() {
        let (pipeline, _backend) = pipeline(PipelineConfig::default().with_window_size(2));

        pipeline.commit("logs", &json!({"n": 1})).unwrap();
        assert_eq!(pipeline.open_entries(), 1);
        assert_eq!(pipeline.pending_windows(), 0);

        pipeline.commit("logs", &json!({"n": 2})).unwrap();
        assert_eq!(pipeline.open_entries(), 0);
        assert_eq!(pipeline.pending_windows(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_init_drains_inline() {
        let (pipeline, backend) = pipeline(PipelineConfig::default());

        pipeline.commit_all("logs", (0..5).map(|n| json!({ "n": n }))).unwrap();
        pipeline.shutdown().await;

        assert_eq!(backend.document_count("logs"), 5);
        assert!(!pipeline.is_open());
        assert!(matches!(
            pipeline.commit("logs", &json!({"n": 6})),
            Err(SpillwayError::Closed)
        ));
        assert_eq!(pipeline.stats().commits_rejected, 1);
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let (pipeline, backend) = pipeline(
            PipelineConfig::default().with_window_timeout(Duration::from_millis(20)),
        );
        pipeline.init();
        pipeline.init();
        assert_eq!(pipeline.tasks.lock().len(), 2);

        pipeline.commit("logs", &json!({"n": 1})).unwrap();
        pipeline.shutdown().await;
        pipeline.shutdown().await;

        assert_eq!(backend.document_count("logs"), 1);
    }
}
