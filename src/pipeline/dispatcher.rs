//! Per-index bulk dispatch of closed windows.
//!
//! A window is split into one bulk group per [`IndexRef`], keeping the
//! relative commit order inside each group. Every group becomes one bulk
//! request; all requests of a window run concurrently and are awaited
//! independently. A group whose response reports any item failure counts
//! as failed in full. Failures are logged and counted, never raised.

use std::sync::Arc;

use ahash::AHashMap;
use futures::future::join_all;
use log::{debug, error};

use crate::backend::{BulkRequest, SearchBackend};
use crate::document::DocumentSource;
use crate::error::{Result, SpillwayError};
use crate::index::IndexRef;
use crate::pipeline::metrics::PipelineMetrics;
use crate::pipeline::window::{CommitEntry, Window};

/// Documents of one window addressed at the same index.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkGroup {
    pub index: IndexRef,
    pub documents: Vec<DocumentSource>,
}

impl BulkGroup {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Build the bulk request carrying one index operation per document.
    pub fn into_request(self) -> BulkRequest {
        BulkRequest {
            index: self.index.index,
            doc_type: self.index.doc_type,
            operations: self.documents,
        }
    }
}

/// Group entries by index. Groups appear in order of first occurrence and
/// each group keeps the relative order of its entries.
pub fn group_by_index(entries: Vec<CommitEntry>) -> Vec<BulkGroup> {
    let mut positions: AHashMap<IndexRef, usize> = AHashMap::new();
    let mut groups: Vec<BulkGroup> = Vec::new();

    for entry in entries {
        match positions.get(&entry.index) {
            Some(&position) => groups[position].documents.push(entry.source),
            None => {
                positions.insert(entry.index.clone(), groups.len());
                groups.push(BulkGroup {
                    index: entry.index,
                    documents: vec![entry.source],
                });
            }
        }
    }

    groups
}

/// Writes windows to the backend.
#[derive(Clone)]
pub struct BulkDispatcher {
    backend: Arc<dyn SearchBackend>,
    metrics: Arc<PipelineMetrics>,
}

impl BulkDispatcher {
    pub fn new(backend: Arc<dyn SearchBackend>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { backend, metrics }
    }

    /// Dispatch a window and return the number of documents written.
    ///
    /// Failed groups contribute zero; sibling groups are unaffected.
    pub async fn dispatch(&self, window: Window) -> usize {
        let sequence = window.sequence();
        let groups = group_by_index(window.into_entries());

        let results = join_all(groups.into_iter().map(|group| self.write_group(group))).await;
        let written: usize = results.into_iter().sum();

        self.metrics.record_window_dispatched();
        if written > 0 {
            debug!("Saved window {sequence}: {written} documents");
        }
        written
    }

    async fn write_group(&self, group: BulkGroup) -> usize {
        let count = group.len();
        let index = group.index.to_string();

        match self.bulk_write(group).await {
            Ok(()) => {
                self.metrics.record_bulk_success(count);
                count
            }
            Err(err) => {
                self.metrics.record_bulk_failure(count);
                error!(
                    "Failed to save {count} documents to index {index} ({}): {err}",
                    err.kind()
                );
                0
            }
        }
    }

    async fn bulk_write(&self, group: BulkGroup) -> Result<()> {
        let index = group.index.to_string();
        let response = self.backend.bulk(group.into_request()).await?;
        if response.has_failures() {
            return Err(SpillwayError::bulk_failure(index, response.failure_message()));
        }
        Ok(())
    }
}
