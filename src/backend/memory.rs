//! In-memory backend.
//!
//! Stores documents per index and answers every search with match-all
//! semantics, paged by the `from`/`size` keys of the query body. Used by
//! the command line driver and by tests that need a working backend.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::backend::{
    BackendError, BackendResult, BulkItemResponse, BulkRequest, BulkResponse, CountRequest,
    CountResponse, SearchBackend, SearchHit, SearchRequest, SearchResponse,
};

/// A document held by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub doc_type: Option<String>,
    pub source: Map<String, Value>,
}

/// Backend keeping all documents in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, Vec<StoredDocument>>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with no documents.
    pub fn create_index(&self, index: &str) {
        self.indices.write().entry(index.to_string()).or_default();
    }

    /// Make every bulk item addressed at `index` fail until cleared.
    pub fn fail_index(&self, index: &str) {
        self.failing.write().insert(index.to_string());
    }

    /// Stop injecting failures for `index`.
    pub fn clear_failure(&self, index: &str) {
        self.failing.write().remove(index);
    }

    /// Number of stored documents in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, Vec::len)
    }

    /// Snapshot of the documents stored in `index`, in write order.
    pub fn documents(&self, index: &str) -> Vec<StoredDocument> {
        self.indices.read().get(index).cloned().unwrap_or_default()
    }

    fn page_bounds(body: &Value) -> BackendResult<(usize, Option<usize>)> {
        let object = body
            .as_object()
            .ok_or_else(|| BackendError::bad_request("query body must be a JSON object"))?;

        let read = |key: &str| -> BackendResult<Option<usize>> {
            match object.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value
                    .as_u64()
                    .map(|n| Some(n as usize))
                    .ok_or_else(|| BackendError::bad_request(format!("[{key}] must be a number"))),
            }
        };

        Ok((read("from")?.unwrap_or(0), read("size")?))
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn search(&self, request: SearchRequest) -> BackendResult<SearchResponse> {
        let (from, size) = Self::page_bounds(&request.body)?;
        let indices = self.indices.read();
        let documents = indices.get(&request.index).ok_or_else(|| {
            BackendError::not_found(format!("no such index [{}]", request.index))
        })?;

        let matching: Vec<&StoredDocument> = documents
            .iter()
            .filter(|doc| match &request.doc_type {
                Some(doc_type) => doc.doc_type.as_ref() == Some(doc_type),
                None => true,
            })
            .collect();

        let hits = matching
            .iter()
            .skip(from)
            .take(size.unwrap_or(usize::MAX))
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                source: doc.source.clone(),
            })
            .collect();

        Ok(SearchResponse {
            total_hits: matching.len() as u64,
            hits,
        })
    }

    async fn count(&self, request: CountRequest) -> BackendResult<CountResponse> {
        if !request.body.is_object() {
            return Err(BackendError::bad_request("query body must be a JSON object"));
        }
        let indices = self.indices.read();
        let documents = indices.get(&request.index).ok_or_else(|| {
            BackendError::not_found(format!("no such index [{}]", request.index))
        })?;

        Ok(CountResponse {
            count: documents.len() as u64,
        })
    }

    async fn bulk(&self, request: BulkRequest) -> BackendResult<BulkResponse> {
        let failing = self.failing.read().contains(&request.index);
        let mut indices = self.indices.write();
        let documents = indices.entry(request.index.clone()).or_default();

        let items = request
            .operations
            .iter()
            .map(|operation| {
                if failing {
                    return BulkItemResponse::failed(format!(
                        "index [{}] rejected the write",
                        request.index
                    ));
                }
                match operation.to_value() {
                    Ok(Value::Object(source)) => {
                        let id = Uuid::new_v4().to_string();
                        documents.push(StoredDocument {
                            id: id.clone(),
                            doc_type: request.doc_type.clone(),
                            source,
                        });
                        BulkItemResponse::ok(id)
                    }
                    Ok(_) => BulkItemResponse::failed("document source must be a JSON object"),
                    Err(e) => BulkItemResponse::failed(format!("failed to parse source: {e}")),
                }
            })
            .collect();

        Ok(BulkResponse { items })
    }
}
