//! Backend collaborator interface.
//!
//! The search backend is an externally owned service reached through the
//! [`SearchBackend`] trait. Requests and responses are plain data so that
//! any wire client can adapt to them. Errors carry a status classification
//! that the query path uses to decide between "empty", "malformed" and
//! "unavailable".

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::DocumentSource;
use crate::error::SpillwayError;

/// Status classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendStatus {
    /// The addressed index (or resource) does not exist.
    NotFound,
    /// The request body was rejected.
    BadRequest,
    /// Any other failure, with the transport status code when one exists.
    Other(u16),
}

impl BackendStatus {
    /// Classify an HTTP-style status code.
    pub fn from_code(code: u16) -> Self {
        match code {
            404 => BackendStatus::NotFound,
            400 => BackendStatus::BadRequest,
            other => BackendStatus::Other(other),
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::NotFound => f.write_str("404 not found"),
            BackendStatus::BadRequest => f.write_str("400 bad request"),
            BackendStatus::Other(code) => write!(f, "status {code}"),
        }
    }
}

/// Failure reported by a backend call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status}: {message}")]
pub struct BackendError {
    pub status: BackendStatus,
    pub message: String,
}

impl BackendError {
    pub fn new<S: Into<String>>(status: BackendStatus, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(BackendStatus::NotFound, message)
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(BackendStatus::BadRequest, message)
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(BackendStatus::Other(503), message)
    }
}

impl From<BackendError> for SpillwayError {
    fn from(err: BackendError) -> Self {
        match err.status {
            BackendStatus::NotFound => SpillwayError::NotFound(err.message),
            BackendStatus::BadRequest => SpillwayError::QueryMalformed(err.message),
            BackendStatus::Other(_) => SpillwayError::BackendUnavailable(err.to_string()),
        }
    }
}

/// Result type for raw backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Search request addressed at one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    pub doc_type: Option<String>,
    pub body: Value,
}

/// Count request addressed at one index. Counts are index-wide, so no type
/// discriminator is carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRequest {
    pub index: String,
    pub body: Value,
}

/// One stored document returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Backend-assigned document identifier.
    pub id: String,
    /// Stored fields.
    pub source: Map<String, Value>,
}

/// Raw search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching documents, independent of paging.
    pub total_hits: u64,
    /// The returned page of hits.
    pub hits: Vec<SearchHit>,
}

/// Raw count response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// One bulk request per index: an ordered list of index operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub index: String,
    pub doc_type: Option<String>,
    pub operations: Vec<DocumentSource>,
}

impl BulkRequest {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Outcome of one operation inside a bulk request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResponse {
    /// Identifier assigned to the written document.
    pub id: Option<String>,
    /// Failure reason, if this item was rejected.
    pub failure: Option<String>,
}

impl BulkItemResponse {
    pub fn ok<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            failure: None,
        }
    }

    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self {
            id: None,
            failure: Some(reason.into()),
        }
    }
}

/// Raw bulk response, one item per operation in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub items: Vec<BulkItemResponse>,
}

impl BulkResponse {
    /// Whether any item failed.
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.failure.is_some())
    }

    /// Human-readable summary of the failed items.
    pub fn failure_message(&self) -> String {
        let mut message = String::from("failure in bulk execution:");
        for (position, item) in self.items.iter().enumerate() {
            if let Some(reason) = &item.failure {
                message.push_str(&format!("\n[{position}]: {reason}"));
            }
        }
        message
    }
}

/// Asynchronous document search backend.
///
/// Implementations are shared by every component and must not require
/// exclusive access; all calls take `&self`.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a search request.
    async fn search(&self, request: SearchRequest) -> BackendResult<SearchResponse>;

    /// Execute a count request.
    async fn count(&self, request: CountRequest) -> BackendResult<CountResponse>;

    /// Execute a bulk write.
    async fn bulk(&self, request: BulkRequest) -> BackendResult<BulkResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(BackendStatus::from_code(404), BackendStatus::NotFound);
        assert_eq!(BackendStatus::from_code(400), BackendStatus::BadRequest);
        assert_eq!(BackendStatus::from_code(500), BackendStatus::Other(500));
    }

    #[test]
    fn test_error_conversion() {
        let err: SpillwayError = BackendError::not_found("no such index [logs]").into();
        assert!(matches!(err, SpillwayError::NotFound(_)));

        let err: SpillwayError = BackendError::bad_request("failed to parse").into();
        assert!(matches!(err, SpillwayError::QueryMalformed(_)));

        let err: SpillwayError = BackendError::unavailable("connection refused").into();
        assert!(matches!(err, SpillwayError::BackendUnavailable(_)));
    }

    #[test]
    fn test_bulk_failure_message() {
        let response = BulkResponse {
            items: vec![
                BulkItemResponse::ok("a"),
                BulkItemResponse::failed("mapper_parsing_exception"),
            ],
        };

        assert!(response.has_failures());
        assert_eq!(
            response.failure_message(),
            "failure in bulk execution:\n[1]: mapper_parsing_exception"
        );
        assert!(!BulkResponse::default().has_failures());
    }
}
