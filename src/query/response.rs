//! Translation of raw backend responses into caller-facing results.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{BackendResult, CountResponse, SearchHit, SearchResponse};
use crate::error::{Result, SpillwayError};
use crate::query::spec::QuerySpec;

/// One page of typed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// Total matching documents reported by the backend, not `items.len()`.
    pub total: u64,
    pub items: Vec<T>,
    /// The query this page answers, absent on the empty fallback page.
    pub query: Option<QuerySpec>,
}

impl<T> PageResult<T> {
    pub fn of(total: u64, items: Vec<T>, query: QuerySpec) -> Self {
        Self {
            total,
            items,
            query: Some(query),
        }
    }

    pub fn empty() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
            query: None,
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Map a raw backend result onto the error taxonomy.
///
/// A missing index is an expected state and becomes `Ok(None)`. A rejected
/// body becomes [`SpillwayError::QueryMalformed`], anything else
/// [`SpillwayError::BackendUnavailable`].
pub fn reclassify<T>(result: BackendResult<T>) -> Result<Option<T>> {
    match result {
        Ok(response) => Ok(Some(response)),
        Err(err) => match SpillwayError::from(err) {
            SpillwayError::NotFound(_) => Ok(None),
            other => Err(other),
        },
    }
}

/// Converts hits and counts into caller-typed values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTranslator;

impl ResponseTranslator {
    /// Convert one hit. The backend identifier is written to `id`,
    /// replacing any stored `id` field.
    pub fn to_record<T: DeserializeOwned>(hit: SearchHit) -> Result<T> {
        let mut source = hit.source;
        source.insert("id".to_string(), Value::String(hit.id));
        Ok(serde_json::from_value(Value::Object(source))?)
    }

    /// Convert every hit, in response order.
    pub fn to_list<T: DeserializeOwned>(response: SearchResponse) -> Result<Vec<T>> {
        response.hits.into_iter().map(Self::to_record).collect()
    }

    /// Convert a response into a page carrying the backend's total hit count.
    pub fn to_page<T: DeserializeOwned>(
        response: SearchResponse,
        spec: &QuerySpec,
    ) -> Result<PageResult<T>> {
        let total = response.total_hits;
        let items = Self::to_list(response)?;
        Ok(PageResult::of(total, items, spec.clone()))
    }

    pub fn to_count(response: CountResponse) -> u64 {
        response.count
    }
}
