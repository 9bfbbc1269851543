//! Construction of backend search and count requests.

use std::sync::Arc;

use log::{debug, error};

use crate::backend::{CountRequest, SearchRequest};
use crate::error::Result;
use crate::index::IndexRef;
use crate::query::metadata::{IndexMetadata, IndexMetadataProvider};
use crate::query::spec::QuerySpec;
use crate::query::translate::QueryTranslator;

/// Builds backend requests from a [`QuerySpec`] and index metadata.
///
/// Failures while fetching metadata or translating are logged and yield no
/// request; callers treat a missing request as an empty result.
#[derive(Clone)]
pub struct QueryPlanner {
    metadata: Arc<dyn IndexMetadataProvider>,
    translator: Arc<dyn QueryTranslator>,
}

impl QueryPlanner {
    pub fn new(
        metadata: Arc<dyn IndexMetadataProvider>,
        translator: Arc<dyn QueryTranslator>,
    ) -> Self {
        Self {
            metadata,
            translator,
        }
    }

    /// Build a search request addressed at the index and its type.
    pub async fn build_search(&self, spec: &QuerySpec, index: &IndexRef) -> Option<SearchRequest> {
        match self.try_build_search(spec, index).await {
            Ok(request) => {
                debug!("Search index {}: {}", index, request.body);
                Some(request)
            }
            Err(e) => {
                error!("Failed to build search request for index {index}: {e}");
                None
            }
        }
    }

    /// Build an index-wide count request, dropping paging and sorting.
    pub async fn build_count(&self, spec: &QuerySpec, index: &IndexRef) -> Option<CountRequest> {
        match self.try_build_count(spec, index).await {
            Ok(request) => {
                debug!("Count index {}: {}", index.name(), request.body);
                Some(request)
            }
            Err(e) => {
                error!("Failed to build count request for index {index}: {e}");
                None
            }
        }
    }

    pub async fn try_build_search(&self, spec: &QuerySpec, index: &IndexRef) -> Result<SearchRequest> {
        let metadata = self.resolve_metadata(index.name()).await?;
        let body = self.translator.translate(spec, &metadata)?;

        Ok(SearchRequest {
            index: index.name().to_string(),
            doc_type: index.doc_type().map(str::to_string),
            body,
        })
    }

    pub async fn try_build_count(&self, spec: &QuerySpec, index: &IndexRef) -> Result<CountRequest> {
        let count_spec = spec.for_count();
        let metadata = self.resolve_metadata(index.name()).await?;
        let body = self.translator.translate(&count_spec, &metadata)?;

        Ok(CountRequest {
            index: index.name().to_string(),
            body,
        })
    }

    async fn resolve_metadata(&self, index: &str) -> Result<IndexMetadata> {
        let metadata = self.metadata.get_metadata(index).await?;
        Ok(metadata.unwrap_or_else(|| IndexMetadata::empty(index)))
    }
}
