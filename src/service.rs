//! Public facade over the commit pipeline and the query path.
//!
//! Commits are buffered and written in bulk by the [`CommitPipeline`].
//! Queries go straight to the backend and never return an error: every
//! failure is logged, counted and replaced by a safe default (an empty
//! page, an empty list or zero).

use std::sync::Arc;

use futures::Stream;
use log::{debug, error};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::SearchBackend;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::index::IndexRef;
use crate::pipeline::CommitPipeline;
use crate::pipeline::metrics::PipelineStats;
use crate::query::metadata::IndexMetadataProvider;
use crate::query::planner::QueryPlanner;
use crate::query::response::{PageResult, ResponseTranslator, reclassify};
use crate::query::spec::QuerySpec;
use crate::query::stats::{QueryMetrics, QueryOperation, QueryOutcome, QueryStats};
use crate::query::translate::QueryTranslator;

/// Buffered writes and fail-safe reads against one search backend.
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    planner: QueryPlanner,
    pipeline: CommitPipeline,
    query_metrics: QueryMetrics,
}

impl SearchService {
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn SearchBackend>,
        metadata: Arc<dyn IndexMetadataProvider>,
        translator: Arc<dyn QueryTranslator>,
    ) -> Result<Self> {
        let pipeline = CommitPipeline::new(config, backend.clone())?;
        Ok(Self {
            backend,
            planner: QueryPlanner::new(metadata, translator),
            pipeline,
            query_metrics: QueryMetrics::new(),
        })
    }

    /// Start background processing of commits. Idempotent.
    pub fn init(&self) {
        self.pipeline.init();
    }

    /// Stop accepting commits and wait for buffered ones to drain.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }

    /// Buffer one document for `index`.
    pub fn commit<T>(&self, index: impl Into<IndexRef>, payload: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.pipeline.commit(index, payload)
    }

    /// Buffer every document of a collection.
    pub fn commit_all<I>(&self, index: impl Into<IndexRef>, payloads: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        self.pipeline.commit_all(index, payloads)
    }

    /// Forward every element of a stream as an individual commit.
    pub async fn commit_stream<S>(&self, index: impl Into<IndexRef>, stream: S) -> Result<usize>
    where
        S: Stream,
        S::Item: Serialize,
    {
        self.pipeline.commit_stream(index, stream).await
    }

    /// Fetch one page of records. Never fails; see the module docs.
    pub async fn query_page<T: DeserializeOwned>(
        &self,
        index: &IndexRef,
        spec: &QuerySpec,
    ) -> PageResult<T> {
        let result = self.try_query_page(index, spec).await;
        self.or_default(QueryOperation::QueryPage, index, result)
    }

    /// Fetch every record the query selects. Never fails.
    pub async fn query<T: DeserializeOwned>(&self, index: &IndexRef, spec: &QuerySpec) -> Vec<T> {
        let result = self.try_query(index, spec).await;
        self.or_default(QueryOperation::Query, index, result)
    }

    /// Count the documents the query selects. Never fails.
    pub async fn count(&self, index: &IndexRef, spec: &QuerySpec) -> u64 {
        let result = self.try_count(index, spec).await;
        self.or_default(QueryOperation::Count, index, result)
    }

    pub fn pipeline(&self) -> &CommitPipeline {
        &self.pipeline
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    pub fn query_stats(&self) -> QueryStats {
        self.query_metrics.snapshot()
    }

    async fn try_query_page<T: DeserializeOwned>(
        &self,
        index: &IndexRef,
        spec: &QuerySpec,
    ) -> Result<Option<PageResult<T>>> {
        let request = self.planner.try_build_search(spec, index).await?;
        match reclassify(self.backend.search(request).await)? {
            Some(response) => Ok(Some(ResponseTranslator::to_page(response, spec)?)),
            None => Ok(None),
        }
    }

    async fn try_query<T: DeserializeOwned>(
        &self,
        index: &IndexRef,
        spec: &QuerySpec,
    ) -> Result<Option<Vec<T>>> {
        let request = self.planner.try_build_search(spec, index).await?;
        match reclassify(self.backend.search(request).await)? {
            Some(response) => Ok(Some(ResponseTranslator::to_list(response)?)),
            None => Ok(None),
        }
    }

    async fn try_count(&self, index: &IndexRef, spec: &QuerySpec) -> Result<Option<u64>> {
        let request = self.planner.try_build_count(spec, index).await?;
        Ok(reclassify(self.backend.count(request).await)?.map(ResponseTranslator::to_count))
    }

    /// The single place where query results are settled into safe defaults.
    fn or_default<R: Default>(
        &self,
        operation: QueryOperation,
        index: &IndexRef,
        result: Result<Option<R>>,
    ) -> R {
        match result {
            Ok(Some(value)) => {
                self.query_metrics.record(QueryOutcome::Answered);
                value
            }
            Ok(None) => {
                self.query_metrics.record(QueryOutcome::Empty);
                debug!("{operation} on index {index} returned nothing, using empty result");
                R::default()
            }
            Err(e) => {
                self.query_metrics.record(QueryOutcome::Failed(e.kind()));
                error!("{operation} on index {index} failed ({}): {e}", e.kind());
                R::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::query::metadata::StaticMetadataProvider;
    use crate::query::translate::DefaultQueryTranslator;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        id: String,
        n: u64,
    }

    fn service() -> (SearchService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let service = SearchService::new(
            PipelineConfig::default(),
            backend.clone(),
            Arc::new(StaticMetadataProvider::new()),
            Arc::new(DefaultQueryTranslator),
        )
        .unwrap();
        (service, backend)
    }

    #[tokio::test]
    async fn test_commit_then_query() {
        let (service, _backend) = service();
        service.init();
        service
            .commit_all("readings", (0..12).map(|n| json!({ "n": n })))
            .unwrap();
        service.shutdown().await;

        let index = IndexRef::new("readings");
        let page: PageResult<Reading> = service
            .query_page(&index, &QuerySpec::new().page(1, 5))
            .await;
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].n, 5);

        let all: Vec<Reading> = service.query(&index, &QuerySpec::new().no_paging()).await;
        assert_eq!(all.len(), 12);
        assert_eq!(service.count(&index, &QuerySpec::new()).await, 12);

        let stats = service.query_stats();
        assert_eq!(stats.answered, 3);
        assert_eq!(stats.failures(), 0);
    }

    #[tokio::test]
    async fn test_missing_index_returns_defaults() {
        let (service, _backend) = service();
        let index = IndexRef::new("missing");

        let page: PageResult<Reading> = service.query_page(&index, &QuerySpec::new()).await;
        assert_eq!(page, PageResult::empty());
        let all: Vec<Reading> = service.query(&index, &QuerySpec::new()).await;
        assert!(all.is_empty());
        assert_eq!(service.count(&index, &QuerySpec::new()).await, 0);

        let stats = service.query_stats();
        assert_eq!(stats.empty, 3);
        assert_eq!(stats.failures(), 0);
    }

    #[tokio::test]
    async fn test_undeserializable_hits_return_default() {
        let (service, backend) = service();
        backend.create_index("readings");
        service.commit("readings", &json!({"n": "not a number"})).unwrap();
        service.shutdown().await;

        let index = IndexRef::new("readings");
        let all: Vec<Reading> = service.query(&index, &QuerySpec::new()).await;
        assert!(all.is_empty());
        assert_eq!(service.query_stats().backend_errors, 1);
    }

    #[tokio::test]
    async fn test_untranslatable_query_is_counted_as_malformed() {
        let (service, backend) = service();
        backend.create_index("logs");
        let index = IndexRef::new("logs");
        let spec = QuerySpec::new().and("ts", crate::query::spec::TermType::Btw, json!(5));

        let all: Vec<Reading> = service.query(&index, &spec).await;
        assert!(all.is_empty());

        let stats = service.query_stats();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.empty, 0);
    }
}
