//! # Spillway
//!
//! A write-buffering commit pipeline and a fail-safe query facade for
//! document search backends.
//!
//! ## Features
//!
//! - Commits are grouped into windows closed by size or age
//! - One bulk request per index per window
//! - Bounded pending queue that drops the oldest window under backpressure
//! - Queries that log and fall back to empty results instead of failing
//! - Pluggable backend, metadata and query translation collaborators
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use spillway::prelude::*;
//!
//! # async fn run() -> spillway::error::Result<()> {
//! let service = SearchService::new(
//!     PipelineConfig::default(),
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(StaticMetadataProvider::new()),
//!     Arc::new(DefaultQueryTranslator),
//! )?;
//! service.init();
//!
//! service.commit("events", &json!({"kind": "click"}))?;
//! service.shutdown().await;
//!
//! let total = service.count(&IndexRef::new("events"), &QuerySpec::new()).await;
//! # let _ = total;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod query;
pub mod service;

pub mod prelude {
    pub use crate::backend::memory::MemoryBackend;
    pub use crate::backend::{BackendError, BackendStatus, SearchBackend};
    pub use crate::config::PipelineConfig;
    pub use crate::error::{ErrorKind, Result, SpillwayError};
    pub use crate::index::IndexRef;
    pub use crate::pipeline::CommitPipeline;
    pub use crate::pipeline::metrics::PipelineStats;
    pub use crate::query::{
        DefaultQueryTranslator, IndexMetadata, IndexMetadataProvider, PageResult, QuerySpec,
        QueryStats, QueryTranslator, SortOrder, StaticMetadataProvider, TermType,
    };
    pub use crate::service::SearchService;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
