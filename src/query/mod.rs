//! Query path: request planning and response translation.
//!
//! - [`spec`]: the backend-agnostic [`QuerySpec`](spec::QuerySpec)
//! - [`metadata`]: index schema metadata and its provider
//! - [`translate`]: query spec to backend query body
//! - [`planner`]: search and count request construction
//! - [`response`]: hits to typed records, pages and counts
//! - [`stats`]: outcome counters for the fail-safe facade

pub mod metadata;
pub mod planner;
pub mod response;
pub mod spec;
pub mod stats;
pub mod translate;

pub use metadata::{FieldKind, IndexMetadata, IndexMetadataProvider, StaticMetadataProvider};
pub use planner::QueryPlanner;
pub use response::{PageResult, ResponseTranslator, reclassify};
pub use spec::{QuerySpec, Sort, SortOrder, Term, TermType};
pub use stats::{QueryOperation, QueryOutcome, QueryStats};
pub use translate::{DefaultQueryTranslator, QueryTranslator};
