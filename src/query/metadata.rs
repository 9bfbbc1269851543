//! Index schema metadata and its provider.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Mapping type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Keyword,
    Text,
    Long,
    Integer,
    Double,
    Float,
    Boolean,
    Date,
    Object,
}

/// Schema description for one index.
///
/// An empty instance (no fields) is valid and means "nothing is known";
/// translation proceeds best-effort with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub index: String,
    pub fields: HashMap<String, FieldKind>,
}

impl IndexMetadata {
    /// Metadata with no known fields.
    pub fn empty<S: Into<String>>(index: S) -> Self {
        Self {
            index: index.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field<S: Into<String>>(mut self, name: S, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    pub fn field(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Source of index metadata.
#[async_trait]
pub trait IndexMetadataProvider: Send + Sync {
    /// Fetch metadata for `index`, `None` when nothing is known about it.
    async fn get_metadata(&self, index: &str) -> Result<Option<IndexMetadata>>;
}

/// Provider backed by an in-process map.
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    entries: RwLock<HashMap<String, IndexMetadata>>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the metadata of an index.
    pub fn register(&self, metadata: IndexMetadata) {
        self.entries.write().insert(metadata.index.clone(), metadata);
    }
}

#[async_trait]
impl IndexMetadataProvider for StaticMetadataProvider {
    async fn get_metadata(&self, index: &str) -> Result<Option<IndexMetadata>> {
        Ok(self.entries.read().get(index).cloned())
    }
}
