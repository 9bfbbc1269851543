//! Logical index addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a logical index plus an optional type discriminator.
///
/// Two references are the same bulk group when both parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexRef {
    /// Backend index name.
    pub index: String,

    /// Optional document type within the index.
    pub doc_type: Option<String>,
}

impl IndexRef {
    /// Create a reference to an untyped index.
    pub fn new<S: Into<String>>(index: S) -> Self {
        Self {
            index: index.into(),
            doc_type: None,
        }
    }

    /// Attach a type discriminator. Blank types are treated as absent.
    pub fn with_type<S: Into<String>>(mut self, doc_type: S) -> Self {
        let doc_type = doc_type.into();
        self.doc_type = if doc_type.trim().is_empty() {
            None
        } else {
            Some(doc_type)
        };
        self
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.index
    }

    /// Type discriminator, if any.
    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.doc_type {
            Some(doc_type) => write!(f, "{}/{}", self.index, doc_type),
            None => f.write_str(&self.index),
        }
    }
}

impl From<&str> for IndexRef {
    fn from(index: &str) -> Self {
        IndexRef::new(index)
    }
}

impl From<String> for IndexRef {
    fn from(index: String) -> Self {
        IndexRef::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_includes_type() {
        let a = IndexRef::new("events").with_type("device");
        let b = IndexRef::new("events").with_type("device");
        let c = IndexRef::new("events");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "events/device");
        assert_eq!(c.to_string(), "events");
    }

    #[test]
    fn test_blank_type_is_absent() {
        let index = IndexRef::new("events").with_type("  ");
        assert_eq!(index.doc_type(), None);
        assert_eq!(index, IndexRef::from("events"));
    }
}
