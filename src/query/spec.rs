//! Backend-agnostic filter, sort and paging description.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Term`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermType {
    Eq,
    Not,
    Like,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Btw,
}

/// One filter condition. All terms of a [`QuerySpec`] must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub column: String,
    #[serde(rename = "type")]
    pub term_type: TermType,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

/// Caller-supplied query description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub terms: Vec<Term>,
    pub sorts: Vec<Sort>,
    /// Whether `page_index`/`page_size` apply.
    pub paging: bool,
    /// Zero-based page number.
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            sorts: Vec::new(),
            paging: true,
            page_index: 0,
            page_size: 25,
        }
    }
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition.
    pub fn and<S: Into<String>>(mut self, column: S, term_type: TermType, value: Value) -> Self {
        self.terms.push(Term {
            column: column.into(),
            term_type,
            value,
        });
        self
    }

    /// Add an equality condition.
    pub fn eq<S: Into<String>>(self, column: S, value: Value) -> Self {
        self.and(column, TermType::Eq, value)
    }

    pub fn order_by<S: Into<String>>(mut self, column: S, order: SortOrder) -> Self {
        self.sorts.push(Sort {
            column: column.into(),
            order,
        });
        self
    }

    /// Request one page.
    pub fn page(mut self, page_index: usize, page_size: usize) -> Self {
        self.paging = true;
        self.page_index = page_index;
        self.page_size = page_size;
        self
    }

    /// Request every match.
    pub fn no_paging(mut self) -> Self {
        self.paging = false;
        self
    }

    /// Offset of the first requested hit.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// The same filter without paging and sorting, which a count ignores.
    pub fn for_count(&self) -> QuerySpec {
        let mut spec = self.clone();
        spec.paging = false;
        spec.sorts.clear();
        spec
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_for_count_clears_paging_and_sorts() {
        let spec = QuerySpec::new()
            .eq("device", json!("d1"))
            .order_by("timestamp", SortOrder::Desc)
            .page(3, 10);

        let count = spec.for_count();
        assert!(!count.paging);
        assert!(count.sorts.is_empty());
        assert_eq!(count.terms, spec.terms);

        // The original is untouched.
        assert!(spec.paging);
        assert_eq!(spec.sorts.len(), 1);
        assert_eq!(spec.offset(), 30);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let spec: QuerySpec =
            serde_json::from_value(json!({"terms": [{"column": "a", "type": "gte", "value": 3}]}))
                .unwrap();

        assert_eq!(spec.terms[0].term_type, TermType::Gte);
        assert!(spec.paging);
        assert_eq!(spec.page_size, 25);
    }
}
