//! Translation of a [`QuerySpec`] into a backend query body.

use serde_json::{Map, Value, json};

use crate::error::{Result, SpillwayError};
use crate::query::metadata::{FieldKind, IndexMetadata};
use crate::query::spec::{QuerySpec, SortOrder, Term, TermType};

/// Pure translation from a query description to a backend query body.
///
/// Implementations must accept empty metadata.
pub trait QueryTranslator: Send + Sync {
    fn translate(&self, spec: &QuerySpec, metadata: &IndexMetadata) -> Result<Value>;
}

impl<F> QueryTranslator for F
where
    F: Fn(&QuerySpec, &IndexMetadata) -> Result<Value> + Send + Sync,
{
    fn translate(&self, spec: &QuerySpec, metadata: &IndexMetadata) -> Result<Value> {
        self(spec, metadata)
    }
}

/// Builds an Elasticsearch-style `bool` query.
///
/// Equality on known text fields becomes `match`, on anything else `term`.
/// Sorting maps to `sort` and paging to `from`/`size`; both are omitted when
/// the query does not ask for them, so count bodies carry only `query`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryTranslator;

impl DefaultQueryTranslator {
    pub fn new() -> Self {
        Self
    }

    fn clause(term: &Term, metadata: &IndexMetadata) -> Result<Value> {
        let column = term.column.as_str();
        let value = &term.value;

        let clause = match term.term_type {
            TermType::Eq | TermType::Not => match metadata.field(column) {
                Some(FieldKind::Text) => json!({ "match": { column: value } }),
                _ => json!({ "term": { column: value } }),
            },
            TermType::Like => {
                let pattern = value.as_str().ok_or_else(|| {
                    SpillwayError::malformed(format!("like on [{column}] requires a string"))
                })?;
                json!({ "wildcard": { column: pattern.replace('%', "*") } })
            }
            TermType::Gt => json!({ "range": { column: { "gt": value } } }),
            TermType::Gte => json!({ "range": { column: { "gte": value } } }),
            TermType::Lt => json!({ "range": { column: { "lt": value } } }),
            TermType::Lte => json!({ "range": { column: { "lte": value } } }),
            TermType::In => {
                let values = match value {
                    Value::Array(values) => values.clone(),
                    single => vec![single.clone()],
                };
                json!({ "terms": { column: values } })
            }
            TermType::Btw => match value.as_array().map(Vec::as_slice) {
                Some([low, high]) => json!({ "range": { column: { "gte": low, "lte": high } } }),
                _ => {
                    return Err(SpillwayError::malformed(format!(
                        "btw on [{column}] requires a two element array"
                    )));
                }
            },
        };
        Ok(clause)
    }
}

impl QueryTranslator for DefaultQueryTranslator {
    fn translate(&self, spec: &QuerySpec, metadata: &IndexMetadata) -> Result<Value> {
        let mut must = Vec::new();
        let mut must_not = Vec::new();
        for term in &spec.terms {
            let clause = Self::clause(term, metadata)?;
            if term.term_type == TermType::Not {
                must_not.push(clause);
            } else {
                must.push(clause);
            }
        }

        let query = if must.is_empty() && must_not.is_empty() {
            json!({ "match_all": {} })
        } else {
            json!({ "bool": { "must": must, "must_not": must_not } })
        };

        let mut body = Map::new();
        body.insert("query".to_string(), query);

        if !spec.sorts.is_empty() {
            let sorts: Vec<Value> = spec
                .sorts
                .iter()
                .map(|sort| {
                    let order = match sort.order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc",
                    };
                    json!({ sort.column.as_str(): { "order": order } })
                })
                .collect();
            body.insert("sort".to_string(), Value::Array(sorts));
        }

        if spec.paging {
            body.insert("from".to_string(), json!(spec.offset()));
            body.insert("size".to_string(), json!(spec.page_size));
        }

        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spec_matches_all() {
        let body = DefaultQueryTranslator
            .translate(&QuerySpec::new(), &IndexMetadata::empty("logs"))
            .unwrap();

        assert_eq!(
            body,
            json!({ "query": { "match_all": {} }, "from": 0, "size": 25 })
        );
    }

    #[test]
    fn test_terms_sorts_and_paging() {
        let metadata = IndexMetadata::empty("logs").with_field("message", FieldKind::Text);
        let spec = QuerySpec::new()
            .eq("message", json!("disk full"))
            .eq("level", json!("error"))
            .and("code", TermType::Not, json!(0))
            .and("ts", TermType::Btw, json!([1, 2]))
            .order_by("ts", SortOrder::Desc)
            .page(2, 10);

        let body = DefaultQueryTranslator.translate(&spec, &metadata).unwrap();

        assert_eq!(body["query"]["bool"]["must"][0], json!({"match": {"message": "disk full"}}));
        assert_eq!(body["query"]["bool"]["must"][1], json!({"term": {"level": "error"}}));
        assert_eq!(body["query"]["bool"]["must"][2], json!({"range": {"ts": {"gte": 1, "lte": 2}}}));
        assert_eq!(body["query"]["bool"]["must_not"][0], json!({"term": {"code": 0}}));
        assert_eq!(body["sort"], json!([{"ts": {"order": "desc"}}]));
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
    }

    #[test]
    fn test_count_body_has_no_paging() {
        let spec = QuerySpec::new()
            .order_by("ts", SortOrder::Asc)
            .page(1, 10)
            .for_count();
        let body = DefaultQueryTranslator
            .translate(&spec, &IndexMetadata::default())
            .unwrap();

        assert_eq!(body, json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn test_invalid_between_is_malformed() {
        let spec = QuerySpec::new().and("ts", TermType::Btw, json!(5));
        let err = DefaultQueryTranslator
            .translate(&spec, &IndexMetadata::default())
            .unwrap_err();
        assert!(matches!(err, SpillwayError::QueryMalformed(_)));
    }

    #[test]
    fn test_closure_translator() {
        let translator = |_: &QuerySpec, metadata: &IndexMetadata| -> Result<Value> {
            Ok(json!({ "index": metadata.index }))
        };
        let body = translator
            .translate(&QuerySpec::new(), &IndexMetadata::empty("logs"))
            .unwrap();
        assert_eq!(body, json!({ "index": "logs" }));
    }
}
