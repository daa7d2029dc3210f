//! JSON selector evaluation for rich queries.
//!
//! Supports the subset of the Mango selector language used by document
//! ledgers:
//!
//! - implicit equality: `{"docType": "segment"}`
//! - dotted field paths: `{"segment.link.meta.process": "p"}`
//! - nested sub-selectors: `{"segment": {"link": {...}}}`
//! - `$eq`, `$in` (value is one of) and `$all` (array contains every item)
//!
//! A query document carries the selector plus optional `limit` and `skip`.

use crate::error::{StorageError, StorageResult};
use serde_json::{Map, Value};

/// A parsed rich query.
#[derive(Debug, Clone, PartialEq)]
pub struct RichQuery {
    selector: Map<String, Value>,
    limit: Option<usize>,
    skip: usize,
}

impl RichQuery {
    /// Parses a query document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the document is not a JSON
    /// object, the selector is missing or not an object, an operator is
    /// unknown, or `limit`/`skip` are not non-negative integers.
    pub fn parse(query: &str) -> StorageResult<Self> {
        let document: Value = serde_json::from_str(query)
            .map_err(|e| StorageError::invalid_query(format!("query is not JSON: {e}")))?;
        let Value::Object(mut document) = document else {
            return Err(StorageError::invalid_query("query must be an object"));
        };

        let selector = match document.remove("selector") {
            Some(Value::Object(selector)) => selector,
            Some(_) => return Err(StorageError::invalid_query("selector must be an object")),
            None => return Err(StorageError::invalid_query("missing selector")),
        };
        check_selector(&selector)?;

        let limit = read_count(&document, "limit")?.filter(|&n| n > 0);
        let skip = read_count(&document, "skip")?.unwrap_or(0);

        Ok(Self {
            selector,
            limit,
            skip,
        })
    }

    /// Returns the maximum number of results, if bounded.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the number of leading matches to drop.
    #[must_use]
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Returns `true` if `document` satisfies every selector clause.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        selector_matches(&self.selector, document)
    }
}

fn read_count(document: &Map<String, Value>, field: &str) -> StorageResult<Option<usize>> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| StorageError::invalid_query(format!("{field} must be a non-negative integer"))),
    }
}

fn check_selector(selector: &Map<String, Value>) -> StorageResult<()> {
    for (field, condition) in selector {
        if field.starts_with('$') {
            return Err(StorageError::invalid_query(format!(
                "unsupported combination operator {field}"
            )));
        }
        if let Value::Object(clause) = condition {
            if is_operator_clause(clause) {
                for (op, operand) in clause {
                    match op.as_str() {
                        "$eq" => {}
                        "$in" | "$all" if operand.is_array() => {}
                        "$in" | "$all" => {
                            return Err(StorageError::invalid_query(format!(
                                "{op} expects an array"
                            )))
                        }
                        other => {
                            return Err(StorageError::invalid_query(format!(
                                "unsupported operator {other}"
                            )))
                        }
                    }
                }
            } else if clause.keys().any(|k| k.starts_with('$')) {
                return Err(StorageError::invalid_query(format!(
                    "field {field} mixes operators and sub-fields"
                )));
            } else {
                check_selector(clause)?;
            }
        }
    }
    Ok(())
}

fn is_operator_clause(clause: &Map<String, Value>) -> bool {
    !clause.is_empty() && clause.keys().all(|k| k.starts_with('$'))
}

fn selector_matches(selector: &Map<String, Value>, document: &Value) -> bool {
    selector.iter().all(|(field, condition)| {
        let Some(value) = lookup_path(document, field) else {
            return false;
        };
        match condition {
            Value::Object(clause) if is_operator_clause(clause) => clause
                .iter()
                .all(|(op, operand)| operator_matches(op, operand, value)),
            Value::Object(clause) if !clause.is_empty() => selector_matches(clause, value),
            _ => value == condition,
        }
    })
}

fn operator_matches(op: &str, operand: &Value, value: &Value) -> bool {
    match (op, operand) {
        ("$eq", expected) => value == expected,
        ("$in", Value::Array(candidates)) => candidates.iter().any(|c| c == value),
        ("$all", Value::Array(required)) => match value {
            Value::Array(items) => required.iter().all(|r| items.contains(r)),
            _ => false,
        },
        _ => false,
    }
}

fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "docType": "segment",
            "id": "abc",
            "segment": {
                "link": {
                    "meta": {
                        "process": "p1",
                        "mapId": "m1",
                        "tags": ["a", "b", "c"]
                    }
                }
            }
        })
    }

    #[test]
    fn equality_on_dotted_path() {
        let q = RichQuery::parse(r#"{"selector":{"docType":"segment","segment.link.meta.process":"p1"}}"#)
            .unwrap();
        assert!(q.matches(&doc()));

        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.process":"p2"}}"#).unwrap();
        assert!(!q.matches(&doc()));
    }

    #[test]
    fn nested_sub_selector() {
        let q = RichQuery::parse(r#"{"selector":{"segment":{"link":{"meta":{"mapId":"m1"}}}}}"#)
            .unwrap();
        assert!(q.matches(&doc()));
    }

    #[test]
    fn in_operator() {
        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.mapId":{"$in":["m0","m1"]}}}"#)
            .unwrap();
        assert!(q.matches(&doc()));

        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.mapId":{"$in":["m2"]}}}"#)
            .unwrap();
        assert!(!q.matches(&doc()));
    }

    #[test]
    fn all_operator_is_superset_test() {
        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.tags":{"$all":["c","a"]}}}"#)
            .unwrap();
        assert!(q.matches(&doc()));

        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.tags":{"$all":["a","z"]}}}"#)
            .unwrap();
        assert!(!q.matches(&doc()));
    }

    #[test]
    fn missing_field_never_matches() {
        let q = RichQuery::parse(r#"{"selector":{"segment.link.meta.prevLinkHash":"x"}}"#).unwrap();
        assert!(!q.matches(&doc()));
    }

    #[test]
    fn limit_and_skip() {
        let q = RichQuery::parse(r#"{"selector":{"docType":"map"},"limit":15,"skip":10}"#).unwrap();
        assert_eq!(q.limit(), Some(15));
        assert_eq!(q.skip(), 10);

        let q = RichQuery::parse(r#"{"selector":{"docType":"map"},"limit":0}"#).unwrap();
        assert_eq!(q.limit(), None);
        assert_eq!(q.skip(), 0);
    }

    #[test]
    fn rejects_malformed_queries() {
        assert!(RichQuery::parse("not json").is_err());
        assert!(RichQuery::parse("[]").is_err());
        assert!(RichQuery::parse(r#"{"limit":1}"#).is_err());
        assert!(RichQuery::parse(r#"{"selector":{"a":{"$regex":"x"}}}"#).is_err());
        assert!(RichQuery::parse(r#"{"selector":{"a":{"$in":"x"}}}"#).is_err());
        assert!(RichQuery::parse(r#"{"selector":{"$or":[]}}"#).is_err());
        assert!(RichQuery::parse(r#"{"selector":{},"limit":-1}"#).is_err());
    }
}
