//! Query compilation.
//!
//! Typed filters compile to one of two backend shapes:
//!
//! - a [`ScanPlan`]: a composite-key prefix range plus pagination, for
//!   ledgers that only offer ordered range scans;
//! - a selector document, for ledgers with a JSON document query engine.
//!
//! Prefix ranges can only express "all", "by process", "by map" and "by
//! process and map". Filters that need anything else are rejected with
//! [`CoreError::UnsupportedFilter`] rather than silently widened.
//!
//! Selector documents are serialized from structs, so field order is fixed
//! and identical filters always compile to identical strings. Absent
//! predicates are left out entirely: an empty `mapIds` list never becomes
//! `{"$in": []}`, which would match nothing.

use crate::error::{CoreError, CoreResult};
use crate::filter::{MapFilter, Pagination, SegmentFilter};
use crate::keyspace::{self, KeyRange};
use crate::types::ObjectType;
use serde::Serialize;

/// Name used when the composite-key compiler rejects a filter.
pub const COMPOSITE_KEY_BACKEND: &str = "composite-key";

/// An ordered range scan with a result window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    /// Keys to scan.
    pub range: KeyRange,
    /// Window applied while walking the range.
    pub pagination: Pagination,
}

/// Compiles a segment filter into a prefix scan.
///
/// A map id without a process scans the by-map copies, which hold the
/// segments of that map in every process.
///
/// # Errors
///
/// Returns [`CoreError::UnsupportedFilter`] if the filter uses `tags`,
/// `prevLinkHash` or more than one map id.
pub fn compile_segment_scan(filter: &SegmentFilter) -> CoreResult<ScanPlan> {
    if !filter.tags.is_empty() {
        return Err(CoreError::unsupported_filter("tags", COMPOSITE_KEY_BACKEND));
    }
    if filter.prev_link_hash.is_some() {
        return Err(CoreError::unsupported_filter("prevLinkHash", COMPOSITE_KEY_BACKEND));
    }
    if filter.map_ids.len() > 1 {
        return Err(CoreError::unsupported_filter("mapIds", COMPOSITE_KEY_BACKEND));
    }

    let prefix = match (filter.process.as_deref(), filter.map_ids.first()) {
        (process, None) => keyspace::segment_prefix(process, None),
        (Some(process), Some(map_id)) => keyspace::segment_prefix(Some(process), Some(map_id)),
        (None, Some(map_id)) => keyspace::map_segment_prefix(map_id),
    };

    Ok(ScanPlan {
        range: prefix.prefix_range(),
        pagination: filter.pagination,
    })
}

/// Compiles a map filter into a prefix scan.
///
/// With a process, the scan walks that process's map markers. Without one
/// it walks the global lookup, which holds each map id once.
pub fn compile_map_scan(filter: &MapFilter) -> ScanPlan {
    let prefix = match filter.process.as_deref() {
        Some(process) => keyspace::map_prefix(Some(process)),
        None => keyspace::map_owner_prefix(),
    };
    ScanPlan {
        range: prefix.prefix_range(),
        pagination: filter.pagination,
    }
}

#[derive(Debug, Serialize)]
struct Query<S> {
    selector: S,
    #[serde(skip_serializing_if = "is_zero")]
    limit: usize,
    #[serde(skip_serializing_if = "is_zero")]
    skip: usize,
}

impl<S> Query<S> {
    fn new(selector: S, pagination: Pagination) -> Self {
        Self {
            selector,
            limit: pagination.limit,
            skip: pagination.offset,
        }
    }
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Serialize)]
struct SegmentSelector<'a> {
    #[serde(rename = "docType")]
    doc_type: &'static str,
    #[serde(rename = "segment.link.meta.process", skip_serializing_if = "Option::is_none")]
    process: Option<&'a str>,
    #[serde(rename = "segment.link.meta.mapId", skip_serializing_if = "Option::is_none")]
    map_ids: Option<In<'a>>,
    #[serde(rename = "segment.link.meta.tags", skip_serializing_if = "Option::is_none")]
    tags: Option<All<'a>>,
    #[serde(rename = "segment.link.meta.prevLinkHash", skip_serializing_if = "Option::is_none")]
    prev_link_hash: Option<String>,
}

/// Field value is one of the listed values.
#[derive(Debug, Serialize)]
struct In<'a> {
    #[serde(rename = "$in")]
    values: &'a [String],
}

/// Field array contains every listed value.
#[derive(Debug, Serialize)]
struct All<'a> {
    #[serde(rename = "$all")]
    values: &'a [String],
}

#[derive(Debug, Serialize)]
struct MapSelector<'a> {
    #[serde(rename = "docType")]
    doc_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    process: Option<&'a str>,
}

fn non_empty(values: &[String]) -> Option<&[String]> {
    (!values.is_empty()).then_some(values)
}

/// Compiles a segment filter into a selector query document.
///
/// Every supplied predicate must hold (conjunction).
///
/// # Errors
///
/// Returns an error if the query cannot be serialized.
pub fn compile_segment_selector(filter: &SegmentFilter) -> CoreResult<String> {
    let selector = SegmentSelector {
        doc_type: ObjectType::Segment.as_str(),
        process: filter.process.as_deref(),
        map_ids: non_empty(&filter.map_ids).map(|values| In { values }),
        tags: non_empty(&filter.tags).map(|values| All { values }),
        prev_link_hash: filter.prev_link_hash.map(|hash| hash.to_hex()),
    };
    Ok(serde_json::to_string(&Query::new(selector, filter.pagination))?)
}

/// Compiles a map filter into a selector query document.
///
/// With a process it selects that process's map markers. Without one it
/// selects the global lookup documents, one per map id.
///
/// # Errors
///
/// Returns an error if the query cannot be serialized.
pub fn compile_map_selector(filter: &MapFilter) -> CoreResult<String> {
    let doc_type = match filter.process {
        Some(_) => ObjectType::Map,
        None => ObjectType::MapOwner,
    };
    let selector = MapSelector {
        doc_type: doc_type.as_str(),
        process: filter.process.as_deref(),
    };
    Ok(serde_json::to_string(&Query::new(selector, filter.pagination))?)
}
