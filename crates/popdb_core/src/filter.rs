//! Filter parsing.
//!
//! Clients describe what they want as a URL query string:
//!
//! ```text
//! process=<str>&offset=<uint>&limit=<uint>&mapIds[]=<id>&mapIds[]=<id>
//!     &prevLinkHash=<64 hex chars>&tags[]=<t>&tags[]=<t>
//! ```
//!
//! Every parameter is optional. Array parameters may be repeated and are
//! accepted both as `mapIds[]` and as the still-encoded `mapIds%5B%5D`
//! (which is what a client that encodes the brackets twice ends up
//! sending); both spellings merge into one list in order of first
//! appearance. Unknown parameters are ignored.

use crate::error::{CoreError, CoreResult, FilterTarget};
use crate::segment::LinkHash;
use percent_encoding::percent_decode_str;

/// Offset and limit applied to a result set.
///
/// A zero limit means "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of leading results to skip.
    pub offset: usize,
    /// Maximum number of results, or zero for unbounded.
    pub limit: usize,
}

impl Pagination {
    /// Creates a pagination window.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Returns the limit, or `None` when unbounded.
    #[must_use]
    pub const fn max_results(&self) -> Option<usize> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit)
        }
    }

    fn parse(params: &QueryParams, target: FilterTarget) -> CoreResult<Self> {
        Ok(Self {
            offset: parse_count(params, "offset", target)?,
            limit: parse_count(params, "limit", target)?,
        })
    }
}

/// A typed segment filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFilter {
    /// Only segments of this process.
    pub process: Option<String>,
    /// Only segments whose map id is one of these. Empty means any.
    pub map_ids: Vec<String>,
    /// Only segments carrying every one of these tags. Empty means any.
    pub tags: Vec<String>,
    /// Only direct children of this segment.
    pub prev_link_hash: Option<LinkHash>,
    /// Result window.
    pub pagination: Pagination,
}

impl SegmentFilter {
    /// Parses a segment filter query string.
    ///
    /// # Errors
    ///
    /// Returns a [`CoreError::FilterFormat`] for segment filters if the query
    /// string is malformed, `offset`/`limit` are not non-negative integers,
    /// or `prevLinkHash` is not 32 hex-encoded bytes.
    pub fn parse(query: &str) -> CoreResult<Self> {
        let target = FilterTarget::Segment;
        let params = QueryParams::parse(query, target)?;

        let prev_link_hash = match params.first("prevLinkHash") {
            Some(hex) => Some(LinkHash::from_hex(hex).ok_or_else(|| {
                CoreError::segment_filter(format!("prevLinkHash {hex:?} is not a link hash"))
            })?),
            None => None,
        };

        Ok(Self {
            process: params.first("process").map(str::to_string),
            map_ids: params.array("mapIds"),
            tags: params.array("tags"),
            prev_link_hash,
            pagination: Pagination::parse(&params, target)?,
        })
    }

    /// Creates an empty filter that matches every segment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to a process.
    #[must_use]
    pub fn process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Adds an accepted map id.
    #[must_use]
    pub fn map_id(mut self, map_id: impl Into<String>) -> Self {
        push_unique(&mut self.map_ids, map_id.into());
        self
    }

    /// Adds a required tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.tags, tag.into());
        self
    }

    /// Restricts the filter to children of `parent`.
    #[must_use]
    pub fn prev_link_hash(mut self, parent: LinkHash) -> Self {
        self.prev_link_hash = Some(parent);
        self
    }

    /// Sets the result window.
    #[must_use]
    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.pagination = Pagination::new(offset, limit);
        self
    }
}

/// A typed map filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapFilter {
    /// Only maps of this process.
    pub process: Option<String>,
    /// Result window.
    pub pagination: Pagination,
}

impl MapFilter {
    /// Parses a map filter query string.
    ///
    /// # Errors
    ///
    /// Returns a [`CoreError::FilterFormat`] for map filters if the query
    /// string is malformed or `offset`/`limit` are not non-negative integers.
    pub fn parse(query: &str) -> CoreResult<Self> {
        let target = FilterTarget::Map;
        let params = QueryParams::parse(query, target)?;
        Ok(Self {
            process: params.first("process").map(str::to_string),
            pagination: Pagination::parse(&params, target)?,
        })
    }

    /// Creates an empty filter that matches every map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to a process.
    #[must_use]
    pub fn process(mut self, process: impl Into<String>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Sets the result window.
    #[must_use]
    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.pagination = Pagination::new(offset, limit);
        self
    }
}

/// Decoded query-string pairs in their original order.
struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    fn parse(query: &str, target: FilterTarget) -> CoreResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut pairs = Vec::new();

        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            pairs.push((decode(key, target)?, decode(value, target)?));
        }

        Ok(Self { pairs })
    }

    /// Returns the first value of a scalar parameter; empty counts as absent.
    fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Collects the non-empty values of an array parameter from both
    /// bracket spellings.
    fn array(&self, name: &str) -> Vec<String> {
        let mut values = Vec::new();
        for (key, value) in &self.pairs {
            if !value.is_empty() && is_array_key(key, name) {
                push_unique(&mut values, value.clone());
            }
        }
        values
    }
}

fn is_array_key(key: &str, name: &str) -> bool {
    match key.strip_prefix(name) {
        Some(suffix) => suffix == "[]" || suffix.eq_ignore_ascii_case("%5B%5D"),
        None => false,
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn decode(component: &str, target: FilterTarget) -> CoreResult<String> {
    let bytes = component.as_bytes();
    for (i, _) in component.match_indices('%') {
        let valid = bytes.len() > i + 2
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if !valid {
            return Err(filter_error(target, format!("invalid escape in {component:?}")));
        }
    }

    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| filter_error(target, format!("{component:?} is not UTF-8 once decoded")))
}

fn parse_count(params: &QueryParams, name: &str, target: FilterTarget) -> CoreResult<usize> {
    match params.first(name) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| filter_error(target, format!("{name} {raw:?} is not a non-negative integer"))),
    }
}

fn filter_error(target: FilterTarget, reason: String) -> CoreError {
    match target {
        FilterTarget::Segment => CoreError::segment_filter(reason),
        FilterTarget::Map => CoreError::map_filter(reason),
    }
}
