//! Segments: hash-linked records.
//!
//! A segment is a JSON document of the form:
//!
//! ```text
//! {
//!   "link": {
//!     "state": { ... },
//!     "meta": {
//!       "process": "<process>",
//!       "mapId": "<map id>",
//!       "prevLinkHash": "<64 hex chars>",   // absent or empty for genesis
//!       "tags": ["<tag>", ...]
//!     }
//!   },
//!   "meta": { "linkHash": "<64 hex chars>", ... }
//! }
//! ```
//!
//! `meta.linkHash` is the SHA-256 of the canonical JSON of `link`. Stored
//! and returned segments are always in canonical form (sorted keys, no
//! whitespace), so a segment read back is byte-identical to the canonical
//! serialization of the one written.

mod builder;
mod canonical;
mod link_hash;
mod validate;

pub use builder::SegmentBuilder;
pub use canonical::{object_to_canonical_vec, to_canonical_vec};
pub use link_hash::{LinkHash, ParseLinkHashError, LINK_HASH_SIZE};
pub use validate::LinkMeta;

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};

/// A parsed, not yet validated, segment document.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    document: Map<String, Value>,
}

impl Segment {
    /// Parses segment bytes.
    ///
    /// Only the document shape is checked here: the bytes must be a JSON
    /// object whose `link` and `meta` members, when present, are objects.
    /// Everything else is left to [`Segment::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if the bytes are not such a document.
    pub fn parse(raw: &[u8]) -> CoreResult<Self> {
        let value: Value = serde_json::from_slice(raw).map_err(|_| CoreError::Parse)?;
        Self::from_value(value)
    }

    /// Wraps an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if the value does not have the shape of
    /// a segment document.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(document) = value else {
            return Err(CoreError::Parse);
        };
        for member in ["link", "meta"] {
            if matches!(document.get(member), Some(v) if !v.is_object()) {
                return Err(CoreError::Parse);
            }
        }
        Ok(Self { document })
    }

    /// Returns the raw document.
    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Returns the `link` object, if present.
    #[must_use]
    pub fn link(&self) -> Option<&Map<String, Value>> {
        self.document.get("link").and_then(Value::as_object)
    }

    /// Returns the `meta` object, if present.
    #[must_use]
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.document.get("meta").and_then(Value::as_object)
    }

    /// Computes the link hash from the current `link` contents.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the segment has no link.
    pub fn compute_link_hash(&self) -> CoreResult<LinkHash> {
        let link = self
            .document
            .get("link")
            .ok_or_else(|| CoreError::validation("link should be an object"))?;
        Ok(LinkHash::digest(&to_canonical_vec(link)?))
    }

    /// Serializes the segment in canonical form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_canonical_bytes(&self) -> CoreResult<Vec<u8>> {
        object_to_canonical_vec(&self.document)
    }

    /// Consumes the segment and returns the document as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_rejects_non_documents() {
        for raw in ["", "   ", "not json", "[]", "42", "\"s\"", r#"{"link":1}"#, r#"{"meta":[]}"#] {
            assert!(matches!(Segment::parse(raw.as_bytes()), Err(CoreError::Parse)), "{raw:?}");
        }
    }

    #[test]
    fn parse_accepts_incomplete_documents() {
        // Missing members are a validation concern, not a parse failure.
        let segment = Segment::parse(b"{}").unwrap();
        assert!(segment.link().is_none());
        assert!(segment.meta().is_none());
    }

    #[test]
    fn canonical_bytes_sort_keys() {
        let segment = Segment::parse(br#"{ "meta": {"linkHash": "x"}, "link": {"state": {"b": 1, "a": 2}} }"#)
            .unwrap();
        assert_eq!(
            segment.to_canonical_bytes().unwrap(),
            br#"{"link":{"state":{"a":2,"b":1}},"meta":{"linkHash":"x"}}"#.to_vec()
        );
    }

    #[test]
    fn canonical_bytes_match_canonical_value() {
        let value = json!({"meta": {"linkHash": "x", "evidence": [1, 2]}, "link": {"meta": {"process": "p"}}});
        let segment = Segment::from_value(value.clone()).unwrap();
        assert_eq!(segment.to_canonical_bytes().unwrap(), to_canonical_vec(&value).unwrap());
    }

    #[test]
    fn link_hash_ignores_meta() {
        let a = Segment::from_value(json!({"link": {"state": 1}, "meta": {"linkHash": "a"}})).unwrap();
        let b = Segment::from_value(json!({"link": {"state": 1}, "meta": {"evidence": true}})).unwrap();
        assert_eq!(a.compute_link_hash().unwrap(), b.compute_link_hash().unwrap());
    }
}
