//! Segment construction for writers.

use super::{to_canonical_vec, LinkHash, Segment};
use crate::error::CoreResult;
use serde_json::{json, Map, Value};

/// Builds a segment and stamps it with its link hash.
///
/// # Example
///
/// ```rust
/// use popdb_core::segment::SegmentBuilder;
///
/// let genesis = SegmentBuilder::new("orders", "order-42").build().unwrap();
/// let genesis_hash = genesis.validate().unwrap().link_hash;
///
/// let child = SegmentBuilder::new("orders", "order-42")
///     .prev_link_hash(genesis_hash)
///     .tag("shipped")
///     .build()
///     .unwrap();
/// assert!(!child.validate().unwrap().is_genesis());
/// ```
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    process: String,
    map_id: String,
    prev_link_hash: Option<LinkHash>,
    tags: Vec<String>,
    state: Value,
    link_meta: Map<String, Value>,
    meta: Map<String, Value>,
}

impl SegmentBuilder {
    /// Starts a segment in `process` and map `map_id`.
    pub fn new(process: impl Into<String>, map_id: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            map_id: map_id.into(),
            prev_link_hash: None,
            tags: Vec::new(),
            state: json!({}),
            link_meta: Map::new(),
            meta: Map::new(),
        }
    }

    /// Links the segment to a parent.
    #[must_use]
    pub fn prev_link_hash(mut self, parent: LinkHash) -> Self {
        self.prev_link_hash = Some(parent);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the application state carried by the link.
    #[must_use]
    pub fn state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    /// Sets an extra `link.meta` field.
    #[must_use]
    pub fn link_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.link_meta.insert(key.into(), value);
        self
    }

    /// Sets an extra segment `meta` field, such as evidence.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Builds the segment, computing `meta.linkHash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be serialized.
    pub fn build(self) -> CoreResult<Segment> {
        let mut link_meta = self.link_meta;
        link_meta.insert("process".into(), Value::String(self.process));
        link_meta.insert("mapId".into(), Value::String(self.map_id));
        if let Some(prev) = self.prev_link_hash {
            link_meta.insert("prevLinkHash".into(), Value::String(prev.to_hex()));
        }
        if !self.tags.is_empty() {
            link_meta.insert("tags".into(), json!(self.tags));
        }

        let link = json!({ "state": self.state, "meta": Value::Object(link_meta) });
        let link_hash = LinkHash::digest(&to_canonical_vec(&link)?);

        let mut meta = self.meta;
        meta.insert("linkHash".into(), Value::String(link_hash.to_hex()));

        Segment::from_value(json!({ "link": link, "meta": Value::Object(meta) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_deterministic() {
        let a = SegmentBuilder::new("p", "m").tags(["x", "y"]).build().unwrap();
        let b = SegmentBuilder::new("p", "m").tags(["x", "y"]).build().unwrap();
        assert_eq!(a.to_canonical_bytes().unwrap(), b.to_canonical_bytes().unwrap());
    }

    #[test]
    fn distinct_state_gives_distinct_hash() {
        let a = SegmentBuilder::new("p", "m").state(json!({"n": 1})).build().unwrap();
        let b = SegmentBuilder::new("p", "m").state(json!({"n": 2})).build().unwrap();
        assert_ne!(a.compute_link_hash().unwrap(), b.compute_link_hash().unwrap());
    }

    #[test]
    fn meta_extras_do_not_change_hash() {
        let plain = SegmentBuilder::new("p", "m").build().unwrap();
        let with_evidence = SegmentBuilder::new("p", "m")
            .meta("evidence", json!({"provider": "test"}))
            .build()
            .unwrap();
        assert_eq!(
            plain.validate().unwrap().link_hash,
            with_evidence.validate().unwrap().link_hash
        );
    }

    #[test]
    fn child_carries_parent_hash() {
        let parent = SegmentBuilder::new("p", "m").build().unwrap();
        let parent_hash = parent.validate().unwrap().link_hash;
        let child = SegmentBuilder::new("p", "m")
            .prev_link_hash(parent_hash)
            .link_meta("priority", json!(1.5))
            .build()
            .unwrap();

        let meta = child.validate().unwrap();
        assert_eq!(meta.prev_link_hash, Some(parent_hash.to_hex()));
    }
}
