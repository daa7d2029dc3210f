//! Document layout.
//!
//! Segments are stored under their hex link hash inside an envelope
//! `{"docType":"segment","id":<hash>,"segment":<canonical JSON>}`. Each
//! process that opens a map gets `{"docType":"map","id":<mapId>,"process":<p>}`
//! under the composite `(map, process, mapId)` key, and the first one also
//! writes a `mapowner` document under `(mapowner, mapId)`. Encoded composite
//! keys always contain a zero byte and hex link hashes never do, so no map
//! id can land on a segment's key.
//!
//! Filters compile to selector queries. Results come back in the order
//! the ledger's query engine yields them; without an explicit sort that is
//! the order of an index-free scan, which for [`popdb_storage::InMemoryState`]
//! is first-write order. Callers must not rely on it across ledgers.

use super::{SegmentBackend, StoredSegment};
use crate::collector::collect_json_array;
use crate::config::BackendKind;
use crate::error::{CoreError, CoreResult};
use crate::filter::{MapFilter, SegmentFilter};
use crate::keyspace;
use crate::query;
use crate::segment::{LinkHash, LinkMeta};
use crate::types::ObjectType;
use popdb_storage::LedgerState;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

#[derive(Serialize)]
struct SegmentDoc<'a> {
    #[serde(rename = "docType")]
    doc_type: &'static str,
    id: String,
    segment: &'a RawValue,
}

#[derive(Serialize)]
struct MapDoc<'a> {
    #[serde(rename = "docType")]
    doc_type: &'static str,
    id: &'a str,
    process: &'a str,
}

/// Any stored envelope, as read back.
#[derive(Deserialize)]
struct StoredDoc {
    #[serde(rename = "docType")]
    doc_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    segment: Option<Box<RawValue>>,
}

impl StoredDoc {
    fn parse(key: &[u8], bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            CoreError::corrupted_record(format!(
                "document under {:?}: {e}",
                String::from_utf8_lossy(key)
            ))
        })
    }

    fn into_segment(self, key: &[u8]) -> CoreResult<Vec<u8>> {
        self.segment
            .map(|raw| raw.get().as_bytes().to_vec())
            .ok_or_else(|| {
                CoreError::corrupted_record(format!(
                    "segment document under {:?} has no body",
                    String::from_utf8_lossy(key)
                ))
            })
    }
}

/// Segments and maps as JSON documents.
pub struct DocumentBackend {
    state: Box<dyn LedgerState>,
}

impl DocumentBackend {
    /// Creates a backend over `state`.
    ///
    /// Queries require a state that answers rich queries.
    pub fn new(state: Box<dyn LedgerState>) -> Self {
        Self { state }
    }
}

impl SegmentBackend for DocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn state(&self) -> &dyn LedgerState {
        self.state.as_ref()
    }

    fn state_mut(&mut self) -> &mut dyn LedgerState {
        self.state.as_mut()
    }

    fn load_segment(&self, link_hash: &LinkHash) -> CoreResult<Option<StoredSegment>> {
        let key = link_hash.to_hex();
        let Some(bytes) = self.state.get_state(key.as_bytes())? else {
            return Ok(None);
        };
        let doc = StoredDoc::parse(key.as_bytes(), &bytes)?;
        if doc.doc_type != ObjectType::Segment.as_str() {
            return Ok(None);
        }
        Ok(Some(StoredSegment {
            bytes: doc.into_segment(key.as_bytes())?,
            height: None,
        }))
    }

    fn save_map(&mut self, meta: &LinkMeta) -> CoreResult<()> {
        let entries = [
            (ObjectType::Map, keyspace::map_key(&meta.process, &meta.map_id)),
            (ObjectType::MapOwner, keyspace::map_owner_key(&meta.map_id)),
        ];
        for (doc_type, key) in entries {
            let key = key.encode();
            if self.state.get_state(&key)?.is_some() {
                continue;
            }
            debug!(process = %meta.process, map_id = %meta.map_id, %doc_type, "recording map");
            let doc = MapDoc {
                doc_type: doc_type.as_str(),
                id: &meta.map_id,
                process: &meta.process,
            };
            self.state.put_state(&key, &serde_json::to_vec(&doc)?)?;
        }
        Ok(())
    }

    fn save_segment(
        &mut self,
        meta: &LinkMeta,
        _parent: Option<&StoredSegment>,
        canonical: &[u8],
    ) -> CoreResult<()> {
        let body: Box<RawValue> = serde_json::from_slice(canonical)?;
        let doc = SegmentDoc {
            doc_type: ObjectType::Segment.as_str(),
            id: meta.link_hash.to_hex(),
            segment: &body,
        };
        self.state
            .put_state(doc.id.as_bytes(), &serde_json::to_vec(&doc)?)?;
        Ok(())
    }

    fn find_segments(&self, filter: &SegmentFilter) -> CoreResult<Vec<u8>> {
        let query = query::compile_segment_selector(filter)?;
        debug!(%query, "querying segments");
        let cursor = self.state.rich_query(&query)?;
        collect_json_array(cursor, |row| {
            StoredDoc::parse(&row.key, &row.value)?.into_segment(&row.key)
        })
    }

    fn find_map_ids(&self, filter: &MapFilter) -> CoreResult<Vec<u8>> {
        let query = query::compile_map_selector(filter)?;
        debug!(%query, "querying maps");
        let cursor = self.state.rich_query(&query)?;
        collect_json_array(cursor, |row| {
            let id = StoredDoc::parse(&row.key, &row.value)?.id.ok_or_else(|| {
                CoreError::corrupted_record(format!(
                    "map document under {:?} has no id",
                    String::from_utf8_lossy(&row.key)
                ))
            })?;
            Ok(serde_json::to_vec(&id)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, SegmentBuilder};
    use popdb_storage::InMemoryState;
    use serde_json::{json, Value};

    fn backend() -> DocumentBackend {
        DocumentBackend::new(Box::new(InMemoryState::new()))
    }

    fn store(backend: &mut DocumentBackend, segment: &Segment) -> LinkMeta {
        let meta = segment.validate().unwrap();
        if meta.is_genesis() {
            backend.save_map(&meta).unwrap();
        }
        backend
            .save_segment(&meta, None, &segment.to_canonical_bytes().unwrap())
            .unwrap();
        meta
    }

    #[test]
    fn envelope_format() {
        let mut backend = backend();
        let segment = SegmentBuilder::new("p", "m").build().unwrap();
        let meta = store(&mut backend, &segment);
        let hash = meta.link_hash.to_hex();

        let raw = backend.state().get_state(hash.as_bytes()).unwrap().unwrap();
        let doc: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(doc["docType"], "segment");
        assert_eq!(doc["id"], json!(hash));
        assert_eq!(doc["segment"], segment.clone().into_value());

        let map_key = keyspace::map_key("p", "m").encode();
        let map = backend.state().get_state(&map_key).unwrap().unwrap();
        assert_eq!(map, br#"{"docType":"map","id":"m","process":"p"}"#);
        let owner_key = keyspace::map_owner_key("m").encode();
        let owner = backend.state().get_state(&owner_key).unwrap().unwrap();
        assert_eq!(owner, br#"{"docType":"mapowner","id":"m","process":"p"}"#);
    }

    #[test]
    fn load_returns_canonical_bytes() {
        let mut backend = backend();
        let segment = SegmentBuilder::new("p", "m")
            .state(json!({"z": 1, "a": [true, null]}))
            .build()
            .unwrap();
        let meta = store(&mut backend, &segment);

        let stored = backend.load_segment(&meta.link_hash).unwrap().unwrap();
        assert_eq!(stored.bytes, segment.to_canonical_bytes().unwrap());
        assert_eq!(stored.height, None);
    }

    #[test]
    fn map_named_after_a_segment_hash() {
        let mut backend = backend();
        let segment = SegmentBuilder::new("p", "m").build().unwrap();
        let meta = store(&mut backend, &segment);
        let hash = meta.link_hash.to_hex();

        store(&mut backend, &SegmentBuilder::new("p", hash.as_str()).build().unwrap());

        let stored = backend.load_segment(&meta.link_hash).unwrap().unwrap();
        assert_eq!(stored.bytes, segment.to_canonical_bytes().unwrap());
        let maps: Vec<String> =
            serde_json::from_slice(&backend.find_map_ids(&MapFilter::new()).unwrap()).unwrap();
        assert_eq!(maps, vec!["m".to_string(), hash]);
    }

    #[test]
    fn map_shared_by_processes() {
        let mut backend = backend();
        store(&mut backend, &SegmentBuilder::new("p1", "m").build().unwrap());
        store(&mut backend, &SegmentBuilder::new("p2", "m").build().unwrap());

        assert_eq!(backend.find_map_ids(&MapFilter::new()).unwrap(), br#"["m"]"#);
        assert_eq!(
            backend.find_map_ids(&MapFilter::new().process("p2")).unwrap(),
            br#"["m"]"#
        );
        let listed = backend.find_segments(&SegmentFilter::new().map_id("m")).unwrap();
        let listed: Vec<Value> = serde_json::from_slice(&listed).unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn tags_and_parent_filters() {
        let mut backend = backend();
        let genesis = SegmentBuilder::new("p", "m").tag("a").build().unwrap();
        let meta = store(&mut backend, &genesis);
        let child = SegmentBuilder::new("p", "m")
            .prev_link_hash(meta.link_hash)
            .tags(["a", "b"])
            .build()
            .unwrap();
        store(&mut backend, &child);

        let child_json = child.to_canonical_bytes().unwrap();
        let mut expected = b"[".to_vec();
        expected.extend(&child_json);
        expected.push(b']');

        let by_tags = backend
            .find_segments(&SegmentFilter::new().tag("b").tag("a"))
            .unwrap();
        assert_eq!(by_tags, expected);

        let by_parent = backend
            .find_segments(&SegmentFilter::new().prev_link_hash(meta.link_hash))
            .unwrap();
        assert_eq!(by_parent, expected);
    }

    #[test]
    fn maps_filtered_by_process() {
        let mut backend = backend();
        store(&mut backend, &SegmentBuilder::new("p1", "m1").build().unwrap());
        store(&mut backend, &SegmentBuilder::new("p2", "m2").build().unwrap());

        assert_eq!(
            backend.find_map_ids(&MapFilter::new()).unwrap(),
            br#"["m1","m2"]"#
        );
        assert_eq!(
            backend.find_map_ids(&MapFilter::new().process("p2")).unwrap(),
            br#"["m2"]"#
        );
    }
}
