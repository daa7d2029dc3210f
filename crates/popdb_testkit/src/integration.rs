//! Cross-crate integration test helpers.
//!
//! Provides a harness that drives a record store and tracks what it should
//! contain, so that every read can be checked against the model.

use crate::fixtures::{canonical, child, child_in, genesis, TestStore};
use crate::generators::ChainOperation;
use popdb_core::segment::SegmentBuilder;
use popdb_core::{BackendKind, CoreError, LinkHash, Segment};
use std::collections::{BTreeMap, BTreeSet};

/// A test harness for model-based testing.
pub struct ChainHarness {
    /// The store under test.
    pub store: TestStore,
    /// Accepted segments in write order.
    segments: Vec<Segment>,
    /// Canonical bytes by link hash.
    stored: BTreeMap<LinkHash, Vec<u8>>,
    /// Map id each stored segment is filed under.
    map_of: BTreeMap<LinkHash, String>,
    /// Map ids by process, in first-write order.
    maps: BTreeMap<String, Vec<String>>,
}

impl ChainHarness {
    /// Creates a harness over a fresh in-memory store.
    pub fn new(backend: BackendKind) -> Self {
        Self {
            store: TestStore::memory(backend),
            segments: Vec::new(),
            stored: BTreeMap::new(),
            map_of: BTreeMap::new(),
            maps: BTreeMap::new(),
        }
    }

    /// Applies one operation, asserting the store accepts or rejects it as
    /// the model predicts.
    pub fn apply(&mut self, op: &ChainOperation) {
        match op {
            ChainOperation::Genesis { process, map_id } => {
                self.put_accepted(genesis(process, map_id));
            }
            ChainOperation::Append {
                parent,
                map_id,
                tags,
            } => {
                if self.segments.is_empty() {
                    return;
                }
                let parent = &self.segments[parent % self.segments.len()];
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                let segment = match map_id {
                    Some(map_id) => child_in(parent, map_id, &tags),
                    None => child(parent, &tags),
                };
                self.put_accepted(segment);
            }
            ChainOperation::Orphan { seed } => {
                let missing = LinkHash::digest(&seed.to_be_bytes());
                let orphan = SegmentBuilder::new("orphans", "orphan")
                    .prev_link_hash(missing)
                    .build()
                    .expect("Failed to build segment");
                let keys_before = self.store.key_count();
                let result = self.store.put_segment(&canonical(&orphan));
                assert!(
                    matches!(result, Err(CoreError::ParentNotFound)),
                    "orphan accepted: {result:?}"
                );
                assert_eq!(self.store.key_count(), keys_before, "rejected write left state behind");
            }
        }
    }

    fn put_accepted(&mut self, segment: Segment) {
        let meta = segment.validate().expect("Generated segment must be valid");
        let hash = self.store.put(&segment);
        assert_eq!(hash, meta.link_hash);

        if meta.is_genesis() {
            let maps = self.maps.entry(meta.process).or_default();
            if !maps.contains(&meta.map_id) {
                maps.push(meta.map_id.clone());
            }
        }
        self.map_of.insert(hash, meta.map_id);
        self.stored.insert(hash, canonical(&segment));
        self.segments.push(segment);
    }

    /// Checks every tracked segment reads back byte-identical.
    pub fn verify_reads(&self) {
        for (hash, expected) in &self.stored {
            let actual = self
                .store
                .get_segment(&hash.to_hex())
                .expect("Tracked segment must be readable");
            assert_eq!(&actual, expected, "segment {hash} changed");
        }
    }

    /// Checks every process lists exactly the maps it started.
    pub fn verify_maps(&self) {
        for (process, expected) in &self.maps {
            let listed: Vec<String> = serde_json::from_slice(
                &self
                    .store
                    .list_maps_for_process(process)
                    .expect("Failed to list maps"),
            )
            .expect("Map list must be a JSON array of strings");

            let mut listed_sorted = listed.clone();
            listed_sorted.sort();
            let mut expected_sorted = expected.clone();
            expected_sorted.sort();
            assert_eq!(listed_sorted, expected_sorted, "maps of {process}");
        }

        let all: Vec<String> = serde_json::from_slice(
            &self.store.list_maps_all().expect("Failed to list maps"),
        )
        .expect("Map list must be a JSON array of strings");
        let all_set: BTreeSet<&String> = all.iter().collect();
        assert_eq!(all_set.len(), all.len(), "map listed twice: {all:?}");
        let expected: BTreeSet<&String> = self.maps.values().flatten().collect();
        assert_eq!(all_set, expected);
    }

    /// Checks that listing all segments returns each tracked segment once,
    /// and that listing by map returns exactly the segments filed under it.
    pub fn verify_listing(&self) {
        let listed = listed_set(&self.store.list_all_segments().expect("Failed to list segments"));
        assert_eq!(listed.len(), self.stored.len());

        let map_ids: BTreeSet<&String> = self.map_of.values().collect();
        for map_id in map_ids {
            let expected: Vec<u8> = {
                let mut out = b"[".to_vec();
                let items: Vec<&[u8]> = self
                    .map_of
                    .iter()
                    .filter(|(_, m)| *m == map_id)
                    .map(|(hash, _)| self.stored[hash].as_slice())
                    .collect();
                out.extend(items.join(&b','));
                out.push(b']');
                out
            };
            let listed = self
                .store
                .list_segments_for_map(map_id)
                .expect("Failed to list segments by map");
            assert_eq!(
                listed_set(&listed),
                listed_set(&expected),
                "segments of map {map_id} on {:?}",
                self.store.backend_kind()
            );
        }
    }

    /// Returns the number of accepted segments.
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    /// Returns `true` if no segment was accepted.
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }
}

/// Parses a JSON array of segments into a set of their normalized texts.
fn listed_set(bytes: &[u8]) -> BTreeSet<String> {
    let items: Vec<serde_json::Value> =
        serde_json::from_slice(bytes).expect("Segment list must be a JSON array");
    let set: BTreeSet<String> = items.iter().map(ToString::to_string).collect();
    assert_eq!(set.len(), items.len(), "segment listed twice");
    set
}
