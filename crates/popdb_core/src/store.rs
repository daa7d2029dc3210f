//! Record store for segments and maps.

use crate::backend::{self, SegmentBackend, StoredSegment};
use crate::config::{BackendKind, Config};
use crate::error::{CoreError, CoreResult};
use crate::filter::{MapFilter, SegmentFilter};
use crate::segment::{LinkHash, LinkMeta, Segment};
use popdb_storage::LedgerState;
use tracing::{debug, warn};

/// Provides segment and map operations over a ledger state.
///
/// The `RecordStore` owns the write path: every segment is parsed,
/// validated and linked to an existing parent before anything is written.
/// Reads and queries are delegated to the configured [`SegmentBackend`].
///
/// # Example
///
/// ```rust
/// use popdb_core::{Config, RecordStore};
/// use popdb_core::segment::SegmentBuilder;
/// use popdb_storage::InMemoryState;
///
/// let mut store = RecordStore::open(Config::default(), Box::new(InMemoryState::new()));
///
/// let genesis = SegmentBuilder::new("orders", "order-42").build().unwrap();
/// let raw = genesis.to_canonical_bytes().unwrap();
/// let hash = store.put_segment(&raw).unwrap();
///
/// assert_eq!(store.get_segment(&hash.to_hex()).unwrap(), raw);
/// assert_eq!(store.list_maps_all().unwrap(), br#"["order-42"]"#);
/// ```
pub struct RecordStore {
    config: Config,
    backend: Box<dyn SegmentBackend>,
}

impl RecordStore {
    /// Opens a store over `state` with the backend selected by `config`.
    pub fn open(config: Config, state: Box<dyn LedgerState>) -> Self {
        debug!(backend = %config.backend, "opening record store");
        let backend = backend::open_backend(config.backend, state);
        Self { config, backend }
    }

    /// Returns the configured backend kind.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Returns the configuration the store was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying ledger state.
    pub fn state(&self) -> &dyn LedgerState {
        self.backend.state()
    }

    /// Flushes the ledger state.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.state_mut().sync()?;
        Ok(())
    }

    /// Stores a segment and returns its link hash.
    ///
    /// Genesis segments (no `prevLinkHash`) create their map. Every other
    /// segment must reference a stored parent. Nothing is written unless
    /// the segment is accepted.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Parse`] if `raw` is not a segment document
    /// - [`CoreError::Validation`] if the segment is malformed or its link
    ///   hash does not match
    /// - [`CoreError::ParentNotFound`] if the parent is not stored
    pub fn put_segment(&mut self, raw: &[u8]) -> CoreResult<LinkHash> {
        let segment = Segment::parse(raw).map_err(|e| {
            warn!("rejecting unparsable segment");
            e
        })?;
        let meta = segment.validate().map_err(|e| {
            warn!(error = %e, "rejecting invalid segment");
            e
        })?;
        let parent = self.resolve_parent(&meta)?;
        let canonical = segment.to_canonical_bytes()?;

        if parent.is_none() {
            self.backend.save_map(&meta)?;
        }
        self.backend.save_segment(&meta, parent.as_ref(), &canonical)?;
        debug!(
            link_hash = %meta.link_hash,
            process = %meta.process,
            map_id = %meta.map_id,
            genesis = meta.is_genesis(),
            "stored segment"
        );

        if self.config.sync_on_write {
            self.sync()?;
        }
        Ok(meta.link_hash)
    }

    fn resolve_parent(&self, meta: &LinkMeta) -> CoreResult<Option<StoredSegment>> {
        let Some(prev) = meta.prev_link_hash.as_deref() else {
            return Ok(None);
        };
        match self.read_segment(prev) {
            Ok(parent) => Ok(Some(parent)),
            Err(CoreError::NotFound) => {
                warn!(link_hash = %meta.link_hash, prev_link_hash = prev, "parent segment is missing");
                Err(CoreError::ParentNotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn read_segment(&self, link_hash: &str) -> CoreResult<StoredSegment> {
        let hash = LinkHash::from_hex(link_hash).ok_or(CoreError::NotFound)?;
        self.backend.load_segment(&hash)?.ok_or(CoreError::NotFound)
    }

    /// Returns the canonical JSON of the segment stored under `link_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no segment is stored under it,
    /// including when `link_hash` is empty or not hex.
    pub fn get_segment(&self, link_hash: &str) -> CoreResult<Vec<u8>> {
        self.read_segment(link_hash).map(|stored| stored.bytes)
    }

    /// Returns the map ids of `process`, or of every process, as a JSON
    /// array.
    pub fn list_maps(&self, process: Option<&str>) -> CoreResult<Vec<u8>> {
        let filter = match process {
            Some(process) => MapFilter::new().process(process),
            None => MapFilter::new(),
        };
        self.backend.find_map_ids(&filter)
    }

    /// Returns every map id.
    pub fn list_maps_all(&self) -> CoreResult<Vec<u8>> {
        self.list_maps(None)
    }

    /// Returns the map ids of one process.
    pub fn list_maps_for_process(&self, process: &str) -> CoreResult<Vec<u8>> {
        self.list_maps(Some(process))
    }

    /// Returns the segments matching `filter` as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedFilter`] if the configured backend
    /// cannot express the filter.
    pub fn list_segments(&self, filter: &SegmentFilter) -> CoreResult<Vec<u8>> {
        self.backend.find_segments(filter)
    }

    /// Returns every segment of one process.
    pub fn list_segments_for_process(&self, process: &str) -> CoreResult<Vec<u8>> {
        self.list_segments(&SegmentFilter::new().process(process))
    }

    /// Returns every segment of one map.
    pub fn list_segments_for_map(&self, map_id: &str) -> CoreResult<Vec<u8>> {
        self.list_segments(&SegmentFilter::new().map_id(map_id))
    }

    /// Returns every segment.
    pub fn list_all_segments(&self) -> CoreResult<Vec<u8>> {
        self.list_segments(&SegmentFilter::new())
    }

    /// Parses a segment filter query string and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FilterFormat`] if the query string is malformed.
    pub fn find_segments(&self, query: &str) -> CoreResult<Vec<u8>> {
        let filter = SegmentFilter::parse(query).map_err(|e| {
            warn!(query, error = ?e, "rejecting segment filter");
            e
        })?;
        self.list_segments(&filter)
    }

    /// Parses a map filter query string and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FilterFormat`] if the query string is malformed.
    pub fn find_map_ids(&self, query: &str) -> CoreResult<Vec<u8>> {
        let filter = MapFilter::parse(query).map_err(|e| {
            warn!(query, error = ?e, "rejecting map filter");
            e
        })?;
        self.backend.find_map_ids(&filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentBuilder;
    use popdb_storage::InMemoryState;
    use serde_json::json;

    fn stores() -> Vec<RecordStore> {
        vec![
            RecordStore::open(Config::composite_key(), Box::new(InMemoryState::new())),
            RecordStore::open(Config::document(), Box::new(InMemoryState::new())),
        ]
    }

    fn key_count(store: &RecordStore) -> usize {
        let mut cursor = store.state().range(&[], &[0xFF; 8]).unwrap();
        let mut n = 0;
        while cursor.has_next() {
            cursor.next().unwrap();
            n += 1;
        }
        cursor.close().unwrap();
        n
    }

    #[test]
    fn roundtrip_is_byte_identical() {
        for mut store in stores() {
            let segment = SegmentBuilder::new("p", "m")
                .state(json!({"b": [1, 2], "a": "x"}))
                .build()
                .unwrap();
            let raw = segment.to_canonical_bytes().unwrap();
            let hash = store.put_segment(&raw).unwrap();
            assert_eq!(store.get_segment(&hash.to_hex()).unwrap(), raw);
        }
    }

    #[test]
    fn non_canonical_input_is_stored_canonically() {
        for mut store in stores() {
            let segment = SegmentBuilder::new("p", "m").build().unwrap();
            let pretty = serde_json::to_vec_pretty(&segment.clone().into_value()).unwrap();
            let hash = store.put_segment(&pretty).unwrap();
            assert_eq!(
                store.get_segment(&hash.to_hex()).unwrap(),
                segment.to_canonical_bytes().unwrap()
            );
        }
    }

    #[test]
    fn missing_parent_persists_nothing() {
        for mut store in stores() {
            let orphan = SegmentBuilder::new("p", "m")
                .prev_link_hash(LinkHash::digest(b"unknown"))
                .build()
                .unwrap();
            let err = store
                .put_segment(&orphan.to_canonical_bytes().unwrap())
                .unwrap_err();
            assert!(matches!(err, CoreError::ParentNotFound));
            assert_eq!(err.to_string(), "Parent segment doesn't exist");
            assert_eq!(key_count(&store), 0);
        }
    }

    #[test]
    fn non_hex_parent_is_missing() {
        for mut store in stores() {
            let value = json!({"link": {"meta": {"process": "p", "mapId": "m", "prevLinkHash": "zz"}}, "meta": {}});
            let mut segment = Segment::from_value(value).unwrap().into_value();
            let hash = Segment::from_value(segment.clone())
                .unwrap()
                .compute_link_hash()
                .unwrap();
            segment["meta"]["linkHash"] = json!(hash.to_hex());

            let err = store
                .put_segment(&serde_json::to_vec(&segment).unwrap())
                .unwrap_err();
            assert!(matches!(err, CoreError::ParentNotFound));
        }
    }

    #[test]
    fn malformed_input_is_rejected() {
        for mut store in stores() {
            let err = store.put_segment(b"not json").unwrap_err();
            assert_eq!(err.to_string(), "Could not parse segment");

            let err = store.put_segment(br#"{"link": {}}"#).unwrap_err();
            assert_eq!(err.to_string(), "link.meta should be an object");
            assert_eq!(key_count(&store), 0);
        }
    }

    #[test]
    fn missing_lookup() {
        let absent = LinkHash::digest(b"absent").to_hex();
        for store in stores() {
            for hash in ["", "xyz", absent.as_str()] {
                let err = store.get_segment(hash).unwrap_err();
                assert_eq!(err.to_string(), "Segment does not exist");
            }
        }
    }

    #[test]
    fn genesis_creates_map_once() {
        for mut store in stores() {
            let genesis = SegmentBuilder::new("p", "m").build().unwrap();
            let hash = store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();
            let child = SegmentBuilder::new("p", "m").prev_link_hash(hash).build().unwrap();
            store.put_segment(&child.to_canonical_bytes().unwrap()).unwrap();
            store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();

            assert_eq!(store.list_maps_all().unwrap(), br#"["m"]"#);
            assert_eq!(store.list_maps_for_process("p").unwrap(), br#"["m"]"#);
            assert_eq!(store.list_maps_for_process("other").unwrap(), b"[]");
        }
    }

    #[test]
    fn shared_map_is_listed_per_process() {
        for mut store in stores() {
            let first = SegmentBuilder::new("p1", "m").build().unwrap();
            let second = SegmentBuilder::new("p2", "m").build().unwrap();
            store.put_segment(&first.to_canonical_bytes().unwrap()).unwrap();
            store.put_segment(&second.to_canonical_bytes().unwrap()).unwrap();

            assert_eq!(store.list_maps_all().unwrap(), br#"["m"]"#);
            assert_eq!(store.list_maps_for_process("p1").unwrap(), br#"["m"]"#);
            assert_eq!(store.list_maps_for_process("p2").unwrap(), br#"["m"]"#);

            let listed: Vec<serde_json::Value> =
                serde_json::from_slice(&store.list_segments_for_map("m").unwrap()).unwrap();
            assert_eq!(listed.len(), 2, "{:?}", store.backend_kind());
        }
    }

    #[test]
    fn child_moving_to_another_map() {
        for mut store in stores() {
            let genesis = SegmentBuilder::new("p", "m").build().unwrap();
            let hash = store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();
            let moved = SegmentBuilder::new("p", "x").prev_link_hash(hash).build().unwrap();
            let raw = moved.to_canonical_bytes().unwrap();
            store.put_segment(&raw).unwrap();

            let mut expected = b"[".to_vec();
            expected.extend(&raw);
            expected.push(b']');
            assert_eq!(store.list_segments_for_map("x").unwrap(), expected);
            assert_eq!(store.list_maps_all().unwrap(), br#"["m"]"#);
        }
    }

    #[test]
    fn uppercase_parent_is_rejected() {
        for mut store in stores() {
            let genesis = SegmentBuilder::new("p", "m").build().unwrap();
            let hash = store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();
            let mut child = SegmentBuilder::new("p", "m")
                .prev_link_hash(hash)
                .build()
                .unwrap()
                .into_value();
            child["link"]["meta"]["prevLinkHash"] = json!(hash.to_hex().to_uppercase());
            let rehashed = Segment::from_value(child.clone())
                .unwrap()
                .compute_link_hash()
                .unwrap();
            child["meta"]["linkHash"] = json!(rehashed.to_hex());

            let err = store
                .put_segment(&serde_json::to_vec(&child).unwrap())
                .unwrap_err();
            assert_eq!(err.to_string(), "link.meta.prevLinkHash should be lowercase");
        }
    }

    #[test]
    fn filter_format_errors() {
        for store in stores() {
            let err = store.find_segments("limit=-1").unwrap_err();
            assert_eq!(err.to_string(), "Segment filter format incorrect");
            let err = store.find_map_ids("offset=x").unwrap_err();
            assert_eq!(err.to_string(), "Map filter format incorrect");
        }
    }

    #[test]
    fn reopened_file_state_keeps_chain() {
        use popdb_storage::FileState;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.log");
        let genesis = SegmentBuilder::new("p", "m").build().unwrap();

        let hash = {
            let state = FileState::open(&path).unwrap();
            let mut store = RecordStore::open(Config::composite_key(), Box::new(state));
            let hash = store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();
            store.sync().unwrap();
            hash
        };

        let state = FileState::open(&path).unwrap();
        let mut store = RecordStore::open(Config::composite_key(), Box::new(state));
        let child = SegmentBuilder::new("p", "m").prev_link_hash(hash).build().unwrap();
        store.put_segment(&child.to_canonical_bytes().unwrap()).unwrap();

        let expected = format!(
            "[{},{}]",
            String::from_utf8(genesis.to_canonical_bytes().unwrap()).unwrap(),
            String::from_utf8(child.to_canonical_bytes().unwrap()).unwrap()
        );
        assert_eq!(store.list_segments_for_map("m").unwrap(), expected.into_bytes());
    }

    #[test]
    fn sync_on_write() {
        let mut store = RecordStore::open(
            Config::document().sync_on_write(true),
            Box::new(InMemoryState::new()),
        );
        let genesis = SegmentBuilder::new("p", "m").build().unwrap();
        store.put_segment(&genesis.to_canonical_bytes().unwrap()).unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Document);
        assert!(store.config().sync_on_write);
    }
}
