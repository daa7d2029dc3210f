//! Composite-key layout.
//!
//! | Key                                         | Value                       |
//! |---------------------------------------------|-----------------------------|
//! | `(segment, process, mapId, height, hash)`   | canonical segment JSON      |
//! | `(segidx, hash)`                            | `{"process","mapId","height"}` |
//! | `(map, process, mapId)`                     | `0x00`                      |
//! | `(mapowner, mapId)`                         | process, UTF-8              |
//! | `(segmap, mapId, height, hash)`             | canonical segment JSON      |
//!
//! Segment keys sort by process, then map, then height, so a prefix scan
//! over a map returns parents before children. The `segmap` copy holds the
//! same bytes ordered by map first, so a map id alone finds its segments in
//! every process. The `mapowner` entries hold each map id once and back the
//! process-less map listing. Map marker values are a single zero byte
//! because ledgers treat an empty value as a deletion.

use super::{SegmentBackend, StoredSegment};
use crate::collector::{collect_json_array, Paginated};
use crate::config::BackendKind;
use crate::error::{CoreError, CoreResult};
use crate::filter::{MapFilter, SegmentFilter};
use crate::keyspace::{self, CompositeKey};
use crate::query::{self, ScanPlan};
use crate::segment::{LinkHash, LinkMeta};
use crate::types::{Height, ObjectType};
use popdb_storage::{KeyValue, LedgerState};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAP_MARKER: &[u8] = &[0x00];

/// Where a segment lives, stored under its link hash.
#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    process: String,
    #[serde(rename = "mapId")]
    map_id: String,
    height: u64,
}

/// Segments and maps under composite keys.
pub struct CompositeKeyBackend {
    state: Box<dyn LedgerState>,
}

impl CompositeKeyBackend {
    /// Creates a backend over `state`.
    pub fn new(state: Box<dyn LedgerState>) -> Self {
        Self { state }
    }

    fn scan<F>(&self, plan: &ScanPlan, extract: F) -> CoreResult<Vec<u8>>
    where
        F: FnMut(&KeyValue) -> CoreResult<Vec<u8>>,
    {
        let cursor = self.state.range(&plan.range.start, &plan.range.end)?;
        let paged = Paginated::new(cursor, plan.pagination)?;
        collect_json_array(Box::new(paged), extract)
    }
}

impl SegmentBackend for CompositeKeyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CompositeKey
    }

    fn state(&self) -> &dyn LedgerState {
        self.state.as_ref()
    }

    fn state_mut(&mut self) -> &mut dyn LedgerState {
        self.state.as_mut()
    }

    fn load_segment(&self, link_hash: &LinkHash) -> CoreResult<Option<StoredSegment>> {
        let index_key = keyspace::segment_index_key(link_hash).encode();
        let Some(raw) = self.state.get_state(&index_key)? else {
            return Ok(None);
        };
        let entry: IndexEntry = serde_json::from_slice(&raw).map_err(|e| {
            CoreError::corrupted_record(format!("index entry for {link_hash}: {e}"))
        })?;

        let height = Height::new(entry.height);
        let key = keyspace::segment_key(&entry.process, &entry.map_id, height, link_hash).encode();
        let bytes = self.state.get_state(&key)?.ok_or_else(|| {
            CoreError::corrupted_record(format!("segment {link_hash} is indexed but not stored"))
        })?;

        Ok(Some(StoredSegment {
            bytes,
            height: Some(height),
        }))
    }

    fn save_map(&mut self, meta: &LinkMeta) -> CoreResult<()> {
        let marker = keyspace::map_key(&meta.process, &meta.map_id).encode();
        if self.state.get_state(&marker)?.is_none() {
            debug!(process = %meta.process, map_id = %meta.map_id, "recording map");
            self.state.put_state(&marker, MAP_MARKER)?;
        }

        let owner = keyspace::map_owner_key(&meta.map_id).encode();
        if self.state.get_state(&owner)?.is_none() {
            self.state.put_state(&owner, meta.process.as_bytes())?;
        }
        Ok(())
    }

    fn save_segment(
        &mut self,
        meta: &LinkMeta,
        parent: Option<&StoredSegment>,
        canonical: &[u8],
    ) -> CoreResult<()> {
        let height = parent
            .and_then(|p| p.height)
            .map_or(Height::GENESIS, Height::next);

        let key = keyspace::segment_key(&meta.process, &meta.map_id, height, &meta.link_hash);
        self.state.put_state(&key.encode(), canonical)?;
        let by_map = keyspace::map_segment_key(&meta.map_id, height, &meta.link_hash);
        self.state.put_state(&by_map.encode(), canonical)?;

        let entry = IndexEntry {
            process: meta.process.clone(),
            map_id: meta.map_id.clone(),
            height: height.as_u64(),
        };
        let index_key = keyspace::segment_index_key(&meta.link_hash).encode();
        self.state.put_state(&index_key, &serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    fn find_segments(&self, filter: &SegmentFilter) -> CoreResult<Vec<u8>> {
        let plan = query::compile_segment_scan(filter)?;
        debug!(?plan, "scanning segments");
        self.scan(&plan, |row| Ok(row.value.clone()))
    }

    fn find_map_ids(&self, filter: &MapFilter) -> CoreResult<Vec<u8>> {
        let plan = query::compile_map_scan(filter);
        debug!(?plan, "scanning maps");
        self.scan(&plan, |row| {
            let key = CompositeKey::decode(&row.key)?;
            match (key.object_type(), key.fields()) {
                (ObjectType::Map, [_, map_id]) | (ObjectType::MapOwner, [map_id]) => {
                    Ok(serde_json::to_vec(map_id)?)
                }
                _ => Err(CoreError::invalid_key(format!(
                    "expected a map key, found {} with {} fields",
                    key.object_type(),
                    key.fields().len()
                ))),
            }
        })
    }
}
