//! Inspect command implementation.

use popdb_core::keyspace::{self, CompositeKey};
use popdb_core::{BackendKind, ObjectType};
use popdb_storage::{FileState, LedgerState, StateIterator};
use serde::Serialize;
use std::path::Path;

/// Ledger inspection result.
#[derive(Debug, Default, Serialize)]
pub struct InspectResult {
    /// Ledger log path.
    pub path: String,
    /// Storage layout the records were read as.
    pub backend: String,
    /// Log file size in bytes.
    pub log_size: u64,
    /// Number of distinct keys.
    pub key_count: usize,
    /// Number of stored segments.
    pub segment_count: usize,
    /// Number of map markers.
    pub map_count: usize,
    /// Number of segment index entries.
    pub index_count: usize,
    /// Number of map owner entries.
    pub owner_count: usize,
    /// Number of by-map segment copies.
    pub map_segment_count: usize,
    /// Highest segment height found in a key, if the layout records heights.
    pub max_height: Option<u64>,
    /// Keys that do not belong to the layout.
    pub unknown_count: usize,
}

/// What a single key turned out to be.
#[derive(Debug, PartialEq, Eq)]
struct Record {
    object_type: ObjectType,
    height: Option<u64>,
}

impl Record {
    fn of(object_type: ObjectType) -> Self {
        Self {
            object_type,
            height: None,
        }
    }
}

impl InspectResult {
    fn count(&mut self, record: Option<Record>) {
        let Some(record) = record else {
            self.unknown_count += 1;
            return;
        };
        match record.object_type {
            ObjectType::Segment => self.segment_count += 1,
            ObjectType::Map => self.map_count += 1,
            ObjectType::SegmentIndex => self.index_count += 1,
            ObjectType::MapOwner => self.owner_count += 1,
            ObjectType::MapSegment => self.map_segment_count += 1,
        }
        if let Some(height) = record.height {
            self.max_height = self.max_height.max(Some(height));
        }
    }
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    backend: BackendKind,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No ledger found at {:?}", path).into());
    }

    let state = FileState::open(path)?;
    let mut result = InspectResult {
        path: path.display().to_string(),
        backend: backend.to_string(),
        log_size: std::fs::metadata(path)?.len(),
        ..InspectResult::default()
    };

    // Every stored key is UTF-8 or a composite key, so none starts with 0xFF.
    let mut cursor = state.range(&[], &[0xFF])?;
    while cursor.has_next() {
        let row = cursor.next()?;
        result.key_count += 1;
        result.count(classify(backend, &row.key, &row.value));
    }
    cursor.close()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn classify(backend: BackendKind, key: &[u8], value: &[u8]) -> Option<Record> {
    match backend {
        BackendKind::CompositeKey => {
            let key = CompositeKey::decode(key).ok()?;
            match key.object_type() {
                // A segment key with a malformed height is not ours.
                object_type @ (ObjectType::Segment | ObjectType::MapSegment) => Some(Record {
                    object_type,
                    height: Some(keyspace::key_height(&key).ok()?.as_u64()),
                }),
                object_type => Some(Record::of(object_type)),
            }
        }
        BackendKind::Document => {
            let doc: serde_json::Value = serde_json::from_slice(value).ok()?;
            let object_type = match doc.get("docType")?.as_str()? {
                "segment" => ObjectType::Segment,
                "map" => ObjectType::Map,
                "mapowner" => ObjectType::MapOwner,
                _ => return None,
            };
            Some(Record::of(object_type))
        }
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Ledger: {}", result.path);
    println!("Backend: {}", result.backend);
    println!();
    println!("Log size: {} bytes", result.log_size);
    println!("Keys: {}", result.key_count);
    println!();
    println!("Segments: {}", result.segment_count);
    println!("Maps: {}", result.map_count);
    println!("Map owner entries: {}", result.owner_count);
    if result.index_count > 0 || result.map_segment_count > 0 {
        println!("Segment index entries: {}", result.index_count);
        println!("By-map segment copies: {}", result.map_segment_count);
    }
    if let Some(height) = result.max_height {
        println!("Highest segment: {height}");
    }
    if result.unknown_count > 0 {
        println!("Unrecognized keys: {}", result.unknown_count);
    }
}
