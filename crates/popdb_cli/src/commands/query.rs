//! Query command implementations.

use popdb_core::{BackendKind, SegmentFilter};
use std::path::Path;
use tracing::info;

/// Runs a segment filter query string.
pub fn find_segments(
    path: &Path,
    backend: BackendKind,
    query: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Finding segments in {:?} with {:?}", path, query);
    let store = super::open_store(path, backend)?;
    super::print_payload(&store.find_segments(query)?)
}

/// Runs a map filter query string.
pub fn find_map_ids(
    path: &Path,
    backend: BackendKind,
    query: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Finding maps in {:?} with {:?}", path, query);
    let store = super::open_store(path, backend)?;
    super::print_payload(&store.find_map_ids(query)?)
}

/// Lists map ids, optionally for one process.
pub fn list_maps(
    path: &Path,
    backend: BackendKind,
    process: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(path, backend)?;
    super::print_payload(&store.list_maps(process)?)
}

/// Lists segments of a process, of a map, or all of them.
pub fn list_segments(
    path: &Path,
    backend: BackendKind,
    process: Option<&str>,
    map_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(path, backend)?;
    let filter = match (process, map_id) {
        (Some(process), _) => SegmentFilter::new().process(process),
        (None, Some(map_id)) => SegmentFilter::new().map_id(map_id),
        (None, None) => SegmentFilter::new(),
    };
    super::print_payload(&store.list_segments(&filter)?)
}
