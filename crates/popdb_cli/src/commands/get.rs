//! Get command implementation.

use popdb_core::BackendKind;
use std::path::Path;

/// Runs the get command.
pub fn run(
    path: &Path,
    backend: BackendKind,
    link_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(path, backend)?;
    let segment = store.get_segment(link_hash)?;
    super::print_payload(&segment)
}
