//! CLI command implementations.

pub mod get;
pub mod inspect;
pub mod invoke;
pub mod put;
pub mod query;

use popdb_core::{BackendKind, Config, RecordStore};
use popdb_storage::FileState;
use std::io::Write;
use std::path::Path;

/// Opens the record store backed by the ledger log at `path`.
pub fn open_store(
    path: &Path,
    backend: BackendKind,
) -> Result<RecordStore, Box<dyn std::error::Error>> {
    let state = FileState::open_with_create_dirs(path)?;
    let config = Config::new().backend(backend).sync_on_write(true);
    Ok(RecordStore::open(config, Box::new(state)))
}

/// Writes a response payload to stdout followed by a newline.
pub fn print_payload(payload: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(payload)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
