//! Put command implementation.

use popdb_core::BackendKind;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Runs the put command.
///
/// Reads segment JSON from `file` (`-` for stdin), stores it and prints
/// its link hash.
pub fn run(
    path: &Path,
    backend: BackendKind,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(file)?
    };

    info!("Storing segment from {:?} in {:?}", file, path);
    let mut store = super::open_store(path, backend)?;
    let link_hash = store.put_segment(&raw)?;
    println!("{link_hash}");
    Ok(())
}
