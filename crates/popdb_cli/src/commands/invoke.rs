//! Invoke command implementation.

use popdb_core::{BackendKind, Contract};
use std::path::Path;
use tracing::info;

/// Runs the invoke command.
///
/// Prints the payload on success. A failed invocation is reported as an
/// error carrying the contract's message.
pub fn run(
    path: &Path,
    backend: BackendKind,
    function: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Invoking {} on {:?}", function, path);
    let mut contract = Contract::new(super::open_store(path, backend)?);
    let args: Vec<&[u8]> = args.iter().map(|arg| arg.as_bytes()).collect();

    let response = contract.invoke(function, &args);
    if !response.is_ok() {
        return Err(format!("{} ({})", response.message, response.status.code()).into());
    }
    if !response.payload.is_empty() {
        super::print_payload(&response.payload)?;
    }
    Ok(())
}
