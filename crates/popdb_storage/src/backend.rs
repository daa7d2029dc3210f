//! Ledger state trait definition.

use crate::error::{StorageError, StorageResult};
use crate::iterator::StateIterator;

/// The flat key-value namespace a ledger exposes to its contracts.
///
/// Keys and values are **opaque bytes**. The state does not know about
/// segments, maps or composite keys; `popdb_core` owns every format
/// stored here.
///
/// # Invariants
///
/// - `get_state` returns exactly the bytes last written with `put_state`
/// - `range` yields keys in ascending byte order, `start` inclusive,
///   `end` exclusive
/// - Writing the same key twice replaces the value; keys are never removed
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryState`] - ordered in-memory state with rich queries
/// - [`super::FileState`] - in-memory state persisted to an append-only log
pub trait LedgerState: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `None` if the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_state(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be recorded.
    fn put_state(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Opens a forward-only cursor over `[start, end)` in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StateIterator>>;

    /// Runs a JSON selector query over the stored values.
    ///
    /// The query is a document of the form
    /// `{"selector": {...}, "limit": n, "skip": n}`. Backends without a
    /// document engine keep the default, which rejects every query.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedQuery`] by default, or
    /// [`StorageError::InvalidQuery`] if the query does not parse.
    fn rich_query(&self, query: &str) -> StorageResult<Box<dyn StateIterator>> {
        let _ = query;
        Err(StorageError::UnsupportedQuery)
    }

    /// Flushes recorded writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}
