//! Record layouts over the ledger state.
//!
//! A [`SegmentBackend`] decides where segments, map markers and their
//! lookup entries live in the flat key-value namespace, and how filters
//! are answered:
//!
//! - [`CompositeKeyBackend`] stores everything under composite keys and
//!   answers filters with ordered prefix scans.
//! - [`DocumentBackend`] stores JSON envelopes keyed by link hash or map id
//!   and answers filters with selector queries.
//!
//! Validation, parent checks and the contract surface live above this
//! trait in [`crate::RecordStore`] and are shared by both layouts.

mod composite;
mod document;

pub use composite::CompositeKeyBackend;
pub use document::DocumentBackend;

use crate::config::BackendKind;
use crate::error::CoreResult;
use crate::filter::{MapFilter, SegmentFilter};
use crate::segment::{LinkHash, LinkMeta};
use crate::types::Height;
use popdb_storage::LedgerState;

/// A segment as read back from the ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSegment {
    /// Canonical segment JSON, byte-identical to what was written.
    pub bytes: Vec<u8>,
    /// Chain height, for layouts that record it.
    pub height: Option<Height>,
}

/// Storage layout and query strategy for segments and maps.
pub trait SegmentBackend: Send + Sync {
    /// Returns which layout this is.
    fn kind(&self) -> BackendKind;

    /// Returns the underlying ledger state.
    fn state(&self) -> &dyn LedgerState;

    /// Returns the underlying ledger state mutably.
    fn state_mut(&mut self) -> &mut dyn LedgerState;

    /// Reads the segment stored under `link_hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or a stored record is
    /// malformed.
    fn load_segment(&self, link_hash: &LinkHash) -> CoreResult<Option<StoredSegment>>;

    /// Records that the map of `meta` exists. Writing an existing map is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save_map(&mut self, meta: &LinkMeta) -> CoreResult<()>;

    /// Persists a validated segment whose parent, if any, is `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save_segment(
        &mut self,
        meta: &LinkMeta,
        parent: Option<&StoredSegment>,
        canonical: &[u8],
    ) -> CoreResult<()>;

    /// Returns the segments matching `filter` as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be expressed by this layout or
    /// the query fails.
    fn find_segments(&self, filter: &SegmentFilter) -> CoreResult<Vec<u8>>;

    /// Returns the map ids matching `filter` as a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_map_ids(&self, filter: &MapFilter) -> CoreResult<Vec<u8>>;
}

/// Creates the backend selected by `kind` over `state`.
pub fn open_backend(kind: BackendKind, state: Box<dyn LedgerState>) -> Box<dyn SegmentBackend> {
    match kind {
        BackendKind::CompositeKey => Box::new(CompositeKeyBackend::new(state)),
        BackendKind::Document => Box::new(DocumentBackend::new(state)),
    }
}
