//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up record stores over either
//! backend and for building the segments common test scenarios need.

use popdb_core::segment::SegmentBuilder;
use popdb_core::{BackendKind, Config, LinkHash, RecordStore, Segment};
use popdb_storage::{FileState, InMemoryState};
use std::path::PathBuf;
use tempfile::TempDir;

/// Both backends, for tests that must hold on each.
pub const ALL_BACKENDS: [BackendKind; 2] = [BackendKind::CompositeKey, BackendKind::Document];

/// A test record store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: RecordStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a store over in-memory state.
    pub fn memory(backend: BackendKind) -> Self {
        Self {
            store: RecordStore::open(Config::new().backend(backend), Box::new(InMemoryState::new())),
            _temp_dir: None,
        }
    }

    /// Creates a store over a file-backed state in a temporary directory.
    pub fn file(backend: BackendKind) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let state = FileState::open_with_create_dirs(&temp_dir.path().join("ledger.log"))
            .expect("Failed to open ledger log");

        Self {
            store: RecordStore::open(Config::new().backend(backend), Box::new(state)),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the ledger log path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("ledger.log"))
    }

    /// Stores `segment`, panicking if it is rejected.
    pub fn put(&mut self, segment: &Segment) -> LinkHash {
        self.store
            .put_segment(&canonical(segment))
            .expect("Failed to put segment")
    }

    /// Counts every key in the underlying state.
    pub fn key_count(&self) -> usize {
        let mut cursor = self
            .store
            .state()
            .range(&[], &[0xFF])
            .expect("Failed to open cursor");
        let mut count = 0;
        while cursor.has_next() {
            cursor.next().expect("Failed to read cursor");
            count += 1;
        }
        cursor.close().expect("Failed to close cursor");
        count
    }
}

impl std::ops::Deref for TestStore {
    type Target = RecordStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

/// Runs a test once per backend with a fresh in-memory store.
///
/// # Example
///
/// ```rust
/// use popdb_testkit::fixtures::{genesis, with_each_backend};
///
/// with_each_backend(|store| {
///     let hash = store.put(&genesis("p", "m"));
///     assert!(store.get_segment(&hash.to_hex()).is_ok());
/// });
/// ```
pub fn with_each_backend<F>(mut f: F)
where
    F: FnMut(&mut TestStore),
{
    for backend in ALL_BACKENDS {
        let mut store = TestStore::memory(backend);
        f(&mut store);
    }
}

/// Builds a genesis segment.
pub fn genesis(process: &str, map_id: &str) -> Segment {
    SegmentBuilder::new(process, map_id)
        .build()
        .expect("Failed to build segment")
}

/// Builds a child of `parent` in the same process and map.
pub fn child(parent: &Segment, tags: &[&str]) -> Segment {
    let meta = parent.validate().expect("Parent must be valid");
    child_in(parent, &meta.map_id, tags)
}

/// Builds a child of `parent` in the same process, filed under `map_id`.
pub fn child_in(parent: &Segment, map_id: &str, tags: &[&str]) -> Segment {
    let meta = parent.validate().expect("Parent must be valid");
    SegmentBuilder::new(meta.process, map_id)
        .prev_link_hash(meta.link_hash)
        .tags(tags.iter().copied())
        .build()
        .expect("Failed to build segment")
}

/// Returns the canonical bytes of `segment`.
pub fn canonical(segment: &Segment) -> Vec<u8> {
    segment
        .to_canonical_bytes()
        .expect("Failed to serialize segment")
}

/// Returns the JSON array the store produces for `segments`, in order.
pub fn json_array(segments: &[&Segment]) -> Vec<u8> {
    let mut out = b"[".to_vec();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend(canonical(segment));
    }
    out.push(b']');
    out
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// The three segments of the basic scenario.
    pub struct ThreeSegments {
        /// Genesis of `m1` in `p1`.
        pub segment1: Segment,
        /// Child of `segment1`.
        pub segment2: Segment,
        /// Genesis of `m2` in `p1`.
        pub segment3: Segment,
    }

    /// Stores `segment1` and `segment3` as genesis segments of maps `m1` and
    /// `m2`, and `segment2` as the child of `segment1`.
    pub fn three_segments(backend: BackendKind) -> (TestStore, ThreeSegments) {
        let mut store = TestStore::memory(backend);
        let segment1 = genesis("p1", "m1");
        let segment2 = child(&segment1, &["t1"]);
        let segment3 = genesis("p1", "m2");

        store.put(&segment1);
        store.put(&segment2);
        store.put(&segment3);

        (
            store,
            ThreeSegments {
                segment1,
                segment2,
                segment3,
            },
        )
    }

    /// Stores a chain of `length` segments in one map and returns them in
    /// write order.
    pub fn chain(store: &mut TestStore, process: &str, map_id: &str, length: usize) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::with_capacity(length);
        for i in 0..length {
            let segment = match segments.last() {
                None => genesis(process, map_id),
                Some(parent) => child(parent, &[if i % 2 == 0 { "even" } else { "odd" }]),
            };
            store.put(&segment);
            segments.push(segment);
        }
        segments
    }
}
