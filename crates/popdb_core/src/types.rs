//! Core type definitions for popdb.

use std::fmt;

/// The kind of record stored under a key or inside a document envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    /// A stored segment.
    Segment,
    /// A map existence marker.
    Map,
    /// Segment index entry: link hash to storage location.
    SegmentIndex,
    /// Global map lookup entry: map id to owning process.
    MapOwner,
    /// Copy of a segment ordered by map id, across processes.
    MapSegment,
}

impl ObjectType {
    /// All object types, in tag order.
    pub const ALL: [ObjectType; 5] = [
        ObjectType::Segment,
        ObjectType::Map,
        ObjectType::SegmentIndex,
        ObjectType::MapOwner,
        ObjectType::MapSegment,
    ];

    /// Returns the tag stored in keys and `docType` fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Map => "map",
            Self::SegmentIndex => "segidx",
            Self::MapOwner => "mapowner",
            Self::MapSegment => "segmap",
        }
    }

    /// Parses a tag produced by [`ObjectType::as_str`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a segment in its chain.
///
/// Genesis segments have height zero; every other segment sits one above
/// its parent. Heights order segments within a map so that a parent is
/// always listed before its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Height(pub u64);

impl Height {
    /// Height of a genesis segment.
    pub const GENESIS: Height = Height(0);

    /// Creates a new height.
    #[must_use]
    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    /// Returns the raw height value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the height of a child segment.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "height:{}", self.0)
    }
}
