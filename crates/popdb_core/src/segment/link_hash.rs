//! Link hash identifier.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Size of a link hash in bytes.
pub const LINK_HASH_SIZE: usize = 32;

/// Content hash identifying a segment.
///
/// Link hashes are SHA-256 digests of the canonical JSON of a segment's
/// `link`. They are:
/// - Deterministic for identical links
/// - Immutable once a segment is stored
/// - Rendered as 64 lowercase hex characters
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkHash([u8; LINK_HASH_SIZE]);

impl LinkHash {
    /// Creates a link hash from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; LINK_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Hashes `data` with SHA-256.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        let mut bytes = [0u8; LINK_HASH_SIZE];
        bytes.copy_from_slice(&Sha256::digest(data));
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; LINK_HASH_SIZE] {
        &self.0
    }

    /// Creates a link hash from a slice.
    ///
    /// Returns `None` if the slice is not exactly 32 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; LINK_HASH_SIZE]>::try_from(slice).ok().map(Self)
    }

    /// Parses a hex string.
    ///
    /// Returns `None` unless the string decodes to exactly 32 bytes.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        hex::decode(s).ok().and_then(|bytes| Self::from_slice(&bytes))
    }

    /// Returns the lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Error returned when a string is not a valid link hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid link hash: expected 32 hex-encoded bytes")]
pub struct ParseLinkHashError;

impl FromStr for LinkHash {
    type Err = ParseLinkHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or(ParseLinkHashError)
    }
}

impl fmt::Debug for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkHash({})", self.to_hex())
    }
}

impl fmt::Display for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; LINK_HASH_SIZE]> for LinkHash {
    fn from(bytes: [u8; LINK_HASH_SIZE]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<LinkHash> for [u8; LINK_HASH_SIZE] {
    fn from(hash: LinkHash) -> Self {
        hash.0
    }
}
