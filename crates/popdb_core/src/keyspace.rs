//! Composite keys over the flat ledger namespace.
//!
//! A composite key is an [`ObjectType`] tag followed by zero or more string
//! fields, encoded so that byte order equals tuple order and every prefix
//! tuple encodes to a byte prefix of the full key:
//!
//! ```text
//! component := escaped(bytes) 0x00 0x01
//! escaped   := 0x00 is written as 0x00 0xFF, every other byte verbatim
//! key       := component(tag) component(field)*
//! ```
//!
//! Because UTF-8 text never contains `0xFF`, `encode(prefix) ++ [0xFF]` is an
//! exclusive upper bound for every key that extends `prefix`.
//!
//! All key layouts used by the composite-key backend live here:
//!
//! | object type | fields |
//! |-------------|--------|
//! | `segment`   | process, map id, height, link hash |
//! | `map`       | process, map id |
//! | `segidx`    | link hash |
//! | `mapowner`  | map id |
//! | `segmap`    | map id, height, link hash |

use crate::error::{CoreError, CoreResult};
use crate::segment::LinkHash;
use crate::types::{Height, ObjectType};

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;

/// Width of the zero-padded decimal height field.
const HEIGHT_WIDTH: usize = 20;

/// A typed composite key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    object_type: ObjectType,
    fields: Vec<String>,
}

impl CompositeKey {
    /// Creates a key with no fields.
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Returns the object type tag.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Returns the fields after the tag.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Encodes the key to its orderable byte form.
    pub fn encode(&self) -> Vec<u8> {
        let capacity = self.fields.iter().map(|f| f.len() + 2).sum::<usize>() + 10;
        let mut out = Vec::with_capacity(capacity);
        push_component(&mut out, self.object_type.as_str().as_bytes());
        for field in &self.fields {
            push_component(&mut out, field.as_bytes());
        }
        out
    }

    /// Decodes a key produced by [`CompositeKey::encode`].
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let mut components = Vec::new();
        let mut current = Vec::new();
        let mut iter = bytes.iter().copied();

        while let Some(byte) = iter.next() {
            if byte != ESCAPE {
                current.push(byte);
                continue;
            }
            match iter.next() {
                Some(ESCAPED_ZERO) => current.push(0),
                Some(TERMINATOR) => components.push(std::mem::take(&mut current)),
                Some(other) => {
                    return Err(CoreError::invalid_key(format!(
                        "invalid escape sequence 0x00 0x{other:02x}"
                    )))
                }
                None => return Err(CoreError::invalid_key("dangling escape byte")),
            }
        }
        if !current.is_empty() {
            return Err(CoreError::invalid_key("unterminated component"));
        }

        let mut components = components.into_iter().map(|c| {
            String::from_utf8(c).map_err(|_| CoreError::invalid_key("component is not UTF-8"))
        });
        let tag = components
            .next()
            .ok_or_else(|| CoreError::invalid_key("empty key"))??;
        let object_type = ObjectType::from_tag(&tag)
            .ok_or_else(|| CoreError::invalid_key(format!("unknown object type {tag}")))?;
        let fields = components.collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            object_type,
            fields,
        })
    }

    /// Returns the range of every key that extends this one.
    pub fn prefix_range(&self) -> KeyRange {
        let start = self.encode();
        let mut end = start.clone();
        end.push(0xFF);
        KeyRange { start, end }
    }
}

fn push_component(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == 0 {
            out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&[ESCAPE, TERMINATOR]);
}

/// A half-open byte range `[start, end)` for an ordered scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub start: Vec<u8>,
    /// Exclusive upper bound.
    pub end: Vec<u8>,
}

impl KeyRange {
    /// Returns `true` if `key` falls inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && key < self.end.as_slice()
    }
}

/// Renders a height as a fixed-width, order-preserving field.
pub fn height_field(height: Height) -> String {
    format!("{:0width$}", height.as_u64(), width = HEIGHT_WIDTH)
}

/// Parses a field produced by [`height_field`].
pub fn parse_height_field(field: &str) -> CoreResult<Height> {
    if field.len() != HEIGHT_WIDTH {
        return Err(CoreError::invalid_key(format!("height field {field:?} has wrong width")));
    }
    field
        .parse()
        .map(Height::new)
        .map_err(|_| CoreError::invalid_key(format!("height field {field:?} is not a number")))
}

/// Returns the height carried by a segment or by-map segment key.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKey`] for any other key layout or a
/// malformed height field.
pub fn key_height(key: &CompositeKey) -> CoreResult<Height> {
    match (key.object_type(), key.fields()) {
        (ObjectType::Segment, [_, _, height, _]) | (ObjectType::MapSegment, [_, height, _]) => {
            parse_height_field(height)
        }
        (object_type, fields) => Err(CoreError::invalid_key(format!(
            "{object_type} key with {} fields carries no height",
            fields.len()
        ))),
    }
}

/// Key of a stored segment.
pub fn segment_key(process: &str, map_id: &str, height: Height, link_hash: &LinkHash) -> CompositeKey {
    CompositeKey::new(ObjectType::Segment)
        .with(process)
        .with(map_id)
        .with(height_field(height))
        .with(link_hash.to_hex())
}

/// Prefix over segments, optionally narrowed to a process and a map.
///
/// A map id without a process would not be a prefix, so it is ignored.
pub fn segment_prefix(process: Option<&str>, map_id: Option<&str>) -> CompositeKey {
    let key = CompositeKey::new(ObjectType::Segment);
    match (process, map_id) {
        (Some(process), Some(map_id)) => key.with(process).with(map_id),
        (Some(process), None) => key.with(process),
        (None, _) => key,
    }
}

/// Key of the by-map copy of a segment.
pub fn map_segment_key(map_id: &str, height: Height, link_hash: &LinkHash) -> CompositeKey {
    CompositeKey::new(ObjectType::MapSegment)
        .with(map_id)
        .with(height_field(height))
        .with(link_hash.to_hex())
}

/// Prefix over every segment of a map, whatever its process.
pub fn map_segment_prefix(map_id: &str) -> CompositeKey {
    CompositeKey::new(ObjectType::MapSegment).with(map_id)
}

/// Key of a map marker.
pub fn map_key(process: &str, map_id: &str) -> CompositeKey {
    CompositeKey::new(ObjectType::Map).with(process).with(map_id)
}

/// Prefix over map markers, optionally narrowed to a process.
pub fn map_prefix(process: Option<&str>) -> CompositeKey {
    let key = CompositeKey::new(ObjectType::Map);
    match process {
        Some(process) => key.with(process),
        None => key,
    }
}

/// Key of the segment index entry for a link hash.
pub fn segment_index_key(link_hash: &LinkHash) -> CompositeKey {
    CompositeKey::new(ObjectType::SegmentIndex).with(link_hash.to_hex())
}

/// Key of the global map id to process entry.
pub fn map_owner_key(map_id: &str) -> CompositeKey {
    CompositeKey::new(ObjectType::MapOwner).with(map_id)
}

/// Prefix over the global map lookup: one key per distinct map id.
pub fn map_owner_prefix() -> CompositeKey {
    CompositeKey::new(ObjectType::MapOwner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(fields: &[&str]) -> CompositeKey {
        fields
            .iter()
            .fold(CompositeKey::new(ObjectType::Segment), |k, f| k.with(*f))
    }

    #[test]
    fn roundtrip_with_embedded_zero() {
        let original = CompositeKey::new(ObjectType::Map).with("pro\0cess").with("").with("m1");
        let decoded = CompositeKey::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.fields(), ["pro\0cess", "", "m1"]);
    }

    #[test]
    fn byte_order_matches_tuple_order() {
        let mut keys = vec![
            key(&["b"]),
            key(&["a", "z"]),
            key(&["a\0"]),
            key(&["a"]),
            key(&["ab"]),
            key(&["a", ""]),
        ];
        let mut by_bytes = keys.clone();
        keys.sort();
        by_bytes.sort_by_key(CompositeKey::encode);
        assert_eq!(keys, by_bytes);
    }

    #[test]
    fn prefix_range_contains_extensions_only() {
        let range = key(&["p1"]).prefix_range();

        assert!(range.contains(&key(&["p1"]).encode()));
        assert!(range.contains(&key(&["p1", "m1"]).encode()));
        assert!(range.contains(&key(&["p1", "m1", "x", "y"]).encode()));
        assert!(!range.contains(&key(&["p10"]).encode()));
        assert!(!range.contains(&key(&["p"]).encode()));
        assert!(!range.contains(&map_key("p1", "m1").encode()));
    }

    #[test]
    fn object_types_do_not_overlap() {
        let segments = segment_prefix(None, None).prefix_range();
        assert!(!segments.contains(&map_prefix(None).encode()));
        assert!(!segments.contains(&map_owner_key("m1").encode()));
    }

    #[test]
    fn height_field_preserves_order() {
        let nine = height_field(Height::new(9));
        let ten = height_field(Height::new(10));
        assert!(nine < ten);
        assert_eq!(parse_height_field(&ten).unwrap(), Height::new(10));
        assert!(parse_height_field("10").is_err());
        assert!(parse_height_field("0000000000000000000x").is_err());
    }

    #[test]
    fn heights_read_back_from_keys() {
        let hash = LinkHash::digest(b"x");
        let height = Height::new(42);
        assert_eq!(key_height(&segment_key("p", "m", height, &hash)).unwrap(), height);
        assert_eq!(key_height(&map_segment_key("m", height, &hash)).unwrap(), height);
        assert!(key_height(&map_key("p", "m")).is_err());

        let bad = CompositeKey::new(ObjectType::MapSegment).with("m").with("7").with(hash.to_hex());
        assert!(key_height(&bad).is_err());
    }

    #[test]
    fn map_segment_prefix_spans_processes_only_for_its_map() {
        let hash = LinkHash::digest(b"x");
        let range = map_segment_prefix("m").prefix_range();
        assert!(range.contains(&map_segment_key("m", Height::GENESIS, &hash).encode()));
        assert!(!range.contains(&map_segment_key("m2", Height::GENESIS, &hash).encode()));
        assert!(!range.contains(&segment_key("p", "m", Height::GENESIS, &hash).encode()));
    }

    #[test]
    fn segment_prefix_ignores_map_without_process() {
        assert_eq!(segment_prefix(None, Some("m1")), segment_prefix(None, None));
        assert_eq!(
            segment_prefix(Some("p"), Some("m1")).fields(),
            ["p".to_string(), "m1".to_string()]
        );
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        assert!(CompositeKey::decode(b"").is_err());
        assert!(CompositeKey::decode(b"segment").is_err());
        assert!(CompositeKey::decode(b"segment\x00").is_err());
        assert!(CompositeKey::decode(b"segment\x00\x02").is_err());
        assert!(CompositeKey::decode(b"entity\x00\x01").is_err());
        assert!(CompositeKey::decode(b"segment\x00\x01\xc3\x28\x00\x01").is_err());
    }

    fn fields_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(".{0,6}", 0..4)
    }

    fn owned_key(fields: Vec<String>) -> CompositeKey {
        fields
            .into_iter()
            .fold(CompositeKey::new(ObjectType::Segment), |k, f| k.with(f))
    }

    proptest! {
        #[test]
        fn encoding_preserves_tuple_order(a in fields_strategy(), b in fields_strategy()) {
            let (a, b) = (owned_key(a), owned_key(b));
            prop_assert_eq!(a.cmp(&b), a.encode().cmp(&b.encode()));
        }

        #[test]
        fn prefix_range_holds_every_extension(prefix in fields_strategy(), rest in fields_strategy()) {
            let range = owned_key(prefix.clone()).prefix_range();
            let extended = owned_key(prefix.into_iter().chain(rest).collect());
            prop_assert!(range.contains(&extended.encode()));
        }
    }
}
