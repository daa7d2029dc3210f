//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use popdb_core::segment::SegmentBuilder;
use popdb_core::Segment;
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating process names and map ids.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Invalid regex")
}

/// Strategy for generating tags.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex")
}

/// Strategy for generating link state: a flat JSON object of scalars.
pub fn state_strategy() -> impl Strategy<Value = Value> {
    let scalar = prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        ".{0,12}".prop_map(Value::from),
        Just(Value::Null),
    ];
    prop::collection::btree_map("[a-zA-Z_]{1,8}", scalar, 0..6)
        .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>()))
}

/// Strategy for generating valid genesis segments.
pub fn genesis_strategy() -> impl Strategy<Value = Segment> {
    (
        name_strategy(),
        name_strategy(),
        prop::collection::vec(tag_strategy(), 0..4),
        state_strategy(),
    )
        .prop_map(|(process, map_id, tags, state)| {
            SegmentBuilder::new(process, map_id)
                .tags(tags)
                .state(state)
                .build()
                .expect("Failed to build segment")
        })
}

/// A chain operation for model-based testing.
#[derive(Debug, Clone)]
pub enum ChainOperation {
    /// Start a new map.
    Genesis {
        /// Process name
        process: String,
        /// Map id
        map_id: String,
    },
    /// Append to the segment at `parent` (modulo the number stored so far).
    Append {
        /// Index into the stored segments
        parent: usize,
        /// Map the child is filed under, if not its parent's
        map_id: Option<String>,
        /// Tags of the new segment
        tags: Vec<String>,
    },
    /// Append to a segment that was never stored.
    Orphan {
        /// Seed for the missing parent's hash
        seed: u64,
    },
}

/// Strategy for generating chain operations.
pub fn chain_operation_strategy() -> impl Strategy<Value = ChainOperation> {
    prop_oneof![
        2 => (name_strategy(), name_strategy())
            .prop_map(|(process, map_id)| ChainOperation::Genesis { process, map_id }),
        3 => (
            any::<usize>(),
            prop::option::weighted(0.2, name_strategy()),
            prop::collection::vec(tag_strategy(), 0..3),
        )
            .prop_map(|(parent, map_id, tags)| ChainOperation::Append { parent, map_id, tags }),
        1 => any::<u64>().prop_map(|seed| ChainOperation::Orphan { seed }),
    ]
}

/// Strategy for generating a sequence of chain operations.
pub fn chain_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ChainOperation>> {
    prop::collection::vec(chain_operation_strategy(), min_ops..max_ops)
}

/// Filter parameters that can be rendered as a query string.
#[derive(Debug, Clone)]
pub struct FilterParams {
    /// `process`
    pub process: Option<String>,
    /// `mapIds[]`
    pub map_ids: Vec<String>,
    /// `tags[]`
    pub tags: Vec<String>,
    /// `offset`
    pub offset: Option<usize>,
    /// `limit`
    pub limit: Option<usize>,
    /// Write array keys as `%5B%5D` instead of `[]`.
    pub encode_brackets: bool,
}

impl FilterParams {
    /// Renders the parameters as a query string.
    pub fn to_query(&self) -> String {
        let brackets = if self.encode_brackets { "%5B%5D" } else { "[]" };
        let mut parts = Vec::new();
        if let Some(process) = &self.process {
            parts.push(format!("process={process}"));
        }
        for map_id in &self.map_ids {
            parts.push(format!("mapIds{brackets}={map_id}"));
        }
        for tag in &self.tags {
            parts.push(format!("tags{brackets}={tag}"));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("offset={offset}"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        parts.join("&")
    }
}

/// Strategy for generating filter parameters.
pub fn filter_params_strategy() -> impl Strategy<Value = FilterParams> {
    (
        prop::option::of(name_strategy()),
        prop::collection::vec(name_strategy(), 0..4),
        prop::collection::vec(tag_strategy(), 0..4),
        prop::option::of(0usize..100),
        prop::option::of(0usize..100),
        any::<bool>(),
    )
        .prop_map(|(process, map_ids, tags, offset, limit, encode_brackets)| FilterParams {
            process,
            map_ids,
            tags,
            offset,
            limit,
            encode_brackets,
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
