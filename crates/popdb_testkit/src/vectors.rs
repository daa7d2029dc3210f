//! Shared test vectors for popdb.
//!
//! These vectors pin the wire-visible behavior: filter query strings and
//! the selector documents they compile to, and the messages returned for
//! rejected segments. Any client implementation can be checked against
//! them.

use serde::{Deserialize, Serialize};

/// Link hash used by the filter vectors.
pub const PREV_LINK_HASH: &str = "085fa4322980286778f896fe11c4f55c46609574d9188a3c96427c76b8500bcd";

/// A filter query string and what it must compile to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input query string.
    pub query: String,
    /// Expected segment selector, or `None` if parsing must fail.
    pub segment_selector: Option<String>,
    /// Expected map selector, or `None` if parsing must fail.
    pub map_selector: Option<String>,
}

/// Filter compilation vectors.
pub fn filter_vectors() -> Vec<FilterVector> {
    vec![
        FilterVector {
            id: "filter_full".into(),
            description: "Every segment filter parameter".into(),
            query: format!(
                "process=process&offset=10&limit=15&mapIds[]=id1&mapIds[]=id2&prevLinkHash={PREV_LINK_HASH}&tags[]=tag1&tags[]=tag2"
            ),
            segment_selector: Some(format!(
                concat!(
                    r#"{{"selector":{{"docType":"segment","segment.link.meta.process":"process","#,
                    r#""segment.link.meta.mapId":{{"$in":["id1","id2"]}},"#,
                    r#""segment.link.meta.tags":{{"$all":["tag1","tag2"]}},"#,
                    r#""segment.link.meta.prevLinkHash":"{}"}},"limit":15,"skip":10}}"#
                ),
                PREV_LINK_HASH
            )),
            map_selector: Some(
                r#"{"selector":{"docType":"map","process":"process"},"limit":15,"skip":10}"#.into(),
            ),
        },
        FilterVector {
            id: "filter_empty".into(),
            description: "No parameters".into(),
            query: String::new(),
            segment_selector: Some(r#"{"selector":{"docType":"segment"}}"#.into()),
            map_selector: Some(r#"{"selector":{"docType":"mapowner"}}"#.into()),
        },
        FilterVector {
            id: "filter_encoded_brackets".into(),
            description: "Percent-encoded array keys merge with literal ones".into(),
            query: "mapIds%5B%5D=a&mapIds[]=b&mapIds%5b%5d=a".into(),
            segment_selector: Some(
                r#"{"selector":{"docType":"segment","segment.link.meta.mapId":{"$in":["a","b"]}}}"#
                    .into(),
            ),
            map_selector: Some(r#"{"selector":{"docType":"mapowner"}}"#.into()),
        },
        FilterVector {
            id: "filter_escaped_values".into(),
            description: "Values are percent-decoded".into(),
            query: "process=my%20process&tags[]=a%26b".into(),
            segment_selector: Some(
                r#"{"selector":{"docType":"segment","segment.link.meta.process":"my process","segment.link.meta.tags":{"$all":["a&b"]}}}"#
                    .into(),
            ),
            map_selector: Some(
                r#"{"selector":{"docType":"map","process":"my process"}}"#.into(),
            ),
        },
        FilterVector {
            id: "filter_negative_limit".into(),
            description: "Negative limit is malformed".into(),
            query: "limit=-1".into(),
            segment_selector: None,
            map_selector: None,
        },
        FilterVector {
            id: "filter_bad_escape".into(),
            description: "Malformed percent-encoding".into(),
            query: "process=%zz".into(),
            segment_selector: None,
            map_selector: None,
        },
        FilterVector {
            id: "filter_short_prev_link_hash".into(),
            description: "prevLinkHash must be 32 bytes; map filters ignore it".into(),
            query: "prevLinkHash=abcd".into(),
            segment_selector: None,
            map_selector: Some(r#"{"selector":{"docType":"mapowner"}}"#.into()),
        },
    ]
}

/// A segment document and the message it must be rejected with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Raw segment bytes as UTF-8 text.
    pub input: String,
    /// Expected failure message.
    pub expected_error: String,
}

/// Segment rejection vectors.
pub fn rejection_vectors() -> Vec<RejectionVector> {
    let vector = |id: &str, input: &str, expected_error: &str| RejectionVector {
        id: id.into(),
        input: input.into(),
        expected_error: expected_error.into(),
    };
    vec![
        vector("reject_not_json", "{", "Could not parse segment"),
        vector("reject_array", "[]", "Could not parse segment"),
        vector("reject_no_link", "{}", "link should be an object"),
        vector(
            "reject_no_process",
            r#"{"link":{"meta":{"mapId":"m"}}}"#,
            "link.meta.process should be a non empty string",
        ),
        vector(
            "reject_empty_map_id",
            r#"{"link":{"meta":{"process":"p","mapId":""}}}"#,
            "link.meta.mapId should be a non empty string",
        ),
        vector(
            "reject_bad_tags",
            r#"{"link":{"meta":{"process":"p","mapId":"m","tags":[1]}}}"#,
            "link.meta.tags should be an array of non empty string",
        ),
        vector(
            "reject_uppercase_prev_link_hash",
            r#"{"link":{"meta":{"process":"p","mapId":"m","prevLinkHash":"ABC"}}}"#,
            "link.meta.prevLinkHash should be lowercase",
        ),
        vector(
            "reject_no_link_hash",
            r#"{"link":{"meta":{"process":"p","mapId":"m"}},"meta":{}}"#,
            "meta.linkHash should be a non empty string",
        ),
        vector(
            "reject_wrong_link_hash",
            &format!(
                r#"{{"link":{{"meta":{{"process":"p","mapId":"m"}}}},"meta":{{"linkHash":"{PREV_LINK_HASH}"}}}}"#
            ),
            "meta.linkHash is not consistent",
        ),
    ]
}
