//! Segment validation.

use super::{LinkHash, Segment};
use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};

/// The linkage header of a validated segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMeta {
    /// Content hash of the segment's link.
    pub link_hash: LinkHash,
    /// Process the segment belongs to.
    pub process: String,
    /// Map the segment belongs to.
    pub map_id: String,
    /// Link hash of the parent, as written. `None` for genesis segments.
    pub prev_link_hash: Option<String>,
    /// Tags attached to the link.
    pub tags: Vec<String>,
}

impl LinkMeta {
    /// Returns `true` if the segment starts a new map.
    #[must_use]
    pub fn is_genesis(&self) -> bool {
        self.prev_link_hash.is_none()
    }
}

impl Segment {
    /// Checks the structure of the segment and the consistency of its hash.
    ///
    /// The checks run in a fixed order and the first failure is reported
    /// with a message meant to be passed to the caller verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] describing the first failed check.
    pub fn validate(&self) -> CoreResult<LinkMeta> {
        let link = self
            .link()
            .ok_or_else(|| CoreError::validation("link should be an object"))?;
        let link_meta = link
            .get("meta")
            .and_then(Value::as_object)
            .ok_or_else(|| CoreError::validation("link.meta should be an object"))?;

        let process = non_empty_string(link_meta, "process")
            .ok_or_else(|| CoreError::validation("link.meta.process should be a non empty string"))?;
        let map_id = non_empty_string(link_meta, "mapId")
            .ok_or_else(|| CoreError::validation("link.meta.mapId should be a non empty string"))?;

        let prev_link_hash = match link_meta.get("prevLinkHash") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            // Parent lookups and filters compare the lowercase rendering.
            Some(Value::String(s)) if s.bytes().any(|b| b.is_ascii_uppercase()) => {
                return Err(CoreError::validation(
                    "link.meta.prevLinkHash should be lowercase",
                ))
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(CoreError::validation(
                    "link.meta.prevLinkHash should be a string",
                ))
            }
        };

        let tags = match link_meta.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(tags_error)?,
            Some(_) => return Err(tags_error()),
        };

        let declared = self
            .meta()
            .and_then(|meta| non_empty_string(meta, "linkHash"))
            .ok_or_else(|| CoreError::validation("meta.linkHash should be a non empty string"))?;
        let computed = self.compute_link_hash()?;
        if LinkHash::from_hex(&declared) != Some(computed) {
            return Err(CoreError::validation("meta.linkHash is not consistent"));
        }

        Ok(LinkMeta {
            link_hash: computed,
            process,
            map_id,
            prev_link_hash,
            tags,
        })
    }
}

fn tags_error() -> CoreError {
    CoreError::validation("link.meta.tags should be an array of non empty string")
}

fn non_empty_string(map: &Map<String, Value>, field: &str) -> Option<String> {
    match map.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
