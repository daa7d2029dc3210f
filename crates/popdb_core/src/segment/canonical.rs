//! Canonical JSON serialization.
//!
//! Canonical form is compact JSON with object keys sorted by their UTF-8
//! bytes. It is computed explicitly rather than relying on the map type
//! behind `serde_json::Value`, whose ordering depends on crate features.

use crate::error::CoreResult;
use serde_json::{Map, Value};

/// Serializes `value` in canonical form.
pub fn to_canonical_vec(value: &Value) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    write_canonical(&mut out, value)?;
    Ok(out)
}

/// Serializes a JSON object in canonical form.
pub fn object_to_canonical_vec(map: &Map<String, Value>) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    write_object(&mut out, map)?;
    Ok(out)
}

fn write_object(out: &mut Vec<u8>, map: &Map<String, Value>) -> CoreResult<()> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    out.push(b'{');
    for (i, (key, item)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        serde_json::to_writer(&mut *out, key)?;
        out.push(b':');
        write_canonical(out, item)?;
    }
    out.push(b'}');
    Ok(())
}

fn write_canonical(out: &mut Vec<u8>, value: &Value) -> CoreResult<()> {
    match value {
        Value::Object(map) => write_object(out, map)?,
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(out, item)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(value: &Value) -> String {
        String::from_utf8(to_canonical_vec(value).unwrap()).unwrap()
    }

    #[test]
    fn sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"z": [ {"y": 2, "x": 1} ], "c": null}});
        assert_eq!(canonical(&value), r#"{"a":{"c":null,"z":[{"x":1,"y":2}]},"b":1}"#);
    }

    #[test]
    fn escapes_strings() {
        let value = json!({"k\"ey": "line\nbreak"});
        assert_eq!(canonical(&value), r#"{"k\"ey":"line\nbreak"}"#);
    }

    #[test]
    fn input_whitespace_is_irrelevant() {
        let a: Value = serde_json::from_str(r#"{ "a" : [1, 2], "b":true }"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":true,"a":[1,2]}"#).unwrap();
        assert_eq!(to_canonical_vec(&a).unwrap(), to_canonical_vec(&b).unwrap());
    }
}
