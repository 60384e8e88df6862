//! Composer 2 "minified" version-list codec.
//!
//! A minified list stores its first version verbatim; every later item holds
//! only the keys that changed against the previous version, with
//! [`UNSET`] marking keys that disappeared. Diffs are chained, so a list can
//! only be decoded front to back.

use crate::document::{PackageDocument, UNSET};
use crate::error::{IndexError, Result};
use overture_core::json::{JsonMap, Value};

fn is_unset(value: &Value) -> bool {
    value.as_str() == Some(UNSET)
}

/// Diff-encode an ordered list of versions.
///
/// # Errors
/// Returns a validation error if a version holds the literal [`UNSET`]
/// string, which the format cannot represent.
pub fn encode(versions: &[JsonMap]) -> Result<Vec<JsonMap>> {
    let mut out = Vec::with_capacity(versions.len());
    let mut state: Option<JsonMap> = None;

    for version in versions {
        if let Some((key, _)) = version.iter().find(|(_, value)| is_unset(value)) {
            return Err(IndexError::validation(format!(
                "key '{key}' holds the reserved value \"{UNSET}\""
            )));
        }

        let Some(previous) = state.as_mut() else {
            out.push(version.clone());
            state = Some(version.clone());
            continue;
        };

        let mut diff = JsonMap::new();
        for (key, value) in version {
            if previous.get(key) != Some(value) {
                diff.insert(key.clone(), value.clone());
                previous.insert(key.clone(), value.clone());
            }
        }
        previous.retain(|key, _| {
            if version.contains_key(key) {
                true
            } else {
                diff.insert(key.clone(), Value::from(UNSET));
                false
            }
        });
        out.push(diff);
    }

    Ok(out)
}

/// Decode a diff-encoded list back into full versions.
///
/// # Errors
/// Returns a validation error if the first item contains [`UNSET`]; there is
/// no earlier state it could remove a key from.
pub fn decode(diffs: &[JsonMap]) -> Result<Vec<JsonMap>> {
    let mut out = Vec::with_capacity(diffs.len());
    let mut state: Option<JsonMap> = None;

    for diff in diffs {
        let Some(current) = state.as_mut() else {
            if let Some((key, _)) = diff.iter().find(|(_, value)| is_unset(value)) {
                return Err(IndexError::validation(format!(
                    "first version unsets '{key}' with no previous state"
                )));
            }
            out.push(diff.clone());
            state = Some(diff.clone());
            continue;
        };

        for (key, value) in diff {
            if is_unset(value) {
                current.shift_remove(key);
            } else {
                current.insert(key.clone(), value.clone());
            }
        }
        out.push(current.clone());
    }

    Ok(out)
}

/// Minify every version list of a document and set the marker.
///
/// A document that already carries the marker is returned unchanged.
///
/// # Errors
/// Propagates [`encode`] failures.
pub fn minify_document(mut doc: PackageDocument) -> Result<PackageDocument> {
    if doc.minified {
        return Ok(doc);
    }
    for versions in doc.packages.values_mut() {
        *versions = encode(versions)?;
    }
    doc.minified = true;
    Ok(doc)
}

/// Expand every version list of a minified document and drop the marker.
///
/// A document without the marker is returned unchanged.
///
/// # Errors
/// Propagates [`decode`] failures.
pub fn expand_document(mut doc: PackageDocument) -> Result<PackageDocument> {
    if !doc.minified {
        return Ok(doc);
    }
    for versions in doc.packages.values_mut() {
        *versions = decode(versions)?;
    }
    doc.minified = false;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_core::json::parse_object;
    use proptest::prelude::*;

    fn obj(json: &str) -> JsonMap {
        parse_object(json.as_bytes()).unwrap()
    }

    #[test]
    fn encode_emits_changed_and_new_keys() {
        let encoded = encode(&[obj(r#"{"a":"1","b":"2"}"#), obj(r#"{"a":"1","b":"3","c":"4"}"#)])
            .unwrap();
        assert_eq!(encoded, vec![obj(r#"{"a":"1","b":"2"}"#), obj(r#"{"b":"3","c":"4"}"#)]);
    }

    #[test]
    fn encode_marks_dropped_keys() {
        let encoded = encode(&[obj(r#"{"a":"1","b":"2"}"#), obj(r#"{"a":"1"}"#)]).unwrap();
        assert_eq!(encoded[1], obj(r#"{"b":"__unset"}"#));
    }

    #[test]
    fn diffs_chain_against_previous_version() {
        let versions = vec![
            obj(r#"{"v":"3","x":1}"#),
            obj(r#"{"v":"2"}"#),
            obj(r#"{"v":"1","x":1}"#),
        ];
        let encoded = encode(&versions).unwrap();
        assert_eq!(encoded[1], obj(r#"{"v":"2","x":"__unset"}"#));
        assert_eq!(encoded[2], obj(r#"{"v":"1","x":1}"#));
        assert_eq!(decode(&encoded).unwrap(), versions);
    }

    #[test]
    fn nested_values_compare_structurally() {
        let versions = vec![
            obj(r#"{"require":{"php":">=8.1"}}"#),
            obj(r#"{"require":{"php":">=8.1"}}"#),
            obj(r#"{"require":{"php":">=8.2"}}"#),
        ];
        let encoded = encode(&versions).unwrap();
        assert!(encoded[1].is_empty());
        assert_eq!(encoded[2], obj(r#"{"require":{"php":">=8.2"}}"#));
    }

    #[test]
    fn reserved_value_is_rejected() {
        let err = encode(&[obj(r#"{"a":"__unset"}"#)]).unwrap_err();
        assert!(matches!(err, IndexError::Validation { .. }));
        let err = decode(&[obj(r#"{"a":"__unset"}"#)]).unwrap_err();
        assert!(matches!(err, IndexError::Validation { .. }));
    }

    #[test]
    fn empty_lists() {
        assert!(encode(&[]).unwrap().is_empty());
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn document_helpers_respect_marker() {
        let plain = PackageDocument::from_slice(
            br#"{"packages":{"a/b":[{"version":"2.0","x":1},{"version":"1.0","x":1}]}}"#,
        )
        .unwrap();
        assert_eq!(expand_document(plain.clone()).unwrap(), plain);

        let minified = minify_document(plain.clone()).unwrap();
        assert!(minified.minified);
        assert_eq!(minified.packages["a/b"][1], obj(r#"{"version":"1.0"}"#));
        assert_eq!(minify_document(minified.clone()).unwrap(), minified);

        assert_eq!(expand_document(minified).unwrap(), plain);
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9.]{0,6}".prop_map(Value::from),
        ]
    }

    fn json_value() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(2, 8, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::from),
                prop::collection::btree_map("[a-c]", inner, 0..3)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn version() -> impl Strategy<Value = JsonMap> {
        prop::collection::vec(("[a-f]{1,2}", json_value()), 0..6)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(versions in prop::collection::vec(version(), 0..8)) {
            let encoded = encode(&versions).unwrap();
            prop_assert_eq!(encoded.len(), versions.len());
            prop_assert_eq!(decode(&encoded).unwrap(), versions);
        }
    }
}
