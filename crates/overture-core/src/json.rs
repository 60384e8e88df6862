//! JSON document values and the sonic-rs codec.
//!
//! Documents are carried as [`Value`] trees whose objects keep insertion order,
//! so passthrough fields survive a parse/rewrite/serialize cycle untouched and
//! output bytes depend only on the order in which entries were inserted.

use crate::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

pub use serde_json::Value;

/// Insertion-ordered JSON object.
pub type JsonMap = serde_json::Map<String, Value>;

/// Deserialize JSON string.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T> {
    sonic_rs::from_str(s).map_err(Error::from)
}

/// Deserialize JSON bytes.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    sonic_rs::from_slice(bytes).map_err(Error::from)
}

/// Serialize to compact JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string(value).map_err(Error::from)
}

/// Serialize to compact JSON bytes.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    sonic_rs::to_vec(value).map_err(Error::from)
}

/// Serialize to pretty JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string_pretty(value).map_err(Error::from)
}

/// Parse bytes that must hold a top-level JSON object.
///
/// # Errors
/// Returns error if the bytes are not JSON or the root is not an object.
pub fn parse_object(bytes: &[u8]) -> Result<JsonMap> {
    match from_json_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Validation(format!(
            "expected a JSON object at the document root, found {}",
            kind_of(&other)
        ))),
    }
}

/// Short name of a value's JSON kind, for error messages.
#[must_use]
pub const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
