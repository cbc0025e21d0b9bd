//! Dot-path lookup into JSON responses

use serde_json::Value;

/// String at dot-separated `path` inside `value`, e.g. `data.accessToken`.
///
/// Every intermediate value must be an object containing the next key; arrays
/// are not indexed. Non-string leaves count as missing.
pub fn get_value_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))?
        .as_str()
}
