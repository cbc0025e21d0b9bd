//! Deep merge for partial JSON updates

use serde_json::{Map, Value};

/// Merge `patch` into `base`.
///
/// Objects merge key by key, recursively; any other patch value replaces the
/// base value. A `null` member in the patch is kept as `null`.
pub fn merge_deep(base: &Value, patch: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(patch_map)) = (base, patch) else {
        return if patch.is_null() { base.clone() } else { patch.clone() };
    };

    let mut result: Map<String, Value> = base_map.clone();
    for (key, value) in patch_map {
        let merged = match (result.get(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => merge_deep(existing, value),
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }

    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({"a": 1, "nested": {"x": 1, "y": 2}});
        let patch = json!({"nested": {"y": 3}, "b": true});

        assert_eq!(
            merge_deep(&base, &patch),
            json!({"a": 1, "b": true, "nested": {"x": 1, "y": 3}})
        );
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        assert_eq!(merge_deep(&json!({"a": [1, 2]}), &json!({"a": [3]})), json!({"a": [3]}));
        assert_eq!(merge_deep(&json!({"a": 1}), &json!({"a": null})), json!({"a": null}));
        assert_eq!(merge_deep(&json!(1), &Value::Null), json!(1));
    }
}
