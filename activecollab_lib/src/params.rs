//! Nested parameter flattening and form encoding.
//!
//! The API takes its inputs as classic form data: nested mappings flatten to
//! bracket keys (`project[name]=X`, sent percent-encoded as
//! `project%5Bname%5D=X`), arrays get numeric indices, null entries are
//! skipped and booleans encode as `1`/`0`. The same serialization is used
//! for GET query strings and POST bodies.

use serde_json::Value;

/// Serialize a (possibly nested) parameter mapping as a percent-encoded
/// form string, e.g. `users%5B0%5D=26&project%5Bname%5D=X`.
pub fn encode(params: &Value) -> String {
    flatten(params)
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether the mapping holds no encodable parameters.
pub fn is_empty(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Percent-encode a logical resource path, preserving `/` separators.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Flatten a nested mapping into bracket-keyed pairs, unencoded.
pub(crate) fn flatten(params: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = params {
        for (key, value) in map {
            flatten_into(key.clone(), value, &mut pairs);
        }
    }
    pairs
}

fn flatten_into(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((key, number.to_string())),
        Value::String(text) => pairs.push((key, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{}[{}]", key, index), item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub_key, sub_value) in map {
                flatten_into(format!("{}[{}]", key, sub_key), sub_value, pairs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_scalars() {
        let pairs = flatten(&json!({"name": "X", "leader_id": 15}));
        assert!(pairs.contains(&("name".to_string(), "X".to_string())));
        assert!(pairs.contains(&("leader_id".to_string(), "15".to_string())));
    }

    #[test]
    fn flatten_nested_mapping_uses_bracket_keys() {
        let pairs = flatten(&json!({"project": {"name": "X", "leader_id": 15}}));
        assert_eq!(
            pairs,
            vec![
                ("project[leader_id]".to_string(), "15".to_string()),
                ("project[name]".to_string(), "X".to_string()),
            ]
        );
    }

    #[test]
    fn flatten_arrays_get_numeric_indices() {
        let pairs = flatten(&json!({"users": [26, 27]}));
        assert_eq!(
            pairs,
            vec![
                ("users[0]".to_string(), "26".to_string()),
                ("users[1]".to_string(), "27".to_string()),
            ]
        );
    }

    #[test]
    fn flatten_nested_arrays() {
        let pairs = flatten(&json!({"task": {"assignees": [[15, 16], 15]}}));
        assert_eq!(
            pairs,
            vec![
                ("task[assignees][0][0]".to_string(), "15".to_string()),
                ("task[assignees][0][1]".to_string(), "16".to_string()),
                ("task[assignees][1]".to_string(), "15".to_string()),
            ]
        );
    }

    #[test]
    fn flatten_skips_nulls_and_encodes_bools() {
        let pairs = flatten(&json!({"overview": null, "private": true, "archived": false}));
        assert_eq!(
            pairs,
            vec![
                ("archived".to_string(), "0".to_string()),
                ("private".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn encode_percent_encodes_brackets_and_values() {
        assert_eq!(
            encode(&json!({"project": {"name": "Acme Ltd"}})),
            "project%5Bname%5D=Acme%20Ltd"
        );
    }

    #[test]
    fn encode_empty_mapping() {
        assert_eq!(encode(&json!({})), "");
        assert_eq!(encode(&Value::Null), "");
        assert!(is_empty(&json!({})));
        assert!(is_empty(&Value::Null));
        assert!(!is_empty(&json!({"a": 1})));
    }

    #[test]
    fn encode_path_preserves_separators() {
        assert_eq!(encode_path("projects/42/people"), "projects/42/people");
        assert_eq!(encode_path("projects/a b/people"), "projects/a%20b/people");
    }
}
