//! Dot-path field access.

use serde_json::Value;

/// Resolves `"a.b.c"` against a row. Numeric segments index into arrays.
///
/// Returns `None` when any segment is missing.
pub fn resolve_path<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = row.get(path) {
        return Some(direct);
    }

    path.split('.').try_fold(row, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nested_access() {
        let row = json!({ "person": { "name": { "zh": "蘇軾" } }, "offices": [{ "title": "Prefect" }] });
        assert_eq!(resolve_path(&row, "person.name.zh"), Some(&json!("蘇軾")));
        assert_eq!(resolve_path(&row, "offices.0.title"), Some(&json!("Prefect")));
        assert_eq!(resolve_path(&row, "person.age"), None);
        assert_eq!(resolve_path(&row, "person.name.zh.x"), None);
    }

    #[test]
    fn test_literal_dotted_key_wins() {
        let row = json!({ "a.b": 1, "a": { "b": 2 } });
        assert_eq!(resolve_path(&row, "a.b"), Some(&json!(1)));
    }
}
