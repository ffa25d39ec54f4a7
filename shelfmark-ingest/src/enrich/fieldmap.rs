//! First-present-key field mapping over external JSON schemas
//!
//! Authority services disagree about where fields live. Each resolver
//! declares an ordered table of candidate paths per field and resolves it
//! through these helpers, so the mapping stays auditable and testable
//! instead of being scattered through inline fallback chains.

use serde_json::Value;

/// Resolve the first dot-separated path that fully exists.
pub(crate) fn pick<'a>(root: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        let mut node = root;
        for key in path.split('.') {
            node = node.get(key)?;
        }
        Some(node)
    })
}

/// First path resolving to a non-empty string.
pub(crate) fn pick_str(root: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        pick(root, &[path])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First path resolving to an unsigned integer, accepting numeric strings.
pub(crate) fn pick_u32(root: &Value, paths: &[&str]) -> Option<u32> {
    paths.iter().find_map(|path| {
        let value = pick(root, &[path])?;
        value
            .as_u64()
            .map(|n| n as u32)
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Flatten a string-or-array-of-strings value.
pub(crate) fn strings_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items.iter().flat_map(strings_of).collect(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("title"))
            .map(strings_of)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Union of all strings found across the given paths, in table order.
pub(crate) fn pick_strings(root: &Value, paths: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for path in paths {
        if let Some(value) = pick(root, &[path]) {
            out.extend(strings_of(value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pick_follows_table_order() {
        let doc = json!({"metadata": {"title": "Nested"}, "title": "Flat"});
        assert_eq!(
            pick_str(&doc, &["metadata.title", "title"]).as_deref(),
            Some("Nested")
        );
        assert_eq!(pick_str(&doc, &["missing", "title"]).as_deref(), Some("Flat"));
    }

    #[test]
    fn pick_u32_accepts_numeric_strings() {
        let doc = json!({"pages": "312", "count": 17});
        assert_eq!(pick_u32(&doc, &["count"]), Some(17));
        assert_eq!(pick_u32(&doc, &["pages"]), Some(312));
        assert_eq!(pick_u32(&doc, &["absent"]), None);
    }

    #[test]
    fn strings_of_flattens_shapes() {
        assert_eq!(strings_of(&json!("one")), vec!["one"]);
        assert_eq!(strings_of(&json!(["a", "b"])), vec!["a", "b"]);
        assert_eq!(strings_of(&json!({"name": "Tolkien"})), vec!["Tolkien"]);
        assert_eq!(
            strings_of(&json!([{"name": "A"}, "B"])),
            vec!["A", "B"]
        );
        assert!(strings_of(&json!(42)).is_empty());
    }
}
