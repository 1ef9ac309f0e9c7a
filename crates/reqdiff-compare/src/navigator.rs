//! Interactive path narrowing: completions and line-to-path lookup

use crate::display::render_lines;
use crate::path::JsonPath;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Marker suggested when the prefix lands on an array
pub const ARRAY_WILDCARD: &str = "[*]";

/// Next path segments available below `prefix` in any of `samples`
///
/// Arrays suggest [`ARRAY_WILDCARD`], objects suggest their keys. Suggestions
/// are filtered by a case-insensitive prefix match on `partial`, merged
/// across samples, sorted and de-duplicated. A prefix that does not parse
/// suggests nothing.
pub fn suggest_next_segments(samples: &[Value], prefix: &str, partial: &str) -> Vec<String> {
    let Ok(path) = JsonPath::parse(prefix) else {
        return Vec::new();
    };
    let partial = partial.to_lowercase();

    let mut suggestions = BTreeSet::new();
    for sample in samples {
        for node in path.select(sample) {
            match node {
                Value::Array(_) => {
                    suggestions.insert(ARRAY_WILDCARD.to_string());
                }
                Value::Object(map) => suggestions.extend(map.keys().cloned()),
                _ => {}
            }
        }
    }

    suggestions
        .into_iter()
        .filter(|segment| segment.to_lowercase().starts_with(&partial))
        .collect()
}

/// Map each 1-based line of the pretty-printed `value` to the path that
/// produced it
///
/// Lines come from the same printer as the comparison text. A closing
/// bracket maps to its container.
pub fn map_display_lines_to_paths(value: &Value, base_path: &str) -> BTreeMap<usize, String> {
    let base = match base_path.trim() {
        "" => "$",
        other => other,
    };
    render_lines(value, base)
        .into_iter()
        .enumerate()
        .map(|(i, line)| (i + 1, line.path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_suggestions_merge_across_samples() {
        let samples = [
            json!({"user": {"name": "a", "email": "x"}}),
            json!({"user": {"name": "b", "Nickname": "bee"}}),
        ];
        assert_eq!(
            suggest_next_segments(&samples, "$.user", ""),
            vec!["Nickname", "email", "name"]
        );
        assert_eq!(
            suggest_next_segments(&samples, "$.user", "N"),
            vec!["Nickname", "name"]
        );
    }

    #[test]
    fn test_arrays_suggest_wildcard() {
        let samples = [json!({"items": [{"id": 1}]})];
        assert_eq!(suggest_next_segments(&samples, "$.items", ""), vec!["[*]"]);
        assert_eq!(suggest_next_segments(&samples, "$.items[*]", ""), vec!["id"]);
    }

    #[test]
    fn test_root_and_invalid_prefixes() {
        let samples = [json!({"b": 1, "a": 2})];
        assert_eq!(suggest_next_segments(&samples, "", ""), vec!["a", "b"]);
        assert!(suggest_next_segments(&samples, "$[", "").is_empty());
        assert!(suggest_next_segments(&samples, "$.missing", "").is_empty());
    }

    #[test]
    fn test_line_paths() {
        let value = json!({"user": {"name": "ada"}, "tags": ["x"]});
        // {
        //   "user": {
        //     "name": "ada"
        //   },
        //   "tags": [
        //     "x"
        //   ]
        // }
        let map = map_display_lines_to_paths(&value, "");
        assert_eq!(map.len(), 8);
        assert_eq!(map[&1], "$");
        assert_eq!(map[&2], "$.user");
        assert_eq!(map[&3], "$.user.name");
        assert_eq!(map[&4], "$.user");
        assert_eq!(map[&5], "$.tags");
        assert_eq!(map[&6], "$.tags[0]");
        assert_eq!(map[&7], "$.tags");
        assert_eq!(map[&8], "$");
    }

    #[test]
    fn test_line_paths_extend_base() {
        let map = map_display_lines_to_paths(&json!([1, 2]), "$.items");
        assert_eq!(map[&2], "$.items[0]");
        assert_eq!(map[&3], "$.items[1]");
    }
}
