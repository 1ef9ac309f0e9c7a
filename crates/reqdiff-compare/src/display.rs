//! Stable pretty-printing and key ordering

use crate::path;
use serde_json::{Map, Value};

const INDENT: &str = "  ";

/// Pretty-print a payload if it is JSON, otherwise return it untouched
///
/// With `alphabetical`, object keys are sorted at every level. Array order
/// is never changed.
pub fn format_for_display(raw: &str, alphabetical: bool) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if alphabetical => render_value(&sort_keys(&value)),
        Ok(value) => render_value(&value),
        Err(_) => raw.to_string(),
    }
}

/// Render with two-space indentation and `"key": value` members
pub fn render_value(value: &Value) -> String {
    render_lines(value, "$")
        .into_iter()
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy of `value` with object keys sorted at every level
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Reorder both sides so keys present on both come first
///
/// At each level where both sides are objects, shared keys come first in
/// lexicographic order (recursed into), then each side's own keys in
/// lexicographic order. Anything that is not an object pair is returned
/// as is.
pub fn sort_common_keys_first(left: &Value, right: &Value) -> (Value, Value) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut common: Vec<&String> = l.keys().filter(|k| r.contains_key(*k)).collect();
            common.sort();

            let mut new_left = Map::new();
            let mut new_right = Map::new();
            for key in common {
                let (lv, rv) = sort_common_keys_first(&l[key], &r[key]);
                new_left.insert(key.clone(), lv);
                new_right.insert(key.clone(), rv);
            }

            append_own_keys(&mut new_left, l, r);
            append_own_keys(&mut new_right, r, l);
            (Value::Object(new_left), Value::Object(new_right))
        }
        _ => (left.clone(), right.clone()),
    }
}

fn append_own_keys(target: &mut Map<String, Value>, own: &Map<String, Value>, other: &Map<String, Value>) {
    let mut only: Vec<&String> = own.keys().filter(|k| !other.contains_key(*k)).collect();
    only.sort();
    for key in only {
        target.insert(key.clone(), own[key].clone());
    }
}

/// One printed line and the path of the node that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderedLine {
    pub text: String,
    pub path: String,
}

pub(crate) fn render_lines(value: &Value, base_path: &str) -> Vec<RenderedLine> {
    let mut lines = Vec::new();
    emit(value, base_path, 0, String::new(), "", &mut lines);
    lines
}

/// Emit `value` at `depth`; `lead` goes before the value on its first
/// line (a key), `trail` after its last line (a comma)
fn emit(
    value: &Value,
    node_path: &str,
    depth: usize,
    lead: String,
    trail: &str,
    lines: &mut Vec<RenderedLine>,
) {
    let indent = INDENT.repeat(depth);
    let line = |text: String| RenderedLine {
        text,
        path: node_path.to_string(),
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            lines.push(line(format!("{indent}{lead}{{")));
            let last = map.len() - 1;
            for (i, (key, child)) in map.iter().enumerate() {
                let key_text = format!("{}: ", Value::String(key.clone()));
                let comma = if i == last { "" } else { "," };
                emit(child, &path::child_key(node_path, key), depth + 1, key_text, comma, lines);
            }
            lines.push(line(format!("{indent}}}{trail}")));
        }
        Value::Array(items) if !items.is_empty() => {
            lines.push(line(format!("{indent}{lead}[")));
            let last = items.len() - 1;
            for (i, child) in items.iter().enumerate() {
                let comma = if i == last { "" } else { "," };
                emit(child, &path::child_index(node_path, i), depth + 1, String::new(), comma, lines);
            }
            lines.push(line(format!("{indent}]{trail}")));
        }
        scalar => lines.push(line(format!("{indent}{lead}{scalar}{trail}"))),
    }
}
