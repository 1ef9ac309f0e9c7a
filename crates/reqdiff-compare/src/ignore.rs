//! Comparison options and the ignore rules they switch on

use crate::display::sort_keys;
use crate::path::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{trace, warn};

/// Audit-timestamp field names that contain neither "time" nor "date"
const TIMESTAMP_ALIASES: &[&str] = &[
    "ts",
    "created",
    "created_at",
    "modified",
    "last_modified",
    "expires",
    "expiry",
    "exp",
    "iat",
    "nbf",
    "last_seen",
];

const IDENTIFIER_ALIASES: &[&str] = &["id", "_id", "uuid", "guid"];

/// Toggles applied identically to both sides of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    /// Drop fields that look like timestamps
    pub ignore_timestamps: bool,
    /// Drop `id`, `_id`, `uuid` and `guid` fields
    pub ignore_identifiers: bool,
    /// Trim and collapse whitespace inside strings
    pub normalize_whitespace: bool,
    /// Lower-case every string and key
    pub case_insensitive: bool,
    /// Sort array elements so their order does not matter
    pub ignore_array_order: bool,
    /// Path expressions removed from both sides
    pub ignored_paths: Vec<String>,
    /// Sort object keys alphabetically for display
    pub sort_keys: bool,
    /// Put keys present on both sides first for display
    pub common_keys_first: bool,
    /// Report header differences in the headline
    pub compare_headers: bool,
}

impl ComparisonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header_comparison(mut self) -> Self {
        self.compare_headers = true;
        self
    }

    pub fn ignore_path(mut self, expression: &str) -> Self {
        self.ignored_paths.push(expression.to_string());
        self
    }

    /// Turn on every rule that drops or rewrites volatile data
    pub fn lenient() -> Self {
        Self {
            ignore_timestamps: true,
            ignore_identifiers: true,
            normalize_whitespace: true,
            ignore_array_order: true,
            ..Self::default()
        }
    }
}

/// Apply the enabled rules to a copy of `value`
///
/// Rules run in a fixed order: timestamps, identifiers, whitespace, case,
/// array order, then user paths. A user path that fails to parse is
/// skipped.
pub fn apply_ignore_rules(value: &Value, options: &ComparisonOptions) -> Value {
    let mut value = value.clone();

    if options.ignore_timestamps {
        drop_keys(&mut value, &is_timestamp_key);
    }
    if options.ignore_identifiers {
        drop_keys(&mut value, &is_identifier_key);
    }
    if options.normalize_whitespace {
        map_strings(&mut value, &|s: &str| s.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    if options.case_insensitive {
        lowercase_keys(&mut value);
        map_strings(&mut value, &|s: &str| s.to_lowercase());
    }
    if options.ignore_array_order {
        sort_arrays(&mut value);
    }

    for expression in &options.ignored_paths {
        match JsonPath::parse(expression) {
            Ok(path) => {
                let removed = path.remove_from(&mut value);
                trace!(expression = %expression, removed, "Removed ignored path");
            }
            Err(e) => warn!(expression = %expression, error = %e, "Skipping invalid ignore path"),
        }
    }

    value
}

fn is_timestamp_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("time") || key.contains("date") || TIMESTAMP_ALIASES.contains(&key.as_str())
}

fn is_identifier_key(key: &str) -> bool {
    let key = key.to_lowercase();
    IDENTIFIER_ALIASES.contains(&key.as_str())
}

fn drop_keys(value: &mut Value, matches: &dyn Fn(&str) -> bool) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !matches(key));
            for child in map.values_mut() {
                drop_keys(child, matches);
            }
        }
        Value::Array(items) => {
            for child in items {
                drop_keys(child, matches);
            }
        }
        _ => {}
    }
}

fn map_strings(value: &mut Value, f: &dyn Fn(&str) -> String) {
    match value {
        Value::String(s) => *s = f(s),
        Value::Object(map) => {
            for child in map.values_mut() {
                map_strings(child, f);
            }
        }
        Value::Array(items) => {
            for child in items {
                map_strings(child, f);
            }
        }
        _ => {}
    }
}

fn lowercase_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let lowered: Map<String, Value> = std::mem::take(map)
                .into_iter()
                .map(|(key, mut child)| {
                    lowercase_keys(&mut child);
                    (key.to_lowercase(), child)
                })
                .collect();
            *map = lowered;
        }
        Value::Array(items) => items.iter_mut().for_each(lowercase_keys),
        _ => {}
    }
}

fn sort_arrays(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(sort_arrays),
        Value::Array(items) => {
            items.iter_mut().for_each(sort_arrays);
            items.sort_by_cached_key(|item| sort_keys(item).to_string());
        }
        _ => {}
    }
}
