//! Headline differences between two outcomes

use crate::path;
use reqdiff_core::{ExecutionOutcome, ResponseData};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Elapsed-time divergence below this is treated as jitter
pub const TIMING_THRESHOLD: Duration = Duration::from_millis(500);

/// Headers that differ between any two servers
pub const DEFAULT_IGNORED_HEADERS: &[&str] = &["date", "server", "content-length"];

/// A specific difference between two responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difference {
    pub category: DiffCategory,
    pub path: String,
    pub reference_value: String,
    pub comparison_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffCategory {
    Status,
    Timing,
    Header,
    Structure,
    Value,
    Missing,
    Extra,
}

impl std::fmt::Display for DiffCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DiffCategory::Status => "STATUS",
            DiffCategory::Timing => "TIMING",
            DiffCategory::Header => "HEADER",
            DiffCategory::Structure => "STRUCTURE",
            DiffCategory::Value => "VALUE",
            DiffCategory::Missing => "MISSING",
            DiffCategory::Extra => "EXTRA",
        };
        f.pad(label)
    }
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:>9}] {} : reference={} comparison={}",
            self.category, self.path, self.reference_value, self.comparison_value
        )
    }
}

/// Status and timing differences between two outcomes
///
/// A failed outcome counts as its own status, distinct from every code.
pub fn summarize_headline(reference: &ExecutionOutcome, comparison: &ExecutionOutcome) -> Vec<Difference> {
    let mut differences = Vec::new();

    if reference.status() != comparison.status() {
        differences.push(Difference {
            category: DiffCategory::Status,
            path: "status".to_string(),
            reference_value: reference.status_label(),
            comparison_value: comparison.status_label(),
        });
    }

    let gap = if reference.elapsed > comparison.elapsed {
        reference.elapsed - comparison.elapsed
    } else {
        comparison.elapsed - reference.elapsed
    };
    if gap > TIMING_THRESHOLD {
        differences.push(Difference {
            category: DiffCategory::Timing,
            path: "elapsed".to_string(),
            reference_value: format!("{}ms", reference.elapsed.as_millis()),
            comparison_value: format!("{}ms", comparison.elapsed.as_millis()),
        });
    }

    differences
}

/// Header differences, names compared case-insensitively
pub fn compare_headers(
    reference: &ResponseData,
    comparison: &ResponseData,
    ignored: &HashSet<String>,
) -> Vec<Difference> {
    let collect = |response: &ResponseData| -> BTreeMap<String, String> {
        response
            .headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .filter(|(k, _)| !ignored.contains(k))
            .collect()
    };
    let ref_headers = collect(reference);
    let cmp_headers = collect(comparison);

    let mut differences = Vec::new();
    for (key, value) in &ref_headers {
        match cmp_headers.get(key) {
            Some(other) if other != value => differences.push(Difference {
                category: DiffCategory::Header,
                path: format!("header.{key}"),
                reference_value: value.clone(),
                comparison_value: other.clone(),
            }),
            Some(_) => {}
            None => differences.push(Difference {
                category: DiffCategory::Missing,
                path: format!("header.{key}"),
                reference_value: value.clone(),
                comparison_value: "(missing)".to_string(),
            }),
        }
    }
    for (key, value) in &cmp_headers {
        if !ref_headers.contains_key(key) {
            differences.push(Difference {
                category: DiffCategory::Extra,
                path: format!("header.{key}"),
                reference_value: "(not present)".to_string(),
                comparison_value: value.clone(),
            });
        }
    }
    differences
}

pub fn default_ignored_headers() -> HashSet<String> {
    DEFAULT_IGNORED_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Path-level differences between two JSON bodies
pub fn compare_bodies(reference: &Value, comparison: &Value) -> Vec<Difference> {
    let mut differences = Vec::new();
    compare_json("$", reference, comparison, &mut differences);
    differences
}

fn compare_json(at: &str, reference: &Value, comparison: &Value, differences: &mut Vec<Difference>) {
    match (reference, comparison) {
        (Value::Object(ref_obj), Value::Object(cmp_obj)) => {
            for (key, ref_value) in ref_obj {
                let child = path::child_key(at, key);
                match cmp_obj.get(key) {
                    Some(cmp_value) => compare_json(&child, ref_value, cmp_value, differences),
                    None => differences.push(Difference {
                        category: DiffCategory::Missing,
                        path: child,
                        reference_value: ref_value.to_string(),
                        comparison_value: "(missing)".to_string(),
                    }),
                }
            }

            for (key, cmp_value) in cmp_obj {
                if !ref_obj.contains_key(key) {
                    differences.push(Difference {
                        category: DiffCategory::Extra,
                        path: path::child_key(at, key),
                        reference_value: "(not present)".to_string(),
                        comparison_value: cmp_value.to_string(),
                    });
                }
            }
        }
        (Value::Array(ref_arr), Value::Array(cmp_arr)) => {
            if ref_arr.len() != cmp_arr.len() {
                differences.push(Difference {
                    category: DiffCategory::Structure,
                    path: format!("{at}.length"),
                    reference_value: ref_arr.len().to_string(),
                    comparison_value: cmp_arr.len().to_string(),
                });
            }

            for (i, (ref_elem, cmp_elem)) in ref_arr.iter().zip(cmp_arr).enumerate() {
                compare_json(&path::child_index(at, i), ref_elem, cmp_elem, differences);
            }
        }
        _ if kind(reference) != kind(comparison) => differences.push(Difference {
            category: DiffCategory::Structure,
            path: at.to_string(),
            reference_value: kind(reference).to_string(),
            comparison_value: kind(comparison).to_string(),
        }),
        _ => {
            if reference != comparison {
                differences.push(Difference {
                    category: DiffCategory::Value,
                    path: at.to_string(),
                    reference_value: reference.to_string(),
                    comparison_value: comparison.to_string(),
                });
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
