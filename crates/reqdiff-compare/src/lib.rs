//! Response comparison for reqdiff
//!
//! Takes two [`ExecutionOutcome`](reqdiff_core::ExecutionOutcome)s and
//! produces text blocks that diff cleanly: volatile fields dropped, keys
//! ordered, payloads narrowed to a path, plus a short list of headline
//! differences.
//!
//! ```
//! use reqdiff_compare::{scope_by_path, sort_common_keys_first};
//! use serde_json::json;
//!
//! let (l, r) = sort_common_keys_first(&json!({"b": 1, "a": 2}), &json!({"a": 3, "c": 4}));
//! assert_eq!(l.as_object().unwrap().keys().collect::<Vec<_>>(), ["a", "b"]);
//! assert_eq!(r.as_object().unwrap().keys().collect::<Vec<_>>(), ["a", "c"]);
//!
//! let ids = scope_by_path(&json!({"items": [{"id": 1}, {"id": 2}]}), "$.items[*].id").unwrap();
//! assert_eq!(ids, json!([1, 2]));
//! ```

pub mod display;
pub mod headline;
pub mod ignore;
pub mod navigator;
pub mod path;
pub mod pipeline;
pub mod scope;

pub use display::{format_for_display, render_value, sort_common_keys_first, sort_keys};
pub use headline::{
    compare_bodies, compare_headers, summarize_headline, DiffCategory, Difference, TIMING_THRESHOLD,
};
pub use ignore::{apply_ignore_rules, ComparisonOptions};
pub use navigator::{map_display_lines_to_paths, suggest_next_segments};
pub use path::{JsonPath, PathSyntaxError};
pub use pipeline::{prepare_comparison, PreparedComparison};
pub use scope::{scope_by_path, ScopeError};
