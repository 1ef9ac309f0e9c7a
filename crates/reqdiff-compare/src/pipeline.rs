//! Turning a pair of outcomes into two diffable text blocks

use crate::display::{render_value, sort_common_keys_first, sort_keys};
use crate::headline::{
    compare_bodies, compare_headers, default_ignored_headers, summarize_headline, Difference,
};
use crate::ignore::{apply_ignore_rules, ComparisonOptions};
use crate::scope::{scope_by_path, ScopeError};
use reqdiff_core::ExecutionOutcome;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Everything needed to render one side-by-side comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedComparison {
    pub reference_text: String,
    pub comparison_text: String,
    /// Status, timing and (when enabled) header differences
    pub headline: Vec<Difference>,
    /// Path-level differences, empty unless both sides are JSON
    pub body_differences: Vec<Difference>,
}

/// One side's payload: parsed when it is JSON, raw text otherwise
enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    fn from_outcome(outcome: &ExecutionOutcome) -> Self {
        let text = match outcome.response() {
            Some(response) => response.body.clone(),
            None => outcome.status_label(),
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text),
        }
    }
}

/// Normalize, scope and render both sides of a comparison
///
/// Ignore rules see the full payload; the scope narrows what is left. Non-JSON payloads pass through as text. A scope that matches on one side
/// only renders the other side as `null`; a scope that matches nowhere is an
/// error, as is one that does not parse.
pub fn prepare_comparison(
    reference: &ExecutionOutcome,
    comparison: &ExecutionOutcome,
    options: &ComparisonOptions,
    scope: &str,
) -> Result<PreparedComparison, ScopeError> {
    let mut headline = summarize_headline(reference, comparison);
    if options.compare_headers {
        if let (Some(r), Some(c)) = (reference.response(), comparison.response()) {
            headline.extend(compare_headers(r, c, &default_ignored_headers()));
        }
    }

    // Ignored paths address the whole document, so rules run before scoping
    let ignore = |payload: Payload| match payload {
        Payload::Json(value) => Payload::Json(apply_ignore_rules(&value, options)),
        text => text,
    };
    let (left, right) = scope_pair(
        ignore(Payload::from_outcome(reference)),
        ignore(Payload::from_outcome(comparison)),
        scope,
    )?;

    let sort = |payload: Payload| match payload {
        Payload::Json(value) if options.sort_keys => Payload::Json(sort_keys(&value)),
        other => other,
    };
    let (mut left, mut right) = (sort(left), sort(right));

    let mut body_differences = Vec::new();
    if let (Payload::Json(l), Payload::Json(r)) = (&mut left, &mut right) {
        if options.common_keys_first {
            let (sorted_l, sorted_r) = sort_common_keys_first(l, r);
            *l = sorted_l;
            *r = sorted_r;
        }
        body_differences = compare_bodies(l, r);
    }

    debug!(
        headline = headline.len(),
        body = body_differences.len(),
        scope,
        "Prepared comparison"
    );

    Ok(PreparedComparison {
        reference_text: render(left),
        comparison_text: render(right),
        headline,
        body_differences,
    })
}

fn scope_pair(left: Payload, right: Payload, scope: &str) -> Result<(Payload, Payload), ScopeError> {
    if scope.trim().is_empty() {
        return Ok((left, right));
    }

    let mut matched = false;
    let mut narrow = |payload: Payload| -> Result<Payload, ScopeError> {
        match payload {
            Payload::Json(value) => match scope_by_path(&value, scope) {
                Ok(scoped) => {
                    matched = true;
                    Ok(Payload::Json(scoped))
                }
                Err(ScopeError::NoMatch { .. }) => Ok(Payload::Json(Value::Null)),
                Err(e) => Err(e),
            },
            text => Ok(text),
        }
    };

    let left = narrow(left)?;
    let right = narrow(right)?;
    if !matched {
        return Err(ScopeError::NoMatch {
            expression: scope.trim().to_string(),
        });
    }
    Ok((left, right))
}

fn render(payload: Payload) -> String {
    match payload {
        Payload::Json(value) => render_value(&value),
        Payload::Text(text) => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headline::DiffCategory;
    use reqdiff_core::{host, ResponseData};
    use std::time::Duration;

    fn outcome(status: u16, body: &str, headers: &[(&str, &str)]) -> ExecutionOutcome {
        ExecutionOutcome::success(
            host::parse("a.test"),
            Duration::from_millis(50),
            ResponseData {
                status,
                reason: String::new(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.to_string(),
            },
        )
    }

    #[test]
    fn test_json_sides_are_pretty_printed() {
        let prepared = prepare_comparison(
            &outcome(200, r#"{"a":1}"#, &[]),
            &outcome(200, r#"{"a":2}"#, &[]),
            &ComparisonOptions::default(),
            "",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, "{\n  \"a\": 1\n}");
        assert_eq!(prepared.comparison_text, "{\n  \"a\": 2\n}");
        assert!(prepared.headline.is_empty());
        assert_eq!(prepared.body_differences.len(), 1);
    }

    #[test]
    fn test_text_payloads_pass_through() {
        let prepared = prepare_comparison(
            &outcome(200, "plain  text", &[]),
            &outcome(500, "oops", &[]),
            &ComparisonOptions::lenient(),
            "",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, "plain  text");
        assert_eq!(prepared.comparison_text, "oops");
        assert_eq!(prepared.headline[0].category, DiffCategory::Status);
        assert!(prepared.body_differences.is_empty());
    }

    #[test]
    fn test_failure_renders_reason() {
        let failed = ExecutionOutcome::failure(host::parse("b.test"), Duration::from_millis(50), "refused");
        let prepared =
            prepare_comparison(&outcome(200, "{}", &[]), &failed, &ComparisonOptions::default(), "").unwrap();
        assert_eq!(prepared.comparison_text, "failed: refused");
    }

    #[test]
    fn test_ignore_rules_and_scope_apply_to_both_sides() {
        let options = ComparisonOptions {
            ignore_identifiers: true,
            ..Default::default()
        };
        let prepared = prepare_comparison(
            &outcome(200, r#"{"data":{"id":1,"name":"x"}}"#, &[]),
            &outcome(200, r#"{"data":{"id":2,"name":"x"}}"#, &[]),
            &options,
            "$.data",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, prepared.comparison_text);
        assert!(prepared.body_differences.is_empty());
    }

    #[test]
    fn test_ignored_paths_address_the_unscoped_payload() {
        let options = ComparisonOptions::new().ignore_path("$.items[*].etag");
        let prepared = prepare_comparison(
            &outcome(200, r#"{"items":[{"etag":"a","n":1}]}"#, &[]),
            &outcome(200, r#"{"items":[{"etag":"b","n":1}]}"#, &[]),
            &options,
            "$.items",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, "[\n  {\n    \"n\": 1\n  }\n]");
        assert_eq!(prepared.reference_text, prepared.comparison_text);
        assert!(prepared.body_differences.is_empty());
    }

    #[test]
    fn test_array_order_ignored_across_key_orders() {
        let options = ComparisonOptions {
            ignore_array_order: true,
            sort_keys: true,
            ..Default::default()
        };
        let prepared = prepare_comparison(
            &outcome(200, r#"[{"x":1,"a":2},{"b":0}]"#, &[]),
            &outcome(200, r#"[{"b":0},{"a":2,"x":1}]"#, &[]),
            &options,
            "",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, prepared.comparison_text);
        assert!(prepared.body_differences.is_empty());
    }

    #[test]
    fn test_scope_missing_on_one_side_renders_null() {
        let prepared = prepare_comparison(
            &outcome(200, r#"{"extra":[1]}"#, &[]),
            &outcome(200, r#"{}"#, &[]),
            &ComparisonOptions::default(),
            "$.extra",
        )
        .unwrap();
        assert_eq!(prepared.comparison_text, "null");
    }

    #[test]
    fn test_scope_errors_are_returned() {
        let left = outcome(200, r#"{"a":1}"#, &[]);
        let right = outcome(200, r#"{"a":2}"#, &[]);
        let options = ComparisonOptions::default();

        assert!(matches!(
            prepare_comparison(&left, &right, &options, "$.[").unwrap_err(),
            ScopeError::InvalidSyntax { .. }
        ));
        assert!(matches!(
            prepare_comparison(&left, &right, &options, "$.b").unwrap_err(),
            ScopeError::NoMatch { .. }
        ));
    }

    #[test]
    fn test_common_keys_first_for_display() {
        let options = ComparisonOptions {
            common_keys_first: true,
            ..Default::default()
        };
        let prepared = prepare_comparison(
            &outcome(200, r#"{"b":1,"a":2}"#, &[]),
            &outcome(200, r#"{"a":3,"c":4}"#, &[]),
            &options,
            "",
        )
        .unwrap();
        assert_eq!(prepared.reference_text, "{\n  \"a\": 2,\n  \"b\": 1\n}");
        assert_eq!(prepared.comparison_text, "{\n  \"a\": 3,\n  \"c\": 4\n}");
    }

    #[test]
    fn test_header_comparison_is_opt_in() {
        let left = outcome(200, "{}", &[("X-Version", "1"), ("Date", "a")]);
        let right = outcome(200, "{}", &[("X-Version", "2"), ("Date", "b")]);

        let off = prepare_comparison(&left, &right, &ComparisonOptions::default(), "").unwrap();
        assert!(off.headline.is_empty());

        let on = prepare_comparison(&left, &right, &ComparisonOptions::new().with_header_comparison(), "")
            .unwrap();
        assert_eq!(on.headline.len(), 1);
        assert_eq!(on.headline[0].path, "header.x-version");
    }
}
