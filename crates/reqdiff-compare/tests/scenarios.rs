//! Comparison scenarios on literal payloads

use reqdiff_compare::{
    apply_ignore_rules, map_display_lines_to_paths, prepare_comparison, render_value, scope_by_path,
    sort_common_keys_first, suggest_next_segments, ComparisonOptions, DiffCategory,
};
use reqdiff_core::{host, ExecutionOutcome, ResponseData};
use serde_json::json;
use std::time::Duration;

fn outcome(host_text: &str, status: u16, millis: u64, body: &str) -> ExecutionOutcome {
    ExecutionOutcome::success(
        host::parse(host_text),
        Duration::from_millis(millis),
        ResponseData {
            status,
            reason: String::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        },
    )
}

#[test]
fn test_common_keys_first_scenario() {
    let (left, right) = sort_common_keys_first(&json!({"b": 1, "a": 2}), &json!({"a": 3, "c": 4}));
    assert_eq!(render_value(&left), render_value(&json!({"a": 2, "b": 1})));
    assert_eq!(render_value(&right), render_value(&json!({"a": 3, "c": 4})));
}

#[test]
fn test_scope_scenario() {
    let value = json!({"items": [{"id": 1}, {"id": 2}]});
    assert_eq!(scope_by_path(&value, "$.items[*].id").unwrap(), json!([1, 2]));
}

#[test]
fn test_staging_against_production() {
    let production = outcome(
        "api.example.com",
        200,
        120,
        r#"{"items":[{"id":"a1","name":"Widget","updated_at":"2024-05-01T10:00:00Z"}],"total":1}"#,
    );
    let staging = outcome(
        "staging.example.com",
        200,
        900,
        r#"{"total":1,"items":[{"id":"b7","name":"widget ","updated_at":"2024-06-01T10:00:00Z"}]}"#,
    );

    let strict = prepare_comparison(&production, &staging, &ComparisonOptions::default(), "").unwrap();
    assert_eq!(strict.headline.len(), 1);
    assert_eq!(strict.headline[0].category, DiffCategory::Timing);
    assert!(!strict.body_differences.is_empty());

    let options = ComparisonOptions {
        case_insensitive: true,
        sort_keys: true,
        ..ComparisonOptions::lenient()
    };
    let lenient = prepare_comparison(&production, &staging, &options, "$.items").unwrap();
    assert_eq!(lenient.reference_text, lenient.comparison_text);
    assert!(lenient.body_differences.is_empty());
}

#[test]
fn test_navigation_round_trip() {
    let samples = [
        json!({"data": {"users": [{"login": "ada"}]}}),
        json!({"data": {"users": [{"login": "bob", "admin": true}]}}),
    ];
    assert_eq!(suggest_next_segments(&samples, "$.data", "u"), vec!["users"]);
    assert_eq!(suggest_next_segments(&samples, "$.data.users", ""), vec!["[*]"]);
    assert_eq!(
        suggest_next_segments(&samples, "$.data.users[*]", ""),
        vec!["admin", "login"]
    );

    // Every printed line leads back to a path that scopes to something
    let lines = map_display_lines_to_paths(&samples[1], "");
    for path in lines.values() {
        assert!(scope_by_path(&samples[1], path).is_ok(), "{path}");
    }
}

#[test]
fn test_ignore_rules_leave_other_side_shape() {
    let options = ComparisonOptions::new().ignore_path("$..secret");
    let value = json!({"a": {"secret": 1, "b": [{"secret": 2, "c": 3}]}});
    assert_eq!(
        apply_ignore_rules(&value, &options),
        json!({"a": {"b": [{"c": 3}]}})
    );
}
