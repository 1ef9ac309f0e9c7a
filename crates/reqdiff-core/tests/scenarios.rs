//! End-to-end parsing scenarios: command text and host text in, requests out

use reqdiff_core::command::{self, CommandError};
use reqdiff_core::{host, resolve};

#[test]
fn test_placeholder_resolves_against_schemeless_host() {
    let template = command::parse("curl {host}/users");
    let request = resolve::resolve(&template, &host::parse("api.example.com"));
    assert_eq!(request.url, "http://api.example.com/users");
}

#[test]
fn test_post_command_fields() {
    let template = command::parse(
        r#"curl -X POST -H 'Content-Type: application/json' -d '{"a":1}' {host}/x"#,
    );
    assert_eq!(template.method, "POST");
    assert_eq!(template.headers.len(), 1);
    assert_eq!(template.headers["Content-Type"], "application/json");
    assert_eq!(template.body.as_deref(), Some(r#"{"a":1}"#));
    assert_eq!(template.url, "{host}/x");
}

#[test]
fn test_unknown_flag_is_named_in_reason() {
    let err = command::validate("curl --bogus-flag http://x").unwrap_err();
    assert!(matches!(err, CommandError::UnknownFlag { .. }));
    assert!(err.to_string().contains("--bogus-flag"));
}

#[test]
fn test_invalid_commands_do_not_affect_siblings() {
    let commands = [
        "curl {host}/ok",
        "curl --nope {host}/bad",
        "curl -H",
        "curl {host}/also-ok",
    ];
    let verdicts: Vec<bool> = commands
        .iter()
        .map(|text| command::validate(text).is_ok())
        .collect();
    assert_eq!(verdicts, vec![true, false, false, true]);

    let hosts = host::parse_many(["one.test", "two.test"]);
    let template = command::parse(commands[3]);
    let urls: Vec<_> = resolve::batch_resolve(&template, &hosts)
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(urls, vec!["http://one.test/also-ok", "http://two.test/also-ok"]);
}

#[test]
fn test_suggestion_then_accept_round_trip() {
    let original = "curl -s https://prod.example.com/v1/items?page=2";
    assert!(!command::has_placeholder(original));

    let suggestion = command::auto_detect_placeholder(original).expect("suggestion");
    assert_eq!(suggestion, "curl -s {host}/v1/items?page=2");
    assert!(command::validate(&suggestion).is_ok());

    let request = resolve::resolve(
        &command::parse(&suggestion),
        &host::parse("staging.example.com:8080"),
    );
    assert_eq!(request.url, "http://staging.example.com:8080/v1/items?page=2");
}
