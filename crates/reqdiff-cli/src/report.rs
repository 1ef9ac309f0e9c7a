//! Terminal output

use reqdiff_compare::{map_display_lines_to_paths, PreparedComparison};
use reqdiff_core::{CommandError, ExecutionOutcome, RequestTemplate};
use serde_json::Value;

pub fn suggestion(number: usize, suggested: &str) {
    println!("💡 command {number} has no {{host}} placeholder; did you mean:");
    println!("   {suggested}");
}

pub fn invalid(number: usize, text: &str, error: &CommandError) {
    println!("❌ command {number} skipped: {error}");
    println!("   {text}");
}

pub fn outcomes(number: usize, template: &RequestTemplate, outcomes: &[ExecutionOutcome]) {
    println!("#{number} {} {}", template.method, template.url);
    for outcome in outcomes {
        let marker = match outcome.response() {
            Some(response) if response.is_success() => "✅",
            Some(_) => "⚠️ ",
            None => "❌",
        };
        println!(
            "   {marker} {:<40} {:<24} {:>6}ms",
            outcome.host.base_url(),
            outcome.status_label(),
            outcome.elapsed.as_millis()
        );
    }
}

pub fn comparison(
    reference: &ExecutionOutcome,
    comparison: &ExecutionOutcome,
    prepared: &PreparedComparison,
    annotate_from: Option<&str>,
) {
    if prepared.headline.is_empty() && prepared.body_differences.is_empty() {
        println!("✅ {} and {} match", reference.host, comparison.host);
    } else {
        println!(
            "❌ {} vs {} ({} differences)",
            reference.host,
            comparison.host,
            prepared.headline.len() + prepared.body_differences.len()
        );
        for diff in prepared.headline.iter().chain(&prepared.body_differences) {
            println!("   {diff}");
        }
    }

    println!();
    println!("--- {}", reference.host);
    block(&prepared.reference_text, annotate_from);
    println!("+++ {}", comparison.host);
    block(&prepared.comparison_text, annotate_from);
}

fn block(text: &str, annotate_from: Option<&str>) {
    let paths = annotate_from
        .and_then(|base| serde_json::from_str::<Value>(text).ok().map(|v| (base, v)))
        .map(|(base, value)| map_display_lines_to_paths(&value, base));

    for (i, line) in text.lines().enumerate() {
        match paths.as_ref().and_then(|p| p.get(&(i + 1))) {
            Some(path) => println!("{path:<32} │ {line}"),
            None => println!("{line}"),
        }
    }
}
