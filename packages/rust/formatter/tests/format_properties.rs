//! Property-based tests for formatting.
//!
//! Properties:
//! 1. Escaped HTML never contains raw `<`, `>`, or quotes
//! 2. Any target string yields output (an error string at worst)
//! 3. Short CSV content reads back unchanged
//! 4. Aggregated JSON always holds one element per output

use proptest::prelude::*;
use serde_json::Value;

use outputkit_formatter::{FormatOptions, OutputFormatter, escape_html};
use outputkit_processor::{ProcessRequest, process};

fn fast_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

fn raw_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 <>&\"',.#*\n]{0,120}",
        "[a-z ]{1,40}".prop_map(|s| format!("# Heading\n\n{s} **bold**")),
        "[a-z]{1,8}".prop_map(|k| format!("{{\"{k}\": [1, 2]}}")),
    ]
}

fn target() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("json".to_string()),
        Just("html".to_string()),
        Just("markdown".to_string()),
        Just("csv".to_string()),
        Just("xml".to_string()),
        Just("summary".to_string()),
        "[a-z]{1,10}",
    ]
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(fast_config())]

    #[test]
    fn escape_removes_markup(text in ".{0,80}") {
        let escaped = escape_html(&text);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
        prop_assert!(!escaped.contains('\''));
    }

    #[test]
    fn any_target_renders(raw in raw_text(), target in target()) {
        let output = process(raw, &ProcessRequest::new("agent_0", "Writer"), None);
        let rendered = OutputFormatter::new().format_output(&output, &target, &FormatOptions::default());
        prop_assert!(!rendered.is_empty());
    }

    #[test]
    fn csv_content_reads_back(text in "[a-zA-Z ,\"]{1,200}") {
        let output = process(
            Value::String(text.clone()),
            &ProcessRequest::new("agent_0", "Writer"),
            None,
        );
        let rendered = OutputFormatter::new().format_output(&output, "csv", &FormatOptions::default());
        let mut reader = csv::Reader::from_reader(rendered.as_bytes());
        let content = reader
            .records()
            .filter_map(|r| r.ok())
            .find(|r| &r[0] == "Content")
            .map(|r| r[1].to_string());
        prop_assert_eq!(content, Some(output.content().to_text()));
    }

    #[test]
    fn aggregated_json_length(raws in prop::collection::vec(raw_text(), 0..6)) {
        let request = ProcessRequest::new("agent_0", "Writer");
        let outputs: Vec<_> = raws.into_iter().map(|r| process(r, &request, None)).collect();
        let rendered = OutputFormatter::new()
            .format_multiple_outputs(&outputs, "json", true, &FormatOptions::default());
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        prop_assert_eq!(parsed.as_array().map(Vec::len), Some(outputs.len()));
    }
}
