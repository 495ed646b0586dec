//! Property-based tests for content-type detection and processing.
//!
//! Properties:
//! 1. Text with a leading `# ` header is always Markdown
//! 2. Text containing a `**bold**` run is always Markdown
//! 3. Mappings and sequences are JSON and pass through unchanged
//! 4. `to_dict` output re-serializes with the same id, status and type

use proptest::prelude::*;
use serde_json::{Map, Value};

use outputkit_processor::{ProcessRequest, detect_output_type, detect_text, process};
use outputkit_shared::{OutputType, StructuredOutput};

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

fn prose() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:]{0,40}"
}

fn header_document() -> impl Strategy<Value = String> {
    ("[a-zA-Z0-9 ]{1,30}", prop::collection::vec(prose(), 0..4))
        .prop_map(|(title, body)| {
            let mut doc = format!("# {title}");
            for line in body {
                doc.push('\n');
                doc.push_str(&line);
            }
            doc
        })
}

fn bold_document() -> impl Strategy<Value = String> {
    ("[a-z ]{0,20}", "[a-zA-Z]{1,12}", "[a-z .]{0,20}")
        .prop_map(|(before, word, after)| format!("{before}**{word}**{after}"))
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z ]{0,20}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn mapping() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z_]{1,10}", leaf(), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(fast_config())]

    #[test]
    fn header_text_is_markdown(doc in header_document()) {
        let (ty, _) = detect_text(&doc);
        prop_assert_eq!(ty, OutputType::Markdown);
    }

    #[test]
    fn bold_text_is_markdown(doc in bold_document()) {
        let (ty, content) = detect_text(&doc);
        prop_assert_eq!(ty, OutputType::Markdown);
        prop_assert_eq!(content.as_text(), Some(doc.as_str()));
    }

    #[test]
    fn mappings_pass_through(map in mapping()) {
        let raw = Value::Object(map);
        let (ty, content) = detect_output_type(&raw);
        prop_assert_eq!(ty, OutputType::Json);
        prop_assert_eq!(content.to_value(), raw);
    }

    #[test]
    fn sequences_pass_through(items in prop::collection::vec(leaf(), 0..8)) {
        let raw = Value::Array(items);
        let output = process(raw.clone(), &ProcessRequest::new("agent_0", "Analyst"), None);
        prop_assert_eq!(output.output_type(), OutputType::Json);
        prop_assert_eq!(output.content().to_value(), raw);
    }

    #[test]
    fn to_dict_roundtrip(doc in header_document()) {
        let output = process(doc, &ProcessRequest::new("agent_0", "Writer"), None);
        let json = serde_json::to_string(&output.to_dict().unwrap()).unwrap();
        let parsed: StructuredOutput = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(parsed.id(), output.id());
        prop_assert_eq!(parsed.status(), output.status());
        prop_assert_eq!(parsed.output_type(), output.output_type());
    }
}
