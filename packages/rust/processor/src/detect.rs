//! Content-type sniffing for raw agent output.
//!
//! Detection is ordered and the first match wins:
//! structured value, JSON text, YAML text, Markdown, HTML, CSV, plain text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use outputkit_shared::{OutputContent, OutputType};

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

static MD_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s").expect("valid regex"));

static MD_BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*").expect("valid regex"));

static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]\(.*?\)").expect("valid regex"));

/// Any one of these marks text as Markdown.
static MD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^#{1,6}\s+",
        r"\*\*.*?\*\*",
        r"\*.*?\*",
        r"(?m)^\s*[\-\*\+]\s+",
        r"(?m)^\s*\d+\.\s+",
        r"\[.*?\]\(.*?\)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Classify a raw value and produce the content it will be stored as.
///
/// Mappings and sequences are JSON and pass through unchanged. Strings go
/// through [`detect_text`]. Any other scalar is stringified as text.
pub fn detect_output_type(raw: &Value) -> (OutputType, OutputContent) {
    match raw {
        Value::Object(map) => (OutputType::Json, OutputContent::Mapping(map.clone())),
        Value::Array(items) => (OutputType::Json, OutputContent::Sequence(items.clone())),
        Value::String(text) => detect_text(text),
        other => (OutputType::Text, OutputContent::Text(other.to_string())),
    }
}

/// Classify raw text.
///
/// JSON and YAML only count when they parse to a mapping or a sequence; the
/// parsed value then becomes the content. YAML is not attempted when the text
/// carries a Markdown header, bold run or link, since plain prose and Markdown
/// lists are frequently valid YAML.
pub fn detect_text(text: &str) -> (OutputType, OutputContent) {
    if let Some(content) = parse_json_container(text) {
        return (OutputType::Json, content);
    }

    if !has_strong_markdown_signal(text) {
        if let Some(content) = parse_yaml_container(text) {
            return (OutputType::Yaml, content);
        }
    }

    let output_type = if is_markdown(text) {
        OutputType::Markdown
    } else if is_html(text) {
        OutputType::Html
    } else if is_csv(text) {
        OutputType::Csv
    } else {
        OutputType::Text
    };

    (output_type, OutputContent::Text(text.to_string()))
}

/// True when any Markdown heuristic matches.
pub fn is_markdown(text: &str) -> bool {
    MD_PATTERNS.iter().any(|re| re.is_match(text))
}

/// True when the text contains a tag-like `<...>` run.
pub fn is_html(text: &str) -> bool {
    HTML_TAG_RE.is_match(text)
}

/// At least two lines, and the first three share the same non-zero comma count.
pub fn is_csv(text: &str) -> bool {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    if lines.len() < 2 {
        return false;
    }

    let counts: Vec<usize> = lines
        .iter()
        .take(3)
        .map(|line| line.matches(',').count())
        .collect();
    counts[0] > 0 && counts.iter().all(|&c| c == counts[0])
}

fn has_strong_markdown_signal(text: &str) -> bool {
    MD_HEADER_RE.is_match(text) || MD_BOLD_RE.is_match(text) || MD_LINK_RE.is_match(text)
}

fn parse_json_container(text: &str) -> Option<OutputContent> {
    match serde_json::from_str::<Value>(text.trim()).ok()? {
        Value::Object(map) => Some(OutputContent::Mapping(map)),
        Value::Array(items) => Some(OutputContent::Sequence(items)),
        _ => None,
    }
}

fn parse_yaml_container(text: &str) -> Option<OutputContent> {
    match serde_yaml::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(OutputContent::Mapping(map)),
        Value::Array(items) => Some(OutputContent::Sequence(items)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mappings_are_json_and_unchanged() {
        let raw = json!({"a": 1, "b": ["x"]});
        let (ty, content) = detect_output_type(&raw);
        assert_eq!(ty, OutputType::Json);
        assert_eq!(content.to_value(), raw);
    }

    #[test]
    fn json_text_is_parsed() {
        let (ty, content) = detect_text(r#"{"summary": "ok"}"#);
        assert_eq!(ty, OutputType::Json);
        assert!(content.as_mapping().is_some());
    }

    #[test]
    fn json_scalars_are_not_json() {
        let (ty, content) = detect_text("42");
        assert_eq!(ty, OutputType::Text);
        assert_eq!(content.as_text(), Some("42"));
    }

    #[test]
    fn yaml_mapping_detected() {
        let (ty, content) = detect_text("title: Report\nitems:\n  - one\n  - two\n");
        assert_eq!(ty, OutputType::Yaml);
        let map = content.as_mapping().expect("mapping");
        assert_eq!(map["title"], json!("Report"));
    }

    #[test]
    fn markdown_header_beats_yaml() {
        let (ty, _) = detect_text("# Title\n\nSome content with **bold** text.");
        assert_eq!(ty, OutputType::Markdown);
    }

    #[test]
    fn html_detected() {
        let (ty, _) = detect_text("<div>hello</div>");
        assert_eq!(ty, OutputType::Html);
    }

    #[test]
    fn csv_detected() {
        assert!(is_csv("name,score\nalice,3\nbob,4"));
        assert!(!is_csv("name,score\nalice;3"));
        assert!(!is_csv("just one line, with comma"));
        let (ty, _) = detect_text("name,score\nalice,3\nbob,4");
        assert_eq!(ty, OutputType::Csv);
    }

    #[test]
    fn plain_prose_is_text() {
        let (ty, content) = detect_text("The market grew steadily this quarter.");
        assert_eq!(ty, OutputType::Text);
        assert_eq!(content.as_text(), Some("The market grew steadily this quarter."));
    }

    #[test]
    fn non_string_scalars_stringified() {
        let (ty, content) = detect_output_type(&json!(3.5));
        assert_eq!(ty, OutputType::Text);
        assert_eq!(content.as_text(), Some("3.5"));

        let (ty, content) = detect_output_type(&Value::Null);
        assert_eq!(ty, OutputType::Text);
        assert_eq!(content.as_text(), Some("null"));
    }
}
