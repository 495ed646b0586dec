//! Built-in validation rules and rule factories.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use outputkit_shared::{OutputContent, OutputStatus, OutputType, StructuredOutput};

use crate::ValidationRule;

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

static MARKDOWN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?m)^#{1,6}\s", r"\*\*.*?\*\*", r"\*.*?\*", r"(?m)^\s*[-*+]\s"]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<script[^>]*>",
        r"(?i)javascript:",
        r"(?i)eval\s*\(",
        r"(?i)exec\s*\(",
        r"(?i)system\s*\(",
        r"(?i)rm\s+-rf",
        r"(?i)format\s+c:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+").expect("valid regex"));

/// Allowed relative difference between reported and actual word counts.
const WORD_COUNT_TOLERANCE: f64 = 0.1;

// ---------------------------------------------------------------------------
// Built-in rule set
// ---------------------------------------------------------------------------

/// The fixed rule set every validation runs.
pub fn built_in_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::from_fn(
            "content_exists",
            "Output must have content",
            "Output has no content or empty content",
            |output| !output.content().to_text().trim().is_empty(),
        )
        .with_weight(2.0),
        ValidationRule::from_fn(
            "minimum_content_length",
            "Content must meet minimum length requirements",
            "Content is too short (less than 10 characters)",
            |output| output.content().to_text().chars().count() >= 10,
        )
        .warning_only(),
        ValidationRule::from_fn(
            "status_consistency",
            "Status should match validation results",
            "Status is SUCCESS but error details are present",
            |output| {
                let has_details = output.error_details().is_some_and(|d| !d.is_empty());
                !(output.status() == OutputStatus::Success && has_details)
            },
        )
        .with_weight(1.5),
        ValidationRule::from_fn(
            "metadata_completeness",
            "Essential metadata fields should be present",
            "Missing essential metadata fields (agent_id, agent_role, or timestamp)",
            |output| {
                let metadata = output.metadata();
                !metadata.agent_id.trim().is_empty() && !metadata.agent_role.trim().is_empty()
            },
        )
        .with_weight(1.5),
        ValidationRule::from_fn(
            "content_type_consistency",
            "Content should match declared output type",
            "Content does not match declared output type",
            content_matches_type,
        )
        .warning_only(),
        ValidationRule::from_fn(
            "word_count_accuracy",
            "Word count metadata should be accurate",
            "Word count metadata significantly differs from actual content",
            word_count_is_accurate,
        )
        .warning_only()
        .with_weight(0.5),
        ValidationRule::from_fn(
            "no_suspicious_content",
            "Content should not contain suspicious patterns",
            "Content contains suspicious patterns",
            |output| {
                let text = output.content().to_text();
                !SUSPICIOUS_PATTERNS.iter().any(|re| re.is_match(&text))
            },
        )
        .with_weight(2.0),
        ValidationRule::from_fn(
            "proper_encoding",
            "Content should be properly encoded",
            "Content has encoding issues",
            |output| {
                let text = output.content().to_text();
                !text.contains(['\u{FFFD}', '\0'])
            },
        ),
        ValidationRule::from_fn(
            "json_validity",
            "JSON outputs should be valid JSON",
            "JSON content is not valid JSON",
            json_is_valid,
        )
        .with_weight(2.0),
        ValidationRule::from_fn(
            "markdown_structure",
            "Markdown outputs should have proper structure",
            "Markdown content has structural issues",
            markdown_is_well_formed,
        )
        .warning_only()
        .with_weight(0.5),
    ]
}

fn content_matches_type(output: &StructuredOutput) -> bool {
    let content = output.content();
    match output.output_type() {
        OutputType::Json => match content {
            OutputContent::Text(text) => serde_json::from_str::<Value>(text).is_ok(),
            _ => true,
        },
        OutputType::Markdown => {
            let text = content.to_text();
            MARKDOWN_PATTERNS.iter().any(|re| re.is_match(&text))
        }
        OutputType::Html => HTML_TAG_RE.is_match(&content.to_text()),
        OutputType::Csv => {
            let text = content.to_text();
            let lines: Vec<&str> = text.trim().split('\n').collect();
            lines.len() >= 2 && lines.iter().take(3).all(|line| line.contains(','))
        }
        OutputType::Text | OutputType::Xml | OutputType::Yaml => true,
    }
}

/// Reported word count must be within 10% of the content's actual count.
/// Outputs without a (non-zero) reported count pass.
fn word_count_is_accurate(output: &StructuredOutput) -> bool {
    let Some(reported) = output.metadata().word_count.filter(|&n| n > 0) else {
        return true;
    };
    let actual = output.content().word_count();
    let variance = actual.abs_diff(reported) as f64 / actual.max(1) as f64;
    variance <= WORD_COUNT_TOLERANCE
}

fn json_is_valid(output: &StructuredOutput) -> bool {
    if output.output_type() != OutputType::Json {
        return true;
    }
    match output.content() {
        OutputContent::Text(text) => serde_json::from_str::<Value>(text).is_ok(),
        structured => serde_json::to_string(&structured.to_value()).is_ok(),
    }
}

fn markdown_is_well_formed(output: &StructuredOutput) -> bool {
    if output.output_type() != OutputType::Markdown {
        return true;
    }
    let text = output.content().to_text();
    if text.matches("**").count() % 2 != 0 {
        return false;
    }
    text.lines()
        .filter(|line| line.starts_with('#'))
        .all(|line| HEADER_RE.is_match(line))
}

// ---------------------------------------------------------------------------
// Rule factories
// ---------------------------------------------------------------------------

/// Word bounds plus required and forbidden terms, matched case-insensitively
/// against the content as a whole.
pub fn content_quality_rule(
    min_word_count: Option<usize>,
    max_word_count: Option<usize>,
    required_keywords: Vec<String>,
    forbidden_words: Vec<String>,
) -> ValidationRule {
    let required: Vec<String> = required_keywords.iter().map(|k| k.to_lowercase()).collect();
    let forbidden: Vec<String> = forbidden_words.iter().map(|w| w.to_lowercase()).collect();

    ValidationRule::from_fn(
        "content_quality",
        "Content quality standards",
        "Content does not meet quality standards",
        move |output| {
            let text = output.content().to_text().to_lowercase();
            let words = text.split_whitespace().count();

            if min_word_count.is_some_and(|min| min > 0 && words < min) {
                return false;
            }
            if max_word_count.is_some_and(|max| max > 0 && words > max) {
                return false;
            }
            required.iter().all(|k| text.contains(k.as_str()))
                && !forbidden.iter().any(|w| text.contains(w.as_str()))
        },
    )
    .with_weight(1.5)
}

/// A caller-defined rule with the default weight.
pub fn business_rule(
    name: impl Into<String>,
    description: impl Into<String>,
    error_message: impl Into<String>,
    warning_only: bool,
    check: impl Fn(&StructuredOutput) -> bool + Send + Sync + 'static,
) -> ValidationRule {
    let rule = ValidationRule::from_fn(name, description, error_message, check);
    if warning_only { rule.warning_only() } else { rule }
}
