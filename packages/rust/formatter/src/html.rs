//! HTML rendering, entity escaping, and the minimal Markdown-to-HTML pass.

use std::sync::LazyLock;

use regex::Regex;

use outputkit_shared::{OutputContent, OutputType, OutputValidation, StructuredOutput, title_case};

use crate::{FormatOptions, section_text, successful};

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape `& < > " '` for HTML text and attribute values.
pub fn escape_html(text: &str) -> String {
    escape(text, "&#x27;")
}

/// Escape `& < > " '` for XML text and attribute values.
pub fn escape_xml(text: &str) -> String {
    escape(text, "&apos;")
}

fn escape(text: &str, apostrophe: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str(apostrophe),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Markdown -> HTML
// ---------------------------------------------------------------------------

static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").expect("valid regex"));
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").expect("valid regex"));
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static EM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));

/// Headings (levels 1-3), bold, italics, and line breaks. Nothing else.
pub fn markdown_to_html(markdown: &str) -> String {
    let html = H1.replace_all(markdown, "<h1>$1</h1>");
    let html = H2.replace_all(&html, "<h2>$1</h2>");
    let html = H3.replace_all(&html, "<h3>$1</h3>");
    let html = STRONG.replace_all(&html, "<strong>$1</strong>");
    let html = EM.replace_all(&html, "<em>$1</em>");
    html.replace('\n', "<br>\n")
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

const STYLESHEET: &str = r#"<style>
.agent-output, .agent-outputs {
    font-family: Arial, sans-serif;
    max-width: 800px;
    margin: 0 auto;
    padding: 20px;
}
.metadata {
    background: #f5f5f5;
    padding: 15px;
    border-radius: 5px;
    margin-bottom: 20px;
}
.content {
    line-height: 1.6;
    margin-bottom: 20px;
}
.sections {
    margin-top: 20px;
}
.section {
    border-left: 3px solid #007cba;
    padding-left: 15px;
    margin-bottom: 15px;
}
.json-content {
    background: #f8f8f8;
    padding: 15px;
    border-radius: 5px;
    overflow-x: auto;
}
.validation {
    padding: 10px;
    border-radius: 5px;
}
.validation.valid {
    background: #d4edda;
    border: 1px solid #c3e6cb;
}
.validation.invalid {
    background: #f8d7da;
    border: 1px solid #f5c6cb;
}
</style>"#;

pub(crate) fn render(output: &StructuredOutput, options: &FormatOptions) -> String {
    let mut parts = Vec::new();
    if options.include_css {
        parts.push(STYLESHEET.to_string());
    }
    parts.push(r#"<div class="agent-output">"#.to_string());

    if options.include_metadata {
        parts.push(metadata_block(output));
    }
    parts.push(format!(r#"<div class="content">{}</div>"#, content_block(output)));
    if let Some(sections) = output.sections().filter(|s| !s.is_empty()) {
        parts.push(r#"<div class="sections">"#.to_string());
        for (name, value) in sections {
            parts.push(format!(
                r#"<div class="section" data-section="{}"><h3>{}</h3><div class="section-content">{}</div></div>"#,
                escape_html(name),
                escape_html(&title_case(name)),
                escape_html(&section_text(value)),
            ));
        }
        parts.push("</div>".to_string());
    }
    if let Some(validation) = output.validation() {
        parts.push(validation_block(validation));
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

pub(crate) fn render_many(outputs: &[StructuredOutput], options: &FormatOptions) -> String {
    let item_options = FormatOptions {
        include_css: false,
        ..options.clone()
    };
    let title = options.title.as_deref().unwrap_or("Workflow Execution Results");

    let mut parts = Vec::new();
    if options.include_css {
        parts.push(STYLESHEET.to_string());
    }
    parts.push(r#"<div class="agent-outputs">"#.to_string());
    parts.push(format!("<h1>{}</h1>", escape_html(title)));
    parts.push(format!(
        r#"<p class="summary">Total outputs: {} | Successful: {}/{}</p>"#,
        outputs.len(),
        successful(outputs),
        outputs.len()
    ));

    for (i, output) in outputs.iter().enumerate() {
        parts.push(format!(r#"<div class="output-item" data-index="{i}">"#));
        parts.push(format!(
            "<h2>Output {}: {}</h2>",
            i + 1,
            escape_html(&output.metadata().agent_role)
        ));
        parts.push(render(output, &item_options));
        parts.push("</div>".to_string());
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

fn metadata_block(output: &StructuredOutput) -> String {
    let metadata = output.metadata();
    let mut lines = vec![
        r#"<div class="metadata">"#.to_string(),
        "<h3>Output Metadata</h3>".to_string(),
        "<ul>".to_string(),
        format!(
            "<li><strong>Agent:</strong> {}</li>",
            escape_html(&metadata.agent_role)
        ),
        format!("<li><strong>Status:</strong> {}</li>", output.status()),
        format!("<li><strong>Type:</strong> {}</li>", output.output_type()),
        format!(
            "<li><strong>Timestamp:</strong> {}</li>",
            metadata.timestamp().to_rfc3339()
        ),
    ];
    if let Some(words) = metadata.word_count.filter(|w| *w > 0) {
        lines.push(format!("<li><strong>Word Count:</strong> {words}</li>"));
    }
    if let Some(seconds) = metadata.execution_time.filter(|t| *t > 0.0) {
        lines.push(format!(
            "<li><strong>Execution Time:</strong> {seconds:.2}s</li>"
        ));
    }
    lines.push("</ul>".to_string());
    lines.push("</div>".to_string());
    lines.join("\n")
}

fn content_block(output: &StructuredOutput) -> String {
    let content = output.content();
    match (output.output_type(), content) {
        (OutputType::Markdown, OutputContent::Text(text)) => markdown_to_html(text),
        (OutputType::Html, OutputContent::Text(text)) => text.clone(),
        (_, OutputContent::Mapping(_) | OutputContent::Sequence(_)) | (OutputType::Json, _) => {
            let pretty = serde_json::to_string_pretty(&content.to_value())
                .unwrap_or_else(|_| content.to_text());
            format!(r#"<pre class="json-content">{}</pre>"#, escape_html(&pretty))
        }
        _ => format!(
            r#"<div class="text-content">{}</div>"#,
            escape_html(&content.to_text())
        ),
    }
}

fn validation_block(validation: &OutputValidation) -> String {
    let class = if validation.is_valid() { "valid" } else { "invalid" };
    let mut lines = vec![
        format!(r#"<div class="validation {class}">"#),
        "<h3>Validation Results</h3>".to_string(),
        format!("<p><strong>Valid:</strong> {}</p>", validation.is_valid()),
        format!(
            "<p><strong>Score:</strong> {:.1}%</p>",
            validation.validation_score() * 100.0
        ),
    ];
    for (heading, items) in [("Errors", validation.errors()), ("Warnings", validation.warnings())] {
        if items.is_empty() {
            continue;
        }
        lines.push(format!("<h4>{heading}:</h4>"));
        lines.push("<ul>".to_string());
        lines.extend(items.iter().map(|item| format!("<li>{}</li>", escape_html(item))));
        lines.push("</ul>".to_string());
    }
    lines.push("</div>".to_string());
    lines.join("\n")
}
