//! CSV, XML, and one-line summary rendering.

use outputkit_shared::{OutputKitError, Result, StructuredOutput, truncate_with_ellipsis};

use crate::{escape_xml, section_text};

const CSV_CONTENT_LIMIT: usize = 1000;
const CSV_SECTION_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// A two-column `Field,Value` table.
pub(crate) fn render_csv(output: &StructuredOutput) -> Result<String> {
    let metadata = output.metadata();
    let mut rows: Vec<(String, String)> = vec![
        ("Agent Role".into(), metadata.agent_role.clone()),
        ("Status".into(), output.status().to_string()),
        ("Output Type".into(), output.output_type().to_string()),
        ("Timestamp".into(), metadata.timestamp().to_rfc3339()),
    ];
    if let Some(words) = metadata.word_count.filter(|w| *w > 0) {
        rows.push(("Word Count".into(), words.to_string()));
    }
    if let Some(seconds) = metadata.execution_time.filter(|t| *t > 0.0) {
        rows.push(("Execution Time".into(), seconds.to_string()));
    }
    rows.push((
        "Content".into(),
        truncate_with_ellipsis(&output.content().to_text(), CSV_CONTENT_LIMIT),
    ));
    if let Some(sections) = output.sections() {
        for (name, value) in sections {
            rows.push((
                format!("Section: {name}"),
                truncate_with_ellipsis(&section_text(value), CSV_SECTION_LIMIT),
            ));
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(["Field", "Value"]).map_err(csv_error)?;
    for (field, value) in &rows {
        writer.write_record([field, value]).map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| OutputKitError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| OutputKitError::Serialization(e.to_string()))
}

fn csv_error(e: csv::Error) -> OutputKitError {
    OutputKitError::Serialization(e.to_string())
}

// ---------------------------------------------------------------------------
// XML
// ---------------------------------------------------------------------------

/// Wrap text in CDATA, splitting any embedded `]]>` terminator.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

pub(crate) fn render_xml(output: &StructuredOutput) -> String {
    let metadata = output.metadata();
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        "<AgentOutput>".to_string(),
        "  <Metadata>".to_string(),
        format!("    <AgentRole>{}</AgentRole>", escape_xml(&metadata.agent_role)),
        format!("    <Status>{}</Status>", output.status()),
        format!("    <OutputType>{}</OutputType>", output.output_type()),
        format!("    <Timestamp>{}</Timestamp>", metadata.timestamp().to_rfc3339()),
    ];
    if let Some(words) = metadata.word_count.filter(|w| *w > 0) {
        lines.push(format!("    <WordCount>{words}</WordCount>"));
    }
    lines.push("  </Metadata>".to_string());

    lines.push("  <Content>".to_string());
    let content = output.content();
    if content.is_structured() {
        lines.push(format!("    <JSONData>{}</JSONData>", cdata(&content.to_text())));
    } else {
        lines.push(format!("    <TextData>{}</TextData>", cdata(&content.to_text())));
    }
    lines.push("  </Content>".to_string());

    if let Some(sections) = output.sections().filter(|s| !s.is_empty()) {
        lines.push("  <Sections>".to_string());
        for (name, value) in sections {
            lines.push(format!(r#"    <Section name="{}">"#, escape_xml(name)));
            lines.push(format!("      {}", cdata(&section_text(value))));
            lines.push("    </Section>".to_string());
        }
        lines.push("  </Sections>".to_string());
    }

    lines.push("</AgentOutput>".to_string());
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// `Agent: .. | Status: .. | Time: .. | Words: .. | Validation: ..% | Preview: ..`
pub(crate) fn render_summary(output: &StructuredOutput, preview_length: usize) -> String {
    let metadata = output.metadata();
    let mut parts = vec![
        format!("Agent: {}", metadata.agent_role),
        format!("Status: {}", output.status()),
        format!("Time: {}", metadata.timestamp().format("%Y-%m-%d %H:%M:%S")),
    ];
    if let Some(words) = metadata.word_count.filter(|w| *w > 0) {
        parts.push(format!("Words: {words}"));
    }
    if let Some(score) = output.validation_score() {
        parts.push(format!("Validation: {:.1}%", score * 100.0));
    }
    parts.push(format!("Preview: {}", output.get_content_preview(preview_length)));
    parts.join(" | ")
}

pub(crate) fn render_summary_table(outputs: &[StructuredOutput], preview_length: usize) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec!["WORKFLOW EXECUTION SUMMARY".to_string(), rule.clone()];
    for (i, output) in outputs.iter().enumerate() {
        lines.push(format!("{:2}. {}", i + 1, render_summary(output, preview_length)));
    }
    lines.push(rule);
    lines.push(format!("Total: {} outputs", outputs.len()));
    lines.join("\n")
}
