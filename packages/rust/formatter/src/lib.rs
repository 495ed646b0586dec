//! Rendering structured outputs for consumption.
//!
//! [`OutputFormatter`] turns one or many [`StructuredOutput`]s into JSON,
//! HTML, Markdown, CSV, XML, a one-line summary, or a named template.
//! Formatting is presentation only: failures come back as an error string
//! and the formatter never touches the filesystem.

mod html;
mod markdown;
mod plain;
mod template;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, instrument};

use outputkit_shared::{
    FormatterConfig, OutputKitError, OutputStatus, Result, StructuredOutput, to_json_indented,
};

pub use html::{escape_html, escape_xml, markdown_to_html};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A supported rendering target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Json,
    Html,
    Markdown,
    Csv,
    Xml,
    Summary,
    Template,
}

impl TargetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Summary => "summary",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = OutputKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "summary" => Ok(Self::Summary),
            "template" => Ok(Self::Template),
            other => Err(OutputKitError::Format(format!("Unsupported format: {other}"))),
        }
    }
}

/// Rendering options shared by every target.
#[derive(Debug, Clone, Serialize)]
pub struct FormatOptions {
    /// JSON indent width.
    pub indent: usize,
    /// Render the metadata block (JSON: full object instead of content only).
    pub include_metadata: bool,
    /// Embed the stylesheet in HTML output.
    pub include_css: bool,
    /// Document title override.
    pub title: Option<String>,
    /// Timestamp stamped on aggregated documents (defaults to now).
    pub generated_at: Option<DateTime<Utc>>,
    /// Characters of content shown in summaries.
    pub preview_length: usize,
    /// Template used by [`TargetFormat::Template`].
    pub template_name: Option<String>,
    /// Free-form values exposed to templates.
    pub extra: Map<String, Value>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            include_metadata: true,
            include_css: true,
            title: None,
            generated_at: None,
            preview_length: 100,
            template_name: None,
            extra: Map::new(),
        }
    }
}

impl From<&FormatterConfig> for FormatOptions {
    fn from(config: &FormatterConfig) -> Self {
        Self {
            indent: config.indent,
            include_metadata: config.include_metadata,
            include_css: config.include_css,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Renders outputs; holds the named templates.
#[derive(Debug, Default)]
pub struct OutputFormatter {
    templates: template::TemplateStore,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under `name`, replacing any previous one.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        self.templates.add(name.into(), source.into())
    }

    /// Names of the registered templates.
    pub fn template_names(&self) -> Vec<String> {
        self.templates.names()
    }

    /// Render one output. Never fails: errors come back as
    /// `"Error formatting output: ..."`.
    #[instrument(skip_all, fields(format = target, agent_role = %output.metadata().agent_role))]
    pub fn format_output(&self, output: &StructuredOutput, target: &str, options: &FormatOptions) -> String {
        match target.parse().and_then(|format| self.render(output, format, options)) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(error = %e, "error formatting output");
                format!("Error formatting output: {}", error_text(&e))
            }
        }
    }

    /// Render one output, surfacing errors.
    pub fn render(
        &self,
        output: &StructuredOutput,
        format: TargetFormat,
        options: &FormatOptions,
    ) -> Result<String> {
        match format {
            TargetFormat::Json => render_json(output, options),
            TargetFormat::Html => Ok(html::render(output, options)),
            TargetFormat::Markdown => Ok(markdown::render(output, options, true)),
            TargetFormat::Csv => plain::render_csv(output),
            TargetFormat::Xml => Ok(plain::render_xml(output)),
            TargetFormat::Summary => Ok(plain::render_summary(output, options.preview_length)),
            TargetFormat::Template => {
                let name = options.template_name.as_deref().ok_or_else(|| {
                    OutputKitError::Template("template name required for template format".into())
                })?;
                self.templates.render(name, output, options)
            }
        }
    }

    /// Render several outputs.
    ///
    /// Without aggregation each output is rendered on its own under an
    /// `=== Output N ===` separator. With aggregation JSON becomes one array,
    /// HTML and Markdown become one document with a summary header, and
    /// summary becomes a numbered table; other formats fall back to the
    /// separated layout.
    #[instrument(skip_all, fields(format = target, count = outputs.len(), aggregate = aggregate))]
    pub fn format_multiple_outputs(
        &self,
        outputs: &[StructuredOutput],
        target: &str,
        aggregate: bool,
        options: &FormatOptions,
    ) -> String {
        let format = match target.parse::<TargetFormat>() {
            Ok(format) if aggregate => format,
            _ => return self.format_separately(outputs, target, options),
        };

        let rendered = match format {
            TargetFormat::Json => render_json_array(outputs, options),
            TargetFormat::Html => Ok(html::render_many(outputs, options)),
            TargetFormat::Markdown => Ok(markdown::render_many(outputs, options)),
            TargetFormat::Summary => Ok(plain::render_summary_table(outputs, options.preview_length)),
            _ => return self.format_separately(outputs, target, options),
        };

        rendered.unwrap_or_else(|e| {
            error!(error = %e, "error formatting outputs");
            format!("Error formatting outputs: {}", error_text(&e))
        })
    }

    fn format_separately(&self, outputs: &[StructuredOutput], target: &str, options: &FormatOptions) -> String {
        outputs
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let formatted = self.format_output(output, target, options);
                format!("=== Output {} ===\n{formatted}\n", i + 1)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn render_json(output: &StructuredOutput, options: &FormatOptions) -> Result<String> {
    if options.include_metadata {
        output.to_json(options.indent)
    } else {
        to_json_indented(&output.content().to_value(), options.indent)
    }
}

fn render_json_array(outputs: &[StructuredOutput], options: &FormatOptions) -> Result<String> {
    let items = outputs
        .iter()
        .map(|o| {
            if options.include_metadata {
                o.to_dict()
            } else {
                Ok(o.content().to_value())
            }
        })
        .collect::<Result<Vec<Value>>>()?;
    to_json_indented(&items, options.indent)
}

/// Count of `success` outputs.
pub(crate) fn successful(outputs: &[StructuredOutput]) -> usize {
    outputs.iter().filter(|o| o.status() == OutputStatus::Success).count()
}

/// Plain string form of a section value.
pub(crate) fn section_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The message without the variant prefix for format errors.
fn error_text(e: &OutputKitError) -> String {
    match e {
        OutputKitError::Format(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outputkit_shared::{OutputMetadata, OutputType};
    use serde_json::json;

    fn sample(role: &str, status: OutputStatus) -> StructuredOutput {
        let builder = StructuredOutput::builder(
            "# Findings\n\nRevenue is **up**.",
            OutputType::Markdown,
            OutputMetadata::new("agent_0", role),
        )
        .status(status);
        let builder = if status == OutputStatus::Failed {
            builder.error_details("boom")
        } else {
            builder
        };
        builder.build().unwrap()
    }

    #[test]
    fn target_format_parses_case_insensitively() {
        assert_eq!("HTML".parse::<TargetFormat>().unwrap(), TargetFormat::Html);
        assert_eq!("md".parse::<TargetFormat>().unwrap(), TargetFormat::Markdown);
        assert!("pdf".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn unknown_format_degrades_to_error_string() {
        let formatter = OutputFormatter::new();
        let rendered = formatter.format_output(
            &sample("Writer", OutputStatus::Success),
            "pdf",
            &FormatOptions::default(),
        );
        assert_eq!(rendered, "Error formatting output: Unsupported format: pdf");
    }

    #[test]
    fn json_full_and_content_only() {
        let formatter = OutputFormatter::new();
        let output = sample("Writer", OutputStatus::Success);

        let full = formatter.format_output(&output, "json", &FormatOptions::default());
        let parsed: Value = serde_json::from_str(&full).unwrap();
        assert_eq!(parsed["id"], json!(output.id().to_string()));

        let options = FormatOptions {
            include_metadata: false,
            ..FormatOptions::default()
        };
        let content_only = formatter.format_output(&output, "json", &options);
        assert_eq!(content_only, "\"# Findings\\n\\nRevenue is **up**.\"");
    }

    #[test]
    fn template_without_name_is_error_string() {
        let formatter = OutputFormatter::new();
        let rendered = formatter.format_output(
            &sample("Writer", OutputStatus::Success),
            "template",
            &FormatOptions::default(),
        );
        assert!(rendered.starts_with("Error formatting output: template error:"));
    }

    #[test]
    fn separated_layout() {
        let formatter = OutputFormatter::new();
        let outputs = [
            sample("Writer", OutputStatus::Success),
            sample("Editor", OutputStatus::Partial),
        ];
        let rendered = formatter.format_multiple_outputs(&outputs, "summary", false, &FormatOptions::default());
        assert!(rendered.starts_with("=== Output 1 ===\nAgent: Writer"));
        assert!(rendered.contains("\n=== Output 2 ===\nAgent: Editor"));
    }

    #[test]
    fn aggregated_json_is_array() {
        let formatter = OutputFormatter::new();
        let outputs = [
            sample("Writer", OutputStatus::Success),
            sample("Editor", OutputStatus::Failed),
        ];
        let rendered = formatter.format_multiple_outputs(&outputs, "json", true, &FormatOptions::default());
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[1]["status"], json!("failed"));
    }

    #[test]
    fn aggregated_csv_falls_back_to_separated() {
        let formatter = OutputFormatter::new();
        let outputs = [sample("Writer", OutputStatus::Success)];
        let rendered = formatter.format_multiple_outputs(&outputs, "csv", true, &FormatOptions::default());
        assert!(rendered.starts_with("=== Output 1 ===\nField,Value"));
    }
}
