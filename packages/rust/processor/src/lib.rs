//! Raw agent output to [`StructuredOutput`].
//!
//! Detects the content type, extracts metadata (word count, sources,
//! confidence), organizes sections, collects tags and keywords, and
//! optionally validates the result against an [`OutputSchema`].

mod batch;
pub mod detect;
pub mod extract;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use outputkit_shared::{
    OutputKitError, OutputMetadata, OutputSchema, Result, StructuredOutput,
};

pub use batch::{CrewResult, TaskOutput, process_crew_output};
pub use detect::{detect_output_type, detect_text, is_csv, is_html, is_markdown};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Provenance supplied by the orchestrator alongside a raw output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRequest {
    /// ID of the agent that produced the output.
    pub agent_id: String,
    /// Role of the agent.
    pub agent_role: String,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub workflow_id: Option<String>,
    /// Elapsed seconds; must be finite and non-negative.
    pub execution_time: Option<f64>,
}

impl ProcessRequest {
    pub fn new(agent_id: impl Into<String>, agent_role: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_role: agent_role.into(),
            ..Self::default()
        }
    }

    /// Metadata carrying only the caller-supplied provenance.
    fn base_metadata(&self) -> OutputMetadata {
        let mut metadata = OutputMetadata::new(&self.agent_id, &self.agent_role);
        metadata.task_id = self.task_id.clone();
        metadata.task_name = self.task_name.clone();
        metadata.workflow_id = self.workflow_id.clone();
        metadata.execution_time = self.execution_time.filter(|t| t.is_finite() && *t >= 0.0);
        metadata
    }

    fn check(&self) -> Result<()> {
        match self.execution_time {
            Some(t) if !t.is_finite() || t < 0.0 => Err(OutputKitError::validation(format!(
                "execution time must be a non-negative number of seconds, got {t}"
            ))),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// Turn a raw value into a [`StructuredOutput`].
///
/// Never fails: any processing error yields a `failed` text output holding
/// the stringified input and the error message. When a schema is supplied
/// the output is validated immediately and downgraded to `partial` if invalid.
#[instrument(skip_all, fields(agent_role = %request.agent_role, workflow_id = ?request.workflow_id))]
pub fn process(
    raw: impl Into<Value>,
    request: &ProcessRequest,
    schema: Option<&OutputSchema>,
) -> StructuredOutput {
    let raw = raw.into();
    match try_process(&raw, request, schema) {
        Ok(output) => {
            info!(
                output_type = %output.output_type(),
                status = %output.status(),
                "processed agent output"
            );
            output
        }
        Err(e) => {
            error!(error = %e, "failed to process agent output");
            let content = match &raw {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            StructuredOutput::failed(content, request.base_metadata(), e.to_string())
        }
    }
}

/// Fallible core of [`process`].
pub fn try_process(
    raw: &Value,
    request: &ProcessRequest,
    schema: Option<&OutputSchema>,
) -> Result<StructuredOutput> {
    request.check()?;

    let (output_type, content) = detect_output_type(raw);
    debug!(%output_type, "detected output type");

    let mut metadata = request.base_metadata();
    metadata.word_count = Some(content.word_count());
    metadata.source_count = extract::count_sources(&content);
    metadata.confidence_score = extract::extract_confidence(&content);

    let sections = extract::organize_sections(&content, output_type);
    let tags = extract::extract_tags(&content);
    let keywords = extract::extract_keywords(&content);

    debug!(
        word_count = ?metadata.word_count,
        source_count = ?metadata.source_count,
        sections = sections.as_ref().map_or(0, |s| s.len()),
        "extracted metadata"
    );

    let mut output = StructuredOutput::builder(content, output_type, metadata)
        .sections(sections)
        .tags(tags)
        .keywords(keywords)
        .build()?;

    if let Some(schema) = schema {
        let validation = schema.validate_output(&output);
        let error_count = validation.errors().len();
        let is_valid = validation.is_valid();
        output.attach_validation(validation);

        if !is_valid {
            warn!(schema = %schema.name, error_count, "schema validation failed");
            output.downgrade_to_partial(format!("Validation failed with {error_count} errors"));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use outputkit_shared::{OutputStatus, OutputType, UnitScore};
    use serde_json::json;

    fn writer() -> ProcessRequest {
        ProcessRequest::new("agent_1", "Writer")
    }

    #[test]
    fn markdown_scenario() {
        let raw = "# Title\n\nSome content with **bold** text and a [link](http://example.com).";
        let output = process(raw, &writer(), None);

        assert_eq!(output.output_type(), OutputType::Markdown);
        assert_eq!(output.status(), OutputStatus::Success);
        assert_eq!(output.metadata().source_count, Some(1));
        let sections = output.sections().expect("sections");
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections["title"],
            json!("Some content with **bold** text and a [link](http://example.com).")
        );
    }

    #[test]
    fn mapping_scenario() {
        let raw = json!({"confidence": 0.95, "tags": ["a", "b"], "sources": ["s1", "s2", "s3"]});
        let output = process(raw.clone(), &writer(), None);

        assert_eq!(output.output_type(), OutputType::Json);
        assert_eq!(output.content().to_value(), raw);
        assert_eq!(output.metadata().confidence_score, Some(UnitScore::new(0.95).unwrap()));
        assert_eq!(output.metadata().source_count, Some(3));
        assert_eq!(output.tags(), ["a", "b"]);
    }

    #[test]
    fn provenance_is_copied() {
        let request = ProcessRequest {
            task_id: Some("task_7".into()),
            task_name: Some("Draft".into()),
            workflow_id: Some("wf-1".into()),
            execution_time: Some(12.5),
            ..writer()
        };
        let output = process("plain words here", &request, None);
        let metadata = output.metadata();
        assert_eq!(metadata.task_id.as_deref(), Some("task_7"));
        assert_eq!(metadata.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(metadata.execution_time, Some(12.5));
        assert_eq!(metadata.word_count, Some(3));
    }

    #[test]
    fn invalid_execution_time_yields_failed_output() {
        let request = ProcessRequest {
            execution_time: Some(-1.0),
            ..writer()
        };
        let output = process(json!({"k": "v"}), &request, None);

        assert_eq!(output.status(), OutputStatus::Failed);
        assert_eq!(output.output_type(), OutputType::Text);
        assert_eq!(output.content().as_text(), Some(r#"{"k":"v"}"#));
        assert!(output.error_details().unwrap().contains("execution time"));
        assert_eq!(output.metadata().execution_time, None);
    }

    #[test]
    fn schema_failure_downgrades_to_partial() {
        let schema = OutputSchema::research();
        let output = process("A short note with few words.", &writer(), Some(&schema));

        assert_eq!(output.status(), OutputStatus::Partial);
        let validation = output.validation().expect("validation attached");
        assert!(!validation.is_valid());
        assert_eq!(
            output.processing_notes(),
            [format!("Validation failed with {} errors", validation.errors().len())]
        );
    }

    #[test]
    fn passing_schema_keeps_success() {
        let schema = OutputSchema::new("lenient", "no checks");
        let output = process("Anything goes.", &writer(), Some(&schema));
        assert_eq!(output.status(), OutputStatus::Success);
        assert!(output.validation().is_some());
        assert!(output.processing_notes().is_empty());
    }
}
