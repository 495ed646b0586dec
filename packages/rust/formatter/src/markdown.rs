//! Markdown rendering.

use chrono::Utc;

use outputkit_shared::{OutputContent, OutputType, StructuredOutput, title_case};

use crate::{FormatOptions, section_text, successful};

/// Render one output. `with_title` is false when the output is nested in an
/// aggregated document.
pub(crate) fn render(output: &StructuredOutput, options: &FormatOptions, with_title: bool) -> String {
    let metadata = output.metadata();
    let mut parts = Vec::new();

    if with_title {
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| format!("Output from {}", metadata.agent_role));
        parts.push(format!("# {title}\n"));
    }

    if options.include_metadata {
        parts.push("## Metadata\n".to_string());
        parts.push(format!("- **Agent**: {}", metadata.agent_role));
        parts.push(format!("- **Status**: {}", output.status()));
        parts.push(format!("- **Type**: {}", output.output_type()));
        parts.push(format!("- **Timestamp**: {}", metadata.timestamp().to_rfc3339()));
        if let Some(words) = metadata.word_count.filter(|w| *w > 0) {
            parts.push(format!("- **Word Count**: {words}"));
        }
        if let Some(seconds) = metadata.execution_time.filter(|t| *t > 0.0) {
            parts.push(format!("- **Execution Time**: {seconds:.2}s"));
        }
        parts.push(String::new());
    }

    parts.push("## Content\n".to_string());
    let content = output.content();
    match content {
        OutputContent::Text(text) if output.output_type() != OutputType::Json => {
            parts.push(text.clone());
        }
        _ => {
            let pretty = serde_json::to_string_pretty(&content.to_value())
                .unwrap_or_else(|_| content.to_text());
            parts.push("```json".to_string());
            parts.push(pretty);
            parts.push("```".to_string());
        }
    }
    parts.push(String::new());

    if let Some(sections) = output.sections().filter(|s| !s.is_empty()) {
        parts.push("## Sections\n".to_string());
        for (name, value) in sections {
            parts.push(format!("### {}\n", title_case(name)));
            parts.push(section_text(value));
            parts.push(String::new());
        }
    }

    if !output.tags().is_empty() {
        parts.push(format!("**Tags**: {}", output.tags().join(", ")));
    }
    if !output.keywords().is_empty() {
        parts.push(format!("**Keywords**: {}", output.keywords().join(", ")));
    }

    if let Some(validation) = output.validation() {
        parts.push("\n## Validation\n".to_string());
        parts.push(format!("- **Valid**: {}", validation.is_valid()));
        parts.push(format!("- **Score**: {:.2}", validation.validation_score()));
        if !validation.errors().is_empty() {
            parts.push(format!("- **Errors**: {}", validation.errors().len()));
        }
        if !validation.warnings().is_empty() {
            parts.push(format!("- **Warnings**: {}", validation.warnings().len()));
        }
    }

    parts.join("\n")
}

pub(crate) fn render_many(outputs: &[StructuredOutput], options: &FormatOptions) -> String {
    let title = options.title.as_deref().unwrap_or("Workflow Execution Results");
    let generated = options.generated_at.unwrap_or_else(Utc::now);
    let item_options = FormatOptions {
        include_metadata: false,
        title: None,
        ..options.clone()
    };

    let mut parts = vec![
        format!("# {title}\n"),
        "## Execution Summary\n".to_string(),
        format!("- **Total Outputs**: {}", outputs.len()),
        format!("- **Generated**: {}", generated.to_rfc3339()),
        format!("- **Successful**: {}/{}", successful(outputs), outputs.len()),
        String::new(),
    ];

    for (i, output) in outputs.iter().enumerate() {
        parts.push(format!(
            "## Output {}: {}\n",
            i + 1,
            output.metadata().agent_role
        ));
        parts.push(render(output, &item_options, false));
        parts.push("\n---\n".to_string());
    }

    parts.join("\n")
}
