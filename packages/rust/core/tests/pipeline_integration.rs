//! End-to-end: raw outputs through processing, validation, aggregation,
//! consolidation, and rendering.

use serde_json::{Value, json};

use outputkit_core::{
    ConsolidationStrategy, PipelineConfig, PipelineInput, SilentProgress, aggregate_workflow_results,
    create_consolidated_output, generate_comparison_report, run_pipeline,
};
use outputkit_formatter::{FormatOptions, OutputFormatter};
use outputkit_processor::{ProcessRequest, process};
use outputkit_shared::{AppConfig, OutputStatus, SchemaPreset};

fn research_report() -> String {
    let body = "Market analysis shows steady growth across regions. ".repeat(80);
    format!(
        "# Executive Summary\n\n{body}\n\n# Key Findings\n\nGrowth is driven by demand. \
         See [report](https://example.com/a) and [data](https://example.com/b) and \
         https://example.org/c for details.\n\n# Sources\n\nListed above.\n\nconfidence: 0.85"
    )
}

#[test]
fn research_pipeline_meets_schema() {
    let mut app = AppConfig::default();
    app.validation.schema = Some(SchemaPreset::Research);
    let config = PipelineConfig::from_app_config(&app);

    let result = run_pipeline(
        vec![PipelineInput::new("Researcher", research_report())],
        &config,
        &SilentProgress,
    )
    .unwrap();

    let output = &result.workflow.outputs()[0];
    let validation = output.validation().unwrap();
    assert!(validation.is_valid(), "errors: {:?}", validation.errors());
    assert_eq!(output.status(), OutputStatus::Success);
    assert_eq!(output.metadata().source_count, Some(3));
    assert_eq!(output.metadata().confidence(), Some(0.85));
    let sections = output.sections().unwrap();
    assert!(sections.contains_key("executive_summary"));
    assert!(sections.contains_key("key_findings"));
    assert!(sections.contains_key("sources"));
}

#[test]
fn mixed_statuses_aggregate_and_merge() {
    let request = ProcessRequest::new("agent_0", "Writer");
    let mut bad = ProcessRequest::new("agent_2", "Checker");
    bad.execution_time = Some(f64::NAN);

    let outputs = vec![
        process("First draft of the article.", &request, None),
        process(json!({"summary": "All good", "confidence": 0.7}), &request, None),
        process("Fact check", &bad, None),
    ];
    assert_eq!(outputs[2].status(), OutputStatus::Failed);

    let merged = create_consolidated_output(&outputs, ConsolidationStrategy::Merge, "Team").unwrap();
    assert_eq!(merged.status(), OutputStatus::Failed);

    let workflow = aggregate_workflow_results(outputs, "wf-9", "Mixed", None, None);
    let analytics = workflow.analytics().unwrap();
    assert!((analytics.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(analytics.status_distribution.failed, 1);
}

#[test]
fn rendered_report_and_comparison() {
    let inputs = vec![
        PipelineInput::new("Writer", "# Draft\n\nThe **launch** went well."),
        PipelineInput::new("Analyst", json!({"confidence": 0.9, "tags": ["q3"]})),
    ];
    let mut config = PipelineConfig::from_app_config(&AppConfig::default());
    config.consolidate = Some(ConsolidationStrategy::Summary);

    let result = run_pipeline(inputs, &config, &SilentProgress).unwrap();
    let outputs = result.workflow.outputs();

    let formatter = OutputFormatter::new();
    let markdown = formatter.format_multiple_outputs(outputs, "markdown", true, &FormatOptions::default());
    assert!(markdown.contains("- **Total Outputs**: 2"));
    assert!(markdown.contains("## Output 1: Writer"));
    assert!(markdown.contains("## Output 2: Analyst"));

    let json_doc = formatter.format_multiple_outputs(outputs, "json", true, &FormatOptions::default());
    let parsed: Value = serde_json::from_str(&json_doc).unwrap();
    assert_eq!(parsed[1]["tags"], json!(["q3"]));

    let summary = result.consolidated.unwrap();
    assert!(summary.content().to_text().starts_with("# Workflow Summary"));

    let outcome = generate_comparison_report(outputs, None);
    let report = outcome.report().unwrap();
    assert_eq!(report.ranking.len(), 2);
    assert_eq!(
        report.ranking.iter().map(|r| r.rank).collect::<Vec<_>>(),
        vec![1, 2]
    );
}
