//! End-to-end pipeline: raw outputs → process → validate → aggregate → consolidate.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

use outputkit_processor::{ProcessRequest, process};
use outputkit_shared::{
    AppConfig, ContentQualityConfig, OutputSchema, OutputStatus, Result, StructuredOutput,
};
use outputkit_validator::{OutputValidator, content_quality_rule};

use crate::aggregator::{ConsolidationStrategy, aggregate_workflow_results, create_consolidated_output};
use crate::workflow::WorkflowResult;

/// One raw agent output handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInput {
    /// Role of the producing agent.
    pub agent_role: String,
    /// The raw output: text, mapping, or sequence.
    pub raw: Value,
    pub task_name: Option<String>,
    /// Elapsed seconds reported by the orchestrator.
    pub execution_time: Option<f64>,
}

impl PipelineInput {
    pub fn new(agent_role: impl Into<String>, raw: impl Into<Value>) -> Self {
        Self {
            agent_role: agent_role.into(),
            raw: raw.into(),
            task_name: None,
            execution_time: None,
        }
    }
}

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workflow_id: String,
    pub workflow_name: String,
    /// Schema applied while processing and again while validating.
    pub schema: Option<OutputSchema>,
    /// Escalate warning-only rule failures to errors.
    pub strict_mode: bool,
    /// Adds the content-quality rule to the validator.
    pub content_quality: Option<ContentQualityConfig>,
    /// Consolidate the outputs after aggregation.
    pub consolidate: Option<ConsolidationStrategy>,
    /// Role given to the consolidated output.
    pub target_role: String,
}

impl PipelineConfig {
    /// Pipeline settings from the loaded config, with a fresh workflow id.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            workflow_id: uuid::Uuid::now_v7().to_string(),
            workflow_name: config.defaults.workflow_name.clone(),
            schema: config.validation.output_schema(),
            strict_mode: config.validation.strict_mode,
            content_quality: config.validation.content_quality.clone(),
            consolidate: None,
            target_role: config.aggregation.target_role.clone(),
        }
    }
}

/// Result of [`run_pipeline`].
#[derive(Debug)]
pub struct PipelineResult {
    pub workflow: WorkflowResult,
    pub consolidated: Option<StructuredOutput>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each output is processed and validated.
    fn output_processed(&self, agent_role: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn output_processed(&self, _agent_role: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Run the full pipeline.
///
/// 1. Process each raw input (schema applied when configured)
/// 2. Re-validate with built-in rules plus the content-quality rule
/// 3. Aggregate into a [`WorkflowResult`]
/// 4. Consolidate (if a strategy is set)
#[instrument(skip_all, fields(workflow_id = %config.workflow_id, inputs = inputs.len()))]
pub fn run_pipeline(
    inputs: Vec<PipelineInput>,
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineResult> {
    let start = Instant::now();
    let started_at = Utc::now();

    info!(workflow_name = %config.workflow_name, "starting output pipeline");

    // --- Phase 1: Process & validate ---
    progress.phase("Processing outputs");
    let validator = build_validator(config);
    let total = inputs.len();
    let mut outputs = Vec::with_capacity(total);

    for (i, input) in inputs.into_iter().enumerate() {
        let request = ProcessRequest {
            agent_id: format!("agent_{i}"),
            agent_role: input.agent_role,
            task_id: Some(format!("task_{i}")),
            task_name: input.task_name,
            workflow_id: Some(config.workflow_id.clone()),
            execution_time: input.execution_time,
        };

        let mut output = process(input.raw, &request, config.schema.as_ref());
        if output.status() != OutputStatus::Failed {
            let validation =
                validator.validate(&output, config.schema.as_ref(), None, config.strict_mode);
            let error_count = validation.errors().len();
            let is_valid = validation.is_valid();
            output.attach_validation(validation);

            if !is_valid && output.status() == OutputStatus::Success {
                warn!(agent_role = %request.agent_role, error_count, "output failed validation");
                output.downgrade_to_partial(format!("Validation failed with {error_count} errors"));
            }
        }

        progress.output_processed(&request.agent_role, i + 1, total);
        outputs.push(output);
    }

    // --- Phase 2: Aggregate ---
    progress.phase("Aggregating results");
    let consolidated = match config.consolidate {
        Some(strategy) => {
            progress.phase("Consolidating outputs");
            Some(create_consolidated_output(&outputs, strategy, &config.target_role)?)
        }
        None => None,
    };
    let workflow = aggregate_workflow_results(
        outputs,
        &config.workflow_id,
        &config.workflow_name,
        Some(started_at),
        Some(Utc::now()),
    );

    let result = PipelineResult {
        workflow,
        consolidated,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        outputs = result.workflow.outputs().len(),
        success_rate = result.workflow.summary().success_rate,
        elapsed_ms = result.elapsed.as_millis(),
        "output pipeline complete"
    );

    Ok(result)
}

fn build_validator(config: &PipelineConfig) -> OutputValidator {
    let mut validator = OutputValidator::new();
    if let Some(quality) = &config.content_quality {
        validator.add_custom_rule(content_quality_rule(
            quality.min_word_count,
            quality.max_word_count,
            quality.required_keywords.clone(),
            quality.forbidden_words.clone(),
        ));
    }
    validator
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn config() -> PipelineConfig {
        PipelineConfig {
            workflow_id: "wf-test".into(),
            workflow_name: "Test Flow".into(),
            schema: None,
            strict_mode: false,
            content_quality: None,
            consolidate: None,
            target_role: "Consolidated Agent".into(),
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recorder {
        fn phase(&self, name: &str) {
            self.events.lock().unwrap().push(format!("phase:{name}"));
        }
        fn output_processed(&self, agent_role: &str, current: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("output:{agent_role}:{current}/{total}"));
        }
        fn done(&self, result: &PipelineResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}", result.workflow.outputs().len()));
        }
    }

    #[test]
    fn provenance_and_validation_attached() {
        let inputs = vec![
            PipelineInput::new("Writer", "# Draft\n\nA short draft about markets."),
            PipelineInput::new("Analyst", serde_json::json!({"confidence": 0.9, "summary": "ok"})),
        ];
        let result = run_pipeline(inputs, &config(), &SilentProgress).unwrap();

        let outputs = result.workflow.outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].metadata().agent_id, "agent_1");
        assert_eq!(outputs[1].metadata().task_id.as_deref(), Some("task_1"));
        assert_eq!(outputs[0].metadata().workflow_id.as_deref(), Some("wf-test"));
        assert!(outputs.iter().all(|o| o.validation().is_some()));
        assert_eq!(result.workflow.workflow_name(), "Test Flow");
        assert!(result.consolidated.is_none());
    }

    #[test]
    fn content_quality_failure_downgrades() {
        let mut cfg = config();
        cfg.content_quality = Some(ContentQualityConfig {
            min_word_count: None,
            max_word_count: None,
            required_keywords: vec!["revenue".into()],
            forbidden_words: vec![],
        });
        let result = run_pipeline(vec![PipelineInput::new("Writer", "No numbers here.")], &cfg, &SilentProgress).unwrap();

        let output = &result.workflow.outputs()[0];
        assert_eq!(output.status(), OutputStatus::Partial);
        assert!(output.validation().unwrap().errors().iter().any(|e| e.starts_with("content_quality:")));
        assert_eq!(
            output.processing_notes().last().map(String::as_str),
            Some("Validation failed with 1 errors")
        );
    }

    #[test]
    fn consolidates_and_reports_progress() {
        let mut cfg = config();
        cfg.consolidate = Some(ConsolidationStrategy::Merge);
        let recorder = Recorder::default();
        let inputs = vec![PipelineInput::new("A", "first text"), PipelineInput::new("B", "second text")];

        let result = run_pipeline(inputs, &cfg, &recorder).unwrap();
        let merged = result.consolidated.unwrap();
        assert_eq!(merged.metadata().agent_role, "Consolidated Agent");
        assert_eq!(merged.metadata().workflow_id.as_deref(), Some("wf-test"));

        let events = recorder.events.into_inner().unwrap();
        assert_eq!(
            events,
            [
                "phase:Processing outputs",
                "output:A:1/2",
                "output:B:2/2",
                "phase:Aggregating results",
                "phase:Consolidating outputs",
                "done:2",
            ]
        );
    }

    #[test]
    fn consolidating_nothing_is_error() {
        let mut cfg = config();
        cfg.consolidate = Some(ConsolidationStrategy::Summary);
        assert!(run_pipeline(Vec::new(), &cfg, &SilentProgress).is_err());
    }

    #[test]
    fn invalid_execution_time_yields_failed_output() {
        let mut input = PipelineInput::new("Timer", "some text");
        input.execution_time = Some(-1.0);
        let result = run_pipeline(vec![input], &config(), &SilentProgress).unwrap();
        let output = &result.workflow.outputs()[0];
        assert_eq!(output.status(), OutputStatus::Failed);
        assert!(output.validation().is_none());
    }
}
