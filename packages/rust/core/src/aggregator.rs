//! Combining many outputs: workflow aggregation, consolidation strategies,
//! and comparison reports with ranking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use outputkit_shared::{
    OutputKitError, OutputMetadata, OutputStatus, OutputType, Result, StructuredOutput, UnitScore,
    title_case, truncate_with_ellipsis,
};

use crate::stats;
use crate::workflow::WorkflowResult;

/// Section names pulled into a summary consolidation.
const KEY_SECTIONS: [&str; 4] = ["summary", "findings", "conclusion", "recommendations"];

// ---------------------------------------------------------------------------
// Workflow aggregation
// ---------------------------------------------------------------------------

/// Wrap outputs into a [`WorkflowResult`].
///
/// `end` defaults to now. `start` defaults to the earliest output timestamp,
/// or to `end` minus the summed execution times when there are no outputs.
pub fn aggregate_workflow_results(
    outputs: Vec<StructuredOutput>,
    workflow_id: impl Into<String>,
    workflow_name: impl Into<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> WorkflowResult {
    let end = end.unwrap_or_else(Utc::now);
    let start = start.unwrap_or_else(|| {
        outputs
            .iter()
            .map(|o| o.metadata().timestamp())
            .min()
            .unwrap_or_else(|| {
                let seconds: f64 = outputs
                    .iter()
                    .filter_map(|o| o.metadata().execution_time)
                    .sum();
                end - Duration::milliseconds((seconds * 1000.0) as i64)
            })
    });
    WorkflowResult::new(workflow_id, workflow_name, outputs, start, end)
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// How [`create_consolidated_output`] combines outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationStrategy {
    /// Concatenate everything under per-agent headers.
    Merge,
    /// A markdown digest of previews, key sections, and metrics.
    Summary,
    /// Clone the highest-scoring output.
    Best,
}

impl ConsolidationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Summary => "summary",
            Self::Best => "best",
        }
    }
}

impl fmt::Display for ConsolidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsolidationStrategy {
    type Err = OutputKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "summary" => Ok(Self::Summary),
            "best" => Ok(Self::Best),
            other => Err(OutputKitError::validation(format!(
                "Unknown consolidation strategy: {other}"
            ))),
        }
    }
}

/// Combine outputs into one derived output.
///
/// Fails with a validation error when `outputs` is empty.
#[instrument(skip_all, fields(strategy = %strategy, count = outputs.len()))]
pub fn create_consolidated_output(
    outputs: &[StructuredOutput],
    strategy: ConsolidationStrategy,
    target_role: &str,
) -> Result<StructuredOutput> {
    if outputs.is_empty() {
        return Err(OutputKitError::validation(
            "No outputs provided for consolidation",
        ));
    }

    let consolidated = match strategy {
        ConsolidationStrategy::Merge => merge_outputs(outputs, target_role),
        ConsolidationStrategy::Summary => summarize_outputs(outputs, target_role),
        ConsolidationStrategy::Best => select_best_output(outputs, target_role),
    }?;

    info!(
        status = %consolidated.status(),
        word_count = ?consolidated.metadata().word_count,
        "consolidated outputs"
    );
    Ok(consolidated)
}

fn role_prefix(role: &str) -> String {
    role.to_lowercase().replace(' ', "_")
}

fn mean_confidence(outputs: &[StructuredOutput]) -> Option<UnitScore> {
    let values: Vec<f64> = outputs.iter().filter_map(|o| o.metadata().confidence()).collect();
    stats::mean(&values).map(UnitScore::clamped)
}

fn total_sources(outputs: &[StructuredOutput]) -> Option<usize> {
    Some(outputs.iter().filter_map(|o| o.metadata().source_count).sum()).filter(|n| *n > 0)
}

fn total_words(outputs: &[StructuredOutput]) -> usize {
    outputs.iter().filter_map(|o| o.metadata().word_count).sum()
}

fn success_count(outputs: &[StructuredOutput]) -> usize {
    outputs.iter().filter(|o| o.status() == OutputStatus::Success).count()
}

fn merge_outputs(outputs: &[StructuredOutput], target_role: &str) -> Result<StructuredOutput> {
    let mut parts = Vec::with_capacity(outputs.len());
    let mut sections = Map::new();

    for output in outputs {
        let role = &output.metadata().agent_role;
        parts.push(format!("## {role} Output\n\n{}", output.content().to_text()));
        if let Some(own) = output.sections() {
            let prefix = role_prefix(role);
            for (name, value) in own {
                sections.insert(format!("{prefix}_{name}"), value.clone());
            }
        }
    }

    // worst status wins; first encountered on ties
    let status = outputs
        .iter()
        .map(|o| o.status())
        .reduce(|worst, s| if s.rank() < worst.rank() { s } else { worst })
        .unwrap_or(OutputStatus::Success);

    let mut metadata = OutputMetadata::new("consolidated", target_role);
    metadata.workflow_id = outputs[0].metadata().workflow_id.clone();
    metadata.word_count = Some(total_words(outputs));
    let times: Vec<f64> = outputs.iter().filter_map(|o| o.metadata().execution_time).collect();
    metadata.execution_time = (!times.is_empty()).then(|| times.iter().sum());
    metadata.confidence_score = mean_confidence(outputs);
    metadata.source_count = total_sources(outputs);

    let mut builder = StructuredOutput::builder(parts.join("\n\n"), OutputType::Markdown, metadata)
        .status(status)
        .sections((!sections.is_empty()).then_some(sections))
        .tags(outputs.iter().flat_map(|o| o.tags().iter().cloned()))
        .keywords(outputs.iter().flat_map(|o| o.keywords().iter().cloned()))
        .note(format!("Consolidated from {} agent outputs", outputs.len()));

    if status == OutputStatus::Failed {
        let failures: Vec<String> = outputs
            .iter()
            .filter(|o| o.status() == OutputStatus::Failed)
            .map(|o| match o.error_details() {
                Some(details) => format!("{}: {details}", o.metadata().agent_role),
                None => o.metadata().agent_role.clone(),
            })
            .collect();
        builder = builder.error_details(format!(
            "{} of {} outputs failed ({})",
            failures.len(),
            outputs.len(),
            failures.join("; ")
        ));
    }

    builder.build()
}

fn status_glyph(status: OutputStatus) -> &'static str {
    match status {
        OutputStatus::Success => "✓",
        OutputStatus::Partial => "~",
        OutputStatus::Failed | OutputStatus::Pending => "✗",
    }
}

/// `1234567` -> `1,234,567`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn summarize_outputs(outputs: &[StructuredOutput], target_role: &str) -> Result<StructuredOutput> {
    let mut parts = vec![
        "# Workflow Summary\n".to_string(),
        format!(
            "This summary consolidates results from {} agents:\n",
            outputs.len()
        ),
    ];
    for output in outputs {
        parts.push(format!(
            "- {} **{}**: {}",
            status_glyph(output.status()),
            output.metadata().agent_role,
            output.get_content_preview(100)
        ));
    }

    parts.push("\n## Key Findings\n".to_string());
    let mut key_sections: Vec<(String, Vec<String>)> = Vec::new();
    for output in outputs {
        let Some(sections) = output.sections() else {
            continue;
        };
        for (name, value) in sections {
            if !KEY_SECTIONS.contains(&name.to_lowercase().as_str()) {
                continue;
            }
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let entry = format!(
                "**{}**: {}",
                output.metadata().agent_role,
                truncate_with_ellipsis(&text, 300)
            );
            match key_sections.iter_mut().find(|(n, _)| n == name) {
                Some((_, entries)) => entries.push(entry),
                None => key_sections.push((name.clone(), vec![entry])),
            }
        }
    }
    for (name, entries) in key_sections {
        parts.push(format!("### {}\n", title_case(&name)));
        parts.extend(entries);
        parts.push(String::new());
    }

    let confidence = mean_confidence(outputs);
    parts.push("## Workflow Metrics\n".to_string());
    parts.push(format!(
        "- **Total Word Count**: {}",
        group_thousands(total_words(outputs))
    ));
    parts.push(match confidence {
        Some(c) => format!("- **Average Confidence**: {:.1}%", c.get() * 100.0),
        None => "- **Average Confidence**: N/A".to_string(),
    });
    parts.push(format!(
        "- **Successful Outputs**: {}/{}",
        success_count(outputs),
        outputs.len()
    ));

    let document = parts.join("\n");
    let mut metadata = OutputMetadata::new("summary", target_role);
    metadata.workflow_id = outputs[0].metadata().workflow_id.clone();
    metadata.word_count = Some(document.split_whitespace().count());
    metadata.source_count = total_sources(outputs);

    StructuredOutput::builder(document, OutputType::Markdown, metadata)
        .note(format!("Summary generated from {} agent outputs", outputs.len()))
        .build()
}

/// Quality score used by the `best` strategy.
pub fn best_output_score(output: &StructuredOutput) -> f64 {
    let metadata = output.metadata();
    let mut score = match output.status() {
        OutputStatus::Success => 3.0,
        OutputStatus::Partial => 1.0,
        _ => 0.0,
    };
    if let Some(validation) = output.validation() {
        score += validation.validation_score() * 2.0;
    }
    if let Some(words) = metadata.word_count {
        score += (words as f64 / 1000.0).min(2.0);
    }
    if let Some(confidence) = metadata.confidence() {
        score += confidence;
    }
    score + output.section_count() as f64 * 0.1
}

fn select_best_output(outputs: &[StructuredOutput], target_role: &str) -> Result<StructuredOutput> {
    let mut best = &outputs[0];
    let mut best_score = best_output_score(best);
    for output in &outputs[1..] {
        let score = best_output_score(output);
        if score > best_score {
            best = output;
            best_score = score;
        }
    }

    let source = best.metadata();
    let mut metadata = OutputMetadata::new("best_selected", target_role);
    metadata.task_id = source.task_id.clone();
    metadata.task_name = source.task_name.clone();
    metadata.workflow_id = source.workflow_id.clone();
    metadata.word_count = source.word_count;
    metadata.execution_time = source.execution_time;
    metadata.tokens_used = source.tokens_used;
    metadata.model_used = source.model_used.clone();
    metadata.confidence_score = source.confidence_score;
    metadata.source_count = source.source_count;

    let mut builder = StructuredOutput::builder(best.content().clone(), best.output_type(), metadata)
        .status(best.status())
        .validation(best.validation().cloned())
        .sections(best.sections().cloned())
        .tags(best.tags().iter().cloned())
        .keywords(best.keywords().iter().cloned())
        .notes(best.processing_notes().iter().cloned())
        .note(format!("Selected as best from {} outputs", outputs.len()));
    if let Some(details) = best.error_details() {
        builder = builder.error_details(details);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Criteria compared when the caller supplies none.
pub const DEFAULT_CRITERIA: [&str; 6] = [
    "word_count",
    "execution_time",
    "confidence_score",
    "validation_score",
    "status",
    "content_type",
];

/// Min, max, mean, and median over the numeric values of one criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionComparison {
    pub criterion: String,
    /// One value per output; `"N/A"` for unknown criteria.
    pub values: Vec<Value>,
    pub agents: Vec<String>,
    #[serde(flatten)]
    pub stats: Option<NumericStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOutput {
    pub rank: usize,
    pub agent: String,
    pub score: f64,
    pub status: OutputStatus,
    pub word_count: Option<usize>,
    pub validation_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub output_count: usize,
    pub comparison_criteria: Vec<String>,
    pub agents: Vec<String>,
    pub detailed_comparison: Vec<CriterionComparison>,
    pub ranking: Vec<RankedOutput>,
}

/// A report, or the reason one could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Report(ComparisonReport),
    Error { error: String },
}

impl ComparisonOutcome {
    pub fn report(&self) -> Option<&ComparisonReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Compare outputs criterion by criterion and rank them.
///
/// Needs at least two outputs; fewer yields [`ComparisonOutcome::Error`].
/// An empty or absent criteria list means [`DEFAULT_CRITERIA`].
#[instrument(skip_all, fields(count = outputs.len()))]
pub fn generate_comparison_report(
    outputs: &[StructuredOutput],
    criteria: Option<&[String]>,
) -> ComparisonOutcome {
    if outputs.len() < 2 {
        return ComparisonOutcome::Error {
            error: "Need at least 2 outputs for comparison".to_string(),
        };
    }

    let criteria: Vec<String> = match criteria {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => DEFAULT_CRITERIA.iter().map(|c| c.to_string()).collect(),
    };
    let agents: Vec<String> = outputs.iter().map(|o| o.metadata().agent_role.clone()).collect();

    let detailed_comparison = criteria
        .iter()
        .map(|criterion| compare_by_criterion(outputs, criterion, &agents))
        .collect();

    ComparisonOutcome::Report(ComparisonReport {
        output_count: outputs.len(),
        comparison_criteria: criteria,
        agents,
        detailed_comparison,
        ranking: rank_outputs(outputs),
    })
}

fn criterion_value(output: &StructuredOutput, criterion: &str) -> Value {
    let metadata = output.metadata();
    match criterion {
        "word_count" => Value::from(metadata.word_count.unwrap_or(0)),
        "execution_time" => Value::from(metadata.execution_time.unwrap_or(0.0)),
        "confidence_score" => Value::from(metadata.confidence().unwrap_or(0.0)),
        "validation_score" => Value::from(output.validation_score().unwrap_or(0.0)),
        "status" => Value::from(output.status().as_str()),
        "content_type" => Value::from(output.output_type().as_str()),
        _ => Value::from("N/A"),
    }
}

fn compare_by_criterion(
    outputs: &[StructuredOutput],
    criterion: &str,
    agents: &[String],
) -> CriterionComparison {
    let values: Vec<Value> = outputs.iter().map(|o| criterion_value(o, criterion)).collect();
    let numeric: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();

    let stats = match (
        stats::min(&numeric),
        stats::max(&numeric),
        stats::mean(&numeric),
        stats::median(&numeric),
    ) {
        (Some(min), Some(max), Some(avg), Some(median)) => Some(NumericStats {
            min,
            max,
            avg,
            median,
        }),
        _ => None,
    };

    CriterionComparison {
        criterion: criterion.to_string(),
        values,
        agents: agents.to_vec(),
        stats,
    }
}

/// Ranking score: status, validation, length, confidence, and sections.
pub fn ranking_score(output: &StructuredOutput) -> f64 {
    let metadata = output.metadata();
    let mut score = match output.status() {
        OutputStatus::Success => 30.0,
        OutputStatus::Partial => 15.0,
        _ => 0.0,
    };
    if let Some(validation) = output.validation() {
        score += validation.validation_score() * 25.0;
    }
    if let Some(words) = metadata.word_count {
        score += (words as f64 / 100.0).min(20.0);
    }
    if let Some(confidence) = metadata.confidence() {
        score += confidence * 15.0;
    }
    score + (output.section_count() as f64 * 2.0).min(10.0)
}

fn rank_outputs(outputs: &[StructuredOutput]) -> Vec<RankedOutput> {
    let mut ranked: Vec<RankedOutput> = outputs
        .iter()
        .map(|output| RankedOutput {
            rank: 0,
            agent: output.metadata().agent_role.clone(),
            score: (ranking_score(output) * 100.0).round() / 100.0,
            status: output.status(),
            word_count: output.metadata().word_count,
            validation_score: output.validation_score(),
        })
        .collect();

    // stable: equal scores keep input order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    for (i, item) in ranked.iter_mut().enumerate() {
        item.rank = i + 1;
    }
    ranked
}
