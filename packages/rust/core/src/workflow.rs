//! Workflow-level view over a set of outputs: analytics, summary, insights.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use outputkit_shared::{OutputStatus, OutputType, StructuredOutput};

use crate::stats;

// ---------------------------------------------------------------------------
// Analytics types
// ---------------------------------------------------------------------------

/// Count of outputs per status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusDistribution {
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
    pub pending: usize,
}

impl StatusDistribution {
    fn record(&mut self, status: OutputStatus) {
        match status {
            OutputStatus::Success => self.success += 1,
            OutputStatus::Partial => self.partial += 1,
            OutputStatus::Failed => self.failed += 1,
            OutputStatus::Pending => self.pending += 1,
        }
    }
}

/// Per-role breakdown. Means cover only outputs reporting the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPerformance {
    pub agent_role: String,
    pub output_count: usize,
    pub success_rate: f64,
    pub avg_word_count: Option<f64>,
    pub avg_execution_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentMetrics {
    pub total_words: usize,
    pub avg_words_per_output: f64,
    pub min_words: usize,
    pub max_words: usize,
    pub median_words: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Wall-clock seconds between workflow start and end.
    pub total_execution_time: f64,
    pub avg_task_time: f64,
    pub min_task_time: f64,
    pub max_task_time: f64,
    pub avg_confidence: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub outputs_with_validation: usize,
    pub avg_validation_score: Option<f64>,
    pub outputs_with_errors: usize,
    pub outputs_with_warnings: usize,
}

/// Analytics over a non-empty set of outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowAnalytics {
    pub total_outputs: usize,
    pub status_distribution: StatusDistribution,
    pub success_rate: f64,
    pub agent_count: usize,
    /// In order of first appearance.
    pub agent_performance: Vec<AgentPerformance>,
    pub content_metrics: ContentMetrics,
    pub performance_metrics: PerformanceMetrics,
    pub quality_metrics: QualityMetrics,
}

/// Compact record of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub workflow_name: String,
    pub execution_time: f64,
    pub total_outputs: usize,
    pub success_rate: f64,
    pub total_words: usize,
    pub agent_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub quality_score: Option<f64>,
}

// ---------------------------------------------------------------------------
// WorkflowResult
// ---------------------------------------------------------------------------

/// All outputs of one workflow execution plus its execution window.
///
/// Analytics, summary, and insights are computed on first access and cached;
/// the result is immutable after construction.
#[derive(Debug)]
pub struct WorkflowResult {
    workflow_id: String,
    workflow_name: String,
    outputs: Vec<StructuredOutput>,
    execution_start: DateTime<Utc>,
    execution_end: DateTime<Utc>,
    analytics: OnceLock<Option<WorkflowAnalytics>>,
    summary: OnceLock<WorkflowSummary>,
    insights: OnceLock<Vec<String>>,
}

impl WorkflowResult {
    pub fn new(
        workflow_id: impl Into<String>,
        workflow_name: impl Into<String>,
        outputs: Vec<StructuredOutput>,
        execution_start: DateTime<Utc>,
        execution_end: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_name: workflow_name.into(),
            outputs,
            execution_start,
            execution_end,
            analytics: OnceLock::new(),
            summary: OnceLock::new(),
            insights: OnceLock::new(),
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn outputs(&self) -> &[StructuredOutput] {
        &self.outputs
    }

    pub fn execution_start(&self) -> DateTime<Utc> {
        self.execution_start
    }

    pub fn execution_end(&self) -> DateTime<Utc> {
        self.execution_end
    }

    /// Wall-clock seconds between start and end.
    pub fn execution_time(&self) -> f64 {
        (self.execution_end - self.execution_start).num_milliseconds() as f64 / 1000.0
    }

    /// `None` when there are no outputs to analyze.
    pub fn analytics(&self) -> Option<&WorkflowAnalytics> {
        self.analytics
            .get_or_init(|| compute_analytics(&self.outputs, self.execution_time()))
            .as_ref()
    }

    pub fn summary(&self) -> &WorkflowSummary {
        self.summary.get_or_init(|| {
            let analytics = self.analytics();
            WorkflowSummary {
                workflow_id: self.workflow_id.clone(),
                workflow_name: self.workflow_name.clone(),
                execution_time: self.execution_time(),
                total_outputs: self.outputs.len(),
                success_rate: analytics.map_or(0.0, |a| a.success_rate),
                total_words: analytics.map_or(0, |a| a.content_metrics.total_words),
                agent_count: analytics.map_or(0, |a| a.agent_count),
                started_at: self.execution_start,
                completed_at: self.execution_end,
                quality_score: analytics.and_then(|a| a.quality_metrics.avg_validation_score),
            }
        })
    }

    /// Advisory observations, in a fixed order. Empty without outputs.
    pub fn insights(&self) -> &[String] {
        self.insights.get_or_init(|| match self.analytics() {
            Some(analytics) => generate_insights(analytics, &self.outputs),
            None => Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

fn success_rate(outputs: &[&StructuredOutput]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    let ok = outputs.iter().filter(|o| o.status() == OutputStatus::Success).count();
    ok as f64 / outputs.len() as f64
}

fn compute_analytics(outputs: &[StructuredOutput], wall_clock: f64) -> Option<WorkflowAnalytics> {
    if outputs.is_empty() {
        return None;
    }
    let all: Vec<&StructuredOutput> = outputs.iter().collect();

    let mut status_distribution = StatusDistribution::default();
    for output in outputs {
        status_distribution.record(output.status());
    }

    let mut roles: Vec<(&str, Vec<&StructuredOutput>)> = Vec::new();
    for output in outputs {
        let role = output.metadata().agent_role.as_str();
        match roles.iter_mut().find(|(r, _)| *r == role) {
            Some((_, group)) => group.push(output),
            None => roles.push((role, vec![output])),
        }
    }
    let agent_performance = roles
        .iter()
        .map(|(role, group)| {
            let words: Vec<f64> = group
                .iter()
                .filter_map(|o| o.metadata().word_count)
                .map(|w| w as f64)
                .collect();
            let times: Vec<f64> = group.iter().filter_map(|o| o.metadata().execution_time).collect();
            AgentPerformance {
                agent_role: role.to_string(),
                output_count: group.len(),
                success_rate: success_rate(group),
                avg_word_count: stats::mean(&words),
                avg_execution_time: stats::mean(&times),
            }
        })
        .collect::<Vec<_>>();

    let word_counts: Vec<usize> = outputs.iter().filter_map(|o| o.metadata().word_count).collect();
    let words_f: Vec<f64> = word_counts.iter().map(|w| *w as f64).collect();
    let content_metrics = ContentMetrics {
        total_words: word_counts.iter().sum(),
        avg_words_per_output: stats::mean(&words_f).unwrap_or(0.0),
        min_words: word_counts.iter().copied().min().unwrap_or(0),
        max_words: word_counts.iter().copied().max().unwrap_or(0),
        median_words: stats::median(&words_f).unwrap_or(0.0),
    };

    let times: Vec<f64> = outputs.iter().filter_map(|o| o.metadata().execution_time).collect();
    let confidences: Vec<f64> = outputs.iter().filter_map(|o| o.metadata().confidence()).collect();
    let performance_metrics = PerformanceMetrics {
        total_execution_time: wall_clock,
        avg_task_time: stats::mean(&times).unwrap_or(0.0),
        min_task_time: stats::min(&times).unwrap_or(0.0),
        max_task_time: stats::max(&times).unwrap_or(0.0),
        avg_confidence: stats::mean(&confidences),
        min_confidence: stats::min(&confidences),
        max_confidence: stats::max(&confidences),
    };

    let validations: Vec<_> = outputs.iter().filter_map(|o| o.validation()).collect();
    let scores: Vec<f64> = validations.iter().map(|v| v.validation_score()).collect();
    let quality_metrics = QualityMetrics {
        outputs_with_validation: validations.len(),
        avg_validation_score: stats::mean(&scores),
        outputs_with_errors: validations.iter().filter(|v| !v.errors().is_empty()).count(),
        outputs_with_warnings: validations.iter().filter(|v| !v.warnings().is_empty()).count(),
    };

    Some(WorkflowAnalytics {
        total_outputs: outputs.len(),
        success_rate: success_rate(&all),
        status_distribution,
        agent_count: agent_performance.len(),
        agent_performance,
        content_metrics,
        performance_metrics,
        quality_metrics,
    })
}

fn generate_insights(analytics: &WorkflowAnalytics, outputs: &[StructuredOutput]) -> Vec<String> {
    let mut insights = Vec::new();

    let rate = analytics.success_rate;
    insights.push(
        if rate >= 1.0 {
            "Perfect execution: all outputs completed successfully"
        } else if rate >= 0.8 {
            "High success rate: most outputs completed successfully"
        } else if rate >= 0.5 {
            "Moderate success rate: some outputs may need attention"
        } else {
            "Low success rate: workflow may need debugging"
        }
        .to_string(),
    );

    let words = analytics.content_metrics.total_words;
    if words > 10_000 {
        insights.push("High content volume generated".to_string());
    } else if words > 5_000 {
        insights.push("Moderate content volume generated".to_string());
    }

    let seconds = analytics.performance_metrics.total_execution_time;
    if seconds > 300.0 {
        insights.push("Long execution time, consider optimization".to_string());
    } else if seconds < 30.0 {
        insights.push("Fast execution time".to_string());
    }

    let quality = &analytics.quality_metrics;
    if quality.avg_validation_score.is_some_and(|s| s > 0.9) {
        insights.push("High quality outputs with excellent validation scores".to_string());
    } else if quality.outputs_with_errors > 0 {
        insights.push(format!(
            "{} outputs have validation errors",
            quality.outputs_with_errors
        ));
    }

    // first role wins ties
    let best = analytics
        .agent_performance
        .iter()
        .fold(None::<&AgentPerformance>, |best, agent| match best {
            Some(b) if b.success_rate >= agent.success_rate => Some(b),
            _ => Some(agent),
        });
    if let Some(best) = best.filter(|b| b.success_rate >= 1.0) {
        insights.push(format!("{} achieved perfect performance", best.agent_role));
    }

    let mut seen = HashSet::new();
    let types: Vec<OutputType> = outputs
        .iter()
        .map(|o| o.output_type())
        .filter(|t| seen.insert(*t))
        .collect();
    if types.len() > 1 {
        let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        insights.push(format!("Diverse output types: {}", names.join(", ")));
    }

    insights
}
