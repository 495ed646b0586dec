//! Workflow-level aggregation and pipeline orchestration for OutputKit.
//!
//! This crate combines processed outputs into a [`WorkflowResult`] with
//! analytics and insights, consolidates outputs (merge / summary / best),
//! produces comparison reports, and ties processing and validation together
//! in [`run_pipeline`].

pub mod aggregator;
pub mod pipeline;
mod stats;
pub mod workflow;

pub use aggregator::{
    ComparisonOutcome, ComparisonReport, ConsolidationStrategy, CriterionComparison,
    DEFAULT_CRITERIA, NumericStats, RankedOutput, aggregate_workflow_results, best_output_score,
    create_consolidated_output, generate_comparison_report, ranking_score,
};
pub use pipeline::{
    PipelineConfig, PipelineInput, PipelineResult, ProgressReporter, SilentProgress, run_pipeline,
};
pub use workflow::{
    AgentPerformance, ContentMetrics, PerformanceMetrics, QualityMetrics, StatusDistribution,
    WorkflowAnalytics, WorkflowResult, WorkflowSummary,
};
