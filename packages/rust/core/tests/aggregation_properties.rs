//! Property-based tests for aggregation.
//!
//! Properties:
//! 1. Ranks are exactly 1..=N and scores never increase down the ranking
//! 2. Merge status is the worst status present
//! 3. Success rate equals the share of `success` outputs

use proptest::prelude::*;

use outputkit_core::{
    ConsolidationStrategy, aggregate_workflow_results, create_consolidated_output,
    generate_comparison_report,
};
use outputkit_shared::{OutputMetadata, OutputStatus, OutputType, StructuredOutput};

fn fast_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

fn status() -> impl Strategy<Value = OutputStatus> {
    prop_oneof![
        Just(OutputStatus::Success),
        Just(OutputStatus::Partial),
        Just(OutputStatus::Failed),
    ]
}

fn output() -> impl Strategy<Value = StructuredOutput> {
    (status(), prop::option::of(0usize..5000), "[A-Z][a-z]{2,8}").prop_map(|(status, words, role)| {
        let mut metadata = OutputMetadata::new("agent", role);
        metadata.word_count = words;
        let builder = StructuredOutput::builder("body text", OutputType::Text, metadata).status(status);
        let builder = if status == OutputStatus::Failed {
            builder.error_details("failed")
        } else {
            builder
        };
        builder.build().unwrap()
    })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(fast_config())]

    #[test]
    fn ranking_is_dense_and_sorted(outputs in prop::collection::vec(output(), 2..8)) {
        let outcome = generate_comparison_report(&outputs, None);
        let report = outcome.report().unwrap();
        let ranks: Vec<usize> = report.ranking.iter().map(|r| r.rank).collect();
        prop_assert_eq!(ranks, (1..=outputs.len()).collect::<Vec<_>>());
        prop_assert!(report.ranking.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn merge_takes_worst_status(outputs in prop::collection::vec(output(), 1..8)) {
        let merged = create_consolidated_output(&outputs, ConsolidationStrategy::Merge, "Team").unwrap();
        let worst = outputs.iter().map(|o| o.status().rank()).min().unwrap();
        prop_assert_eq!(merged.status().rank(), worst);
    }

    #[test]
    fn success_rate_is_share(outputs in prop::collection::vec(output(), 1..12)) {
        let expected = outputs.iter().filter(|o| o.status() == OutputStatus::Success).count() as f64
            / outputs.len() as f64;
        let workflow = aggregate_workflow_results(outputs, "wf", "Prop", None, None);
        let rate = workflow.analytics().unwrap().success_rate;
        prop_assert!((rate - expected).abs() < 1e-12);
    }
}
