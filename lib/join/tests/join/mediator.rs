use crate::test_utils::{
    bindings, collect_sorted, entry, entry_with, example_entries, example_result, variables,
};
use async_trait::async_trait;
use rdf_federation_common::{bindings_stream, StaticMetadata};
use rdf_federation_join::algorithms::InnerNestedLoopJoin;
use rdf_federation_join::{
    AdaptiveJoinConfig, BindingsOutput, CoefficientComparator, JoinAction, JoinAlgorithm,
    JoinAlgorithmRegistry, JoinCoefficients, JoinConfig, JoinMediator, JoinRejection, JoinResult,
    JoinType, LexicographicComparator,
};
use rdf_federation_model::{Cardinality, Metadata};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

fn example_action() -> JoinAction {
    let (left, right) = example_entries();
    JoinAction::inner(vec![
        entry(
            vec![left[0].clone(), left[1].clone(), bindings(&[("x", 3), ("y", 4)])],
            &["x", "y"],
        ),
        entry(right, &["x", "z"]),
    ])
}

#[tokio::test]
async fn test_explain_inner_join() {
    let explanation = JoinMediator::default().explain(&example_action()).await;

    insta::assert_snapshot!(explanation.to_string(), @r"
    inner join over 2 entries
      inner-none: rejected (requires no entries)
      inner-single: rejected (requires exactly one entry)
      inner-multi-empty: rejected (requires an entry with an exact cardinality of zero)
      inner-symmetric-hash: iterations=5, persisted=5, blocking=0, request_time=0
      inner-hash: iterations=5, persisted=3, blocking=3, request_time=0
      inner-multi-smallest: rejected (requires at least three entries)
      inner-nested-loop: iterations=6, persisted=0, blocking=0, request_time=0
      optional-hash: rejected (does not support inner joins)
      optional-nested-loop: rejected (does not support inner joins)
      minus-hash: rejected (does not support inner joins)
    selected: inner-hash
    ");
}

#[tokio::test]
async fn test_explain_without_applicable_algorithm() {
    let mediator = JoinMediator::new(JoinAlgorithmRegistry::empty(), JoinConfig::default());

    let explanation = mediator.explain(&example_action()).await;

    insta::assert_snapshot!(explanation.to_string(), @r"
    inner join over 2 entries
    selected: none
    ");
}

#[tokio::test]
async fn test_unbounded_estimates_prefer_non_persisting_algorithms() -> JoinResult<()> {
    let (left, right) = example_entries();
    let estimated = || {
        let metadata = Metadata::new(Cardinality::estimate(3.0), variables(&["x", "y"]));
        entry_with(
            bindings_stream(left.clone()),
            Arc::new(StaticMetadata::new(metadata)),
            &["x", "y"],
        )
    };

    let trusting = JoinMediator::new(
        JoinAlgorithmRegistry::default(),
        JoinConfig::default().with_unbounded_estimates(false),
    );
    let strict = JoinMediator::default();

    let trusted = trusting
        .explain(&JoinAction::inner(vec![estimated(), entry(right.clone(), &["x", "z"])]))
        .await;
    let unbounded = strict
        .explain(&JoinAction::inner(vec![estimated(), entry(right, &["x", "z"])]))
        .await;

    assert_eq!(trusted.selected, Some("inner-hash"));
    assert_eq!(unbounded.selected, Some("inner-nested-loop"));
    let coefficients = unbounded.selected_coefficients().map(|c| c.iterations);
    assert_eq!(coefficients, Some(f64::INFINITY));
    Ok(())
}

/// Prefers the most expensive algorithm.
#[derive(Debug)]
struct ReversedComparator;

impl CoefficientComparator for ReversedComparator {
    fn compare(&self, lhs: &JoinCoefficients, rhs: &JoinCoefficients) -> Ordering {
        LexicographicComparator.compare(rhs, lhs)
    }
}

#[tokio::test]
async fn test_custom_comparator() -> JoinResult<()> {
    let config = JoinConfig::default().with_adaptive(AdaptiveJoinConfig::disabled());
    let mediator = JoinMediator::new(JoinAlgorithmRegistry::default(), config)
        .with_comparator(Arc::new(ReversedComparator));

    let explanation = mediator.explain(&example_action()).await;
    let output = mediator.join(example_action()).await?;

    assert_eq!(explanation.selected, Some("inner-nested-loop"));
    assert_eq!(collect_sorted(output).await?, example_result());
    Ok(())
}

/// A free inner join that delegates to the nested loop join and counts its executions.
#[derive(Debug, Default)]
struct CountingJoin {
    runs: AtomicUsize,
}

#[async_trait]
impl JoinAlgorithm for CountingJoin {
    fn name(&self) -> &'static str {
        "inner-counting"
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        InnerNestedLoopJoin.estimate(join_type, metadata)?;
        Ok(JoinCoefficients::default())
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        self.runs.fetch_add(1, AtomicOrdering::SeqCst);
        InnerNestedLoopJoin.run(action, metadata, mediator).await
    }
}

#[tokio::test]
async fn test_registered_algorithms_take_part_in_the_selection() -> JoinResult<()> {
    let algorithm = Arc::new(CountingJoin::default());
    let mut registry = JoinAlgorithmRegistry::default();
    registry.register(algorithm.clone());
    let config = JoinConfig::default().with_adaptive(AdaptiveJoinConfig::disabled());
    let mediator = JoinMediator::new(registry, config);

    let output = mediator.join(example_action()).await?;

    assert_eq!(collect_sorted(output).await?, example_result());
    assert_eq!(algorithm.runs.load(AtomicOrdering::SeqCst), 1);
    Ok(())
}
