use crate::test_utils::{
    bindings, collect_sorted, delayed_entry, delayed_stream, entry_with, example_entries,
    example_result, failing_entry, variables, CountingMetadata, DelayedMetadata, SourceTracker,
};
use futures::StreamExt;
use rdf_federation_common::{BindingsOutput, MutableMetadata, StaticMetadata};
use rdf_federation_join::{
    AdaptiveJoinConfig, JoinAction, JoinAlgorithmRegistry, JoinConfig, JoinContext, JoinError,
    JoinMediator, JoinResult,
};
use rdf_federation_model::{Cardinality, Metadata, MetadataVariable, Variable};
use std::sync::Arc;
use std::time::Duration;

const DELAY: Duration = Duration::from_millis(10);

fn mediator(adaptive: AdaptiveJoinConfig) -> JoinMediator {
    JoinMediator::new(
        JoinAlgorithmRegistry::default(),
        JoinConfig::default().with_adaptive(adaptive),
    )
}

fn with_timeout(timeout: Option<Duration>) -> AdaptiveJoinConfig {
    AdaptiveJoinConfig::new().with_timeout(timeout)
}

/// The running example with a delay between bindings. The metadata of the left entry is
/// observed.
fn observed_example<M>(metadata: Arc<CountingMetadata<M>>) -> JoinAction
where
    M: rdf_federation_common::MetadataProvider + 'static,
{
    let (left, right) = example_entries();
    JoinAction::inner(vec![
        entry_with(delayed_stream(left, DELAY), metadata, &["x", "y"]),
        delayed_entry(right, &["x", "z"], DELAY),
    ])
}

fn left_metadata() -> Metadata {
    Metadata::new(Cardinality::exact(2), variables(&["x", "y"]))
}

/// The running example with tracked sources. The metadata of the left entry is observed.
fn tracked_example<M>(
    metadata: Arc<CountingMetadata<M>>,
    left_source: &SourceTracker,
    right_source: &SourceTracker,
) -> JoinAction
where
    M: rdf_federation_common::MetadataProvider + 'static,
{
    let (left, right) = example_entries();
    let right_metadata = Metadata::new(Cardinality::exact(2), variables(&["x", "z"]));
    JoinAction::inner(vec![
        entry_with(
            left_source.track(delayed_stream(left, DELAY)),
            metadata,
            &["x", "y"],
        ),
        entry_with(
            right_source.track(delayed_stream(right, DELAY)),
            Arc::new(StaticMetadata::new(right_metadata)),
            &["x", "z"],
        ),
    ])
}

async fn collect_after(
    first: Vec<rdf_federation_model::Bindings>,
    output: BindingsOutput,
) -> JoinResult<Vec<rdf_federation_model::Bindings>> {
    let mut result = collect_sorted(output).await?;
    result.extend(first);
    result.sort_by_key(ToString::to_string);
    Ok(result)
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_with_zero_timeout_switches_immediately() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));

    let output = mediator(with_timeout(Some(Duration::ZERO)))
        .join(action)
        .await?;

    assert_eq!(collect_sorted(output).await?, example_result());
    assert_eq!(metadata.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_without_timeout_never_switches() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));

    let output = mediator(with_timeout(None)).join(action).await?;

    assert_eq!(collect_sorted(output).await?, example_result());
    assert_eq!(metadata.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_switches_mid_stream() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));
    let mut output = mediator(with_timeout(Some(Duration::from_millis(25))))
        .join(action)
        .await?;

    let first = output.stream.next().await.transpose()?;
    let result = collect_after(first.into_iter().collect(), output).await?;

    assert_eq!(result, example_result());
    assert_eq!(metadata.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_is_exactly_once_for_any_timeout() -> JoinResult<()> {
    let timeouts = [0, 5, 10, 15, 20, 25, 30, 35, 40, 45, 100]
        .map(|millis| Some(Duration::from_millis(millis)));
    for timeout in timeouts.into_iter().chain([None]) {
        let (left, right) = example_entries();
        let action = JoinAction::inner(vec![
            delayed_entry(left, &["x", "y"], DELAY),
            delayed_entry(right, &["x", "z"], DELAY),
        ]);

        let output = mediator(with_timeout(timeout)).join(action).await?;

        assert_eq!(collect_sorted(output).await?, example_result(), "{timeout:?}");
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_with_duplicates_is_exactly_once() -> JoinResult<()> {
    let left = vec![bindings(&[("x", 1)]); 3];
    let right = vec![bindings(&[("x", 1), ("z", 1)]); 2];
    let action = JoinAction::inner(vec![
        delayed_entry(left, &["x"], DELAY),
        delayed_entry(right, &["x", "z"], DELAY),
    ]);

    let output = mediator(with_timeout(Some(Duration::from_millis(35))))
        .join(action)
        .await?;

    assert_eq!(
        collect_sorted(output).await?,
        vec![bindings(&[("x", 1), ("z", 1)]); 6]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_metadata_invalidation_triggers_a_switch() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(MutableMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));
    let mut output = mediator(with_timeout(None)).join(action).await?;

    let first = output.stream.next().await.transpose()?;
    metadata.inner.update(left_metadata());
    let result = collect_after(first.into_iter().collect(), output).await?;

    assert_eq!(result, example_result());
    assert_eq!(metadata.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_is_ignored_if_disabled() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(MutableMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));
    let adaptive = with_timeout(None).with_switch_on_invalidation(false);
    let mut output = mediator(adaptive).join(action).await?;

    let first = output.stream.next().await.transpose()?;
    metadata.inner.update(left_metadata());
    let result = collect_after(first.into_iter().collect(), output).await?;

    assert_eq!(result, example_result());
    assert_eq!(metadata.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_re_planning_keeps_the_first_plan() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(MutableMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata));
    let registry = JoinAlgorithmRegistry::with_algorithms(&["inner-symmetric-hash"])?;
    let config = JoinConfig::default().with_adaptive(with_timeout(None));
    let mut output = JoinMediator::new(registry, config).join(action).await?;

    let first = output.stream.next().await.transpose()?;
    // A hash join cannot look up a variable that may be unbound.
    metadata.inner.update(Metadata::new(
        Cardinality::exact(2),
        [
            MetadataVariable::undefinable(Variable::new_unchecked("x")),
            MetadataVariable::new(Variable::new_unchecked("y")),
        ],
    ));
    let result = collect_after(first.into_iter().collect(), output).await?;

    assert_eq!(result, example_result());
    assert_eq!(metadata.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_adaptive_join_propagates_upstream_errors() -> JoinResult<()> {
    let (_, right) = example_entries();
    let action = JoinAction::inner(vec![
        failing_entry(vec![bindings(&[("x", 1), ("y", 2)])], &["x", "y"]),
        delayed_entry(right, &["x", "z"], DELAY),
    ]);

    let output = mediator(with_timeout(Some(Duration::from_millis(5))))
        .join(action)
        .await?;

    let error = collect_sorted(output).await.unwrap_err();
    assert!(matches!(error, JoinError::UpstreamStream(_)), "{error}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_context_can_skip_the_adaptive_controller() -> JoinResult<()> {
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = observed_example(Arc::clone(&metadata))
        .with_context(JoinContext::new().with_skip_adaptive(true));

    let output = mediator(with_timeout(Some(Duration::ZERO)))
        .join(action)
        .await?;

    assert_eq!(collect_sorted(output).await?, example_result());
    assert_eq!(metadata.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_output_destroys_the_first_plan() -> JoinResult<()> {
    let (left_source, right_source) = (SourceTracker::default(), SourceTracker::default());
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = tracked_example(Arc::clone(&metadata), &left_source, &right_source);
    let mut output = mediator(with_timeout(Some(Duration::from_millis(100))))
        .join(action)
        .await?;

    let first = output.stream.next().await.transpose()?;
    assert!(first.is_some());
    assert!(!left_source.is_dropped());

    drop(output);
    assert!(left_source.is_dropped());
    assert!(right_source.is_dropped());

    tokio::time::advance(Duration::from_millis(200)).await;
    assert_eq!(metadata.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_output_while_switching_destroys_both_plans() -> JoinResult<()> {
    let (left_source, right_source) = (SourceTracker::default(), SourceTracker::default());
    let slow = DelayedMetadata::new(left_metadata(), Duration::from_millis(20));
    let metadata = Arc::new(CountingMetadata::new(slow));
    let action = tracked_example(Arc::clone(&metadata), &left_source, &right_source);
    let mut output = mediator(with_timeout(Some(Duration::from_millis(5))))
        .join(action)
        .await?;

    // The timeout has elapsed while the first plan was planned. Re-planning waits for metadata.
    let next = tokio::time::timeout(Duration::from_millis(10), output.stream.next()).await;
    assert!(next.is_err());
    assert_eq!(metadata.calls(), 2);

    drop(output);
    assert!(left_source.is_dropped());
    assert!(right_source.is_dropped());

    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(metadata.calls(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sources_are_pulled_once_across_both_plans() -> JoinResult<()> {
    let (left_source, right_source) = (SourceTracker::default(), SourceTracker::default());
    let metadata = Arc::new(CountingMetadata::new(StaticMetadata::new(left_metadata())));
    let action = tracked_example(Arc::clone(&metadata), &left_source, &right_source);
    let mut output = mediator(with_timeout(Some(Duration::from_millis(25))))
        .join(action)
        .await?;

    let first = output.stream.next().await.transpose()?;
    let result = collect_after(first.into_iter().collect(), output).await?;

    assert_eq!(result, example_result());
    assert_eq!(metadata.calls(), 2);
    assert_eq!(left_source.pulled(), 2);
    assert_eq!(right_source.pulled(), 2);
    assert!(left_source.is_dropped());
    assert!(right_source.is_dropped());
    Ok(())
}
