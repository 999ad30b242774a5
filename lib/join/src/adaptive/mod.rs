//! The adaptive join controller.
//!
//! An adaptive join starts with the plan that the current metadata suggests (plan A). If plan A
//! has not finished once the configured timeout elapsed, or once the metadata of an entry has
//! been invalidated, the join is planned again with the refreshed metadata (plan B). Plan A is
//! destroyed and plan B replays every entry from the start. Bindings that plan A already emitted
//! are suppressed when plan B produces them again.

mod replay;
mod session;

pub use replay::{ReplayReader, ReplayableBindings};
pub use session::AdaptiveSession;

use crate::{AdaptiveJoinConfig, JoinAction, JoinContext, JoinEntry, JoinMediator};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Stream, StreamExt};
use rdf_federation_common::{
    BindingsOutput, BindingsStream, JoinError, JoinResult, JoinType, MetadataRef,
};
use rdf_federation_model::{Bindings, GraphPattern};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::{fmt, mem};
use tracing::{debug, warn};

/// Executes `action` under the adaptive controller.
///
/// If neither a timeout nor a metadata invalidation can ever trigger a switch, the join is
/// executed once without replaying its entries.
///
/// A tokio runtime with an enabled time driver must be running.
pub async fn join_adaptive(
    mediator: JoinMediator,
    action: JoinAction,
) -> JoinResult<BindingsOutput> {
    let JoinAction {
        join_type,
        entries,
        context,
    } = action;
    let context = context.with_skip_adaptive(true);

    let metadata = entries.iter().map(|entry| &entry.output.metadata);
    let Some(trigger) = switch_trigger(mediator.config().adaptive(), metadata) else {
        debug!("Adaptive join can never switch its plan");
        let action = JoinAction::new(join_type, entries).with_context(context);
        return mediator.join_once(action).await;
    };

    let mut sources = Vec::with_capacity(entries.len());
    let mut first_entries = Vec::with_capacity(entries.len());
    for entry in entries {
        let source = PlanSource {
            operation: entry.operation,
            metadata: entry.output.metadata,
            replay: ReplayableBindings::new(entry.output.stream),
        };
        first_entries.push(source.entry());
        sources.push(source);
    }

    let first = JoinAction::new(join_type, first_entries).with_context(context.clone());
    let output = mediator.join_once(first).await?;

    let switch = PlanSwitch {
        mediator,
        join_type,
        context,
        sources,
    };
    let stream = AdaptiveJoinStream {
        state: AdaptiveState::First {
            stream: output.stream,
            trigger,
            switch,
        },
        session: AdaptiveSession::new(),
    };
    Ok(BindingsOutput::new(Box::pin(stream), output.metadata))
}

/// Completes once the join should be planned again. Returns [None] if that can never happen.
fn switch_trigger<'a>(
    config: &AdaptiveJoinConfig,
    metadata: impl IntoIterator<Item = &'a MetadataRef>,
) -> Option<BoxFuture<'static, ()>> {
    let mut triggers: Vec<BoxFuture<'static, ()>> = Vec::new();
    if let Some(timeout) = config.timeout() {
        triggers.push(Box::pin(tokio::time::sleep(timeout)));
    }
    if config.switch_on_invalidation() {
        let invalidations = metadata
            .into_iter()
            .filter_map(|metadata| metadata.validation_state())
            .map(|state| state.invalidated().boxed());
        triggers.extend(invalidations);
    }

    (!triggers.is_empty()).then(|| future::select_all(triggers).map(|_| ()).boxed())
}

/// An entry of the adaptive join.
struct PlanSource {
    operation: GraphPattern,
    metadata: MetadataRef,
    replay: ReplayableBindings,
}

impl PlanSource {
    /// Creates a join entry that reads the entry from the start.
    fn entry(&self) -> JoinEntry {
        let output = BindingsOutput::new(
            Box::pin(self.replay.reader()),
            Arc::clone(&self.metadata),
        );
        JoinEntry::new(self.operation.clone(), output)
    }
}

/// Everything that is needed to plan the join again.
struct PlanSwitch {
    mediator: JoinMediator,
    join_type: JoinType,
    context: JoinContext,
    sources: Vec<PlanSource>,
}

enum SwitchOutcome {
    /// Plan B replaced plan A.
    Switched(BindingsStream),
    /// Plan B could not be planned. Plan A continues.
    Fallback(BindingsStream),
    /// Plan A has been destroyed and plan B failed.
    Failed(JoinError),
}

impl PlanSwitch {
    /// Plans the join again and, if that succeeds, destroys `first` and runs the new plan.
    async fn run(self, first: BindingsStream) -> SwitchOutcome {
        let entries = self.sources.iter().map(PlanSource::entry).collect::<Vec<_>>();
        let resolving = self.mediator.resolve_metadata(&entries);
        let metadata = resolving.await;

        let selection = match self.mediator.select(self.join_type, &metadata) {
            Ok(selection) => selection,
            Err(error) => {
                warn!(%error, "Could not plan the adaptive join again, keeping the first plan");
                drop(entries);
                self.release_history();
                return SwitchOutcome::Fallback(first);
            }
        };

        drop(first);
        self.release_history();
        debug!(
            algorithm = selection.algorithm.name(),
            coefficients = %selection.coefficients,
            "Switching adaptive join plan"
        );

        let action = JoinAction::new(self.join_type, entries).with_context(self.context.clone());
        match selection
            .algorithm
            .run(action, metadata, &self.mediator)
            .await
        {
            Ok(output) => SwitchOutcome::Switched(output.stream),
            Err(error) => SwitchOutcome::Failed(error),
        }
    }

    /// The remaining plan is the last reader of every entry.
    fn release_history(&self) {
        for source in &self.sources {
            source.replay.release_history();
        }
    }
}

enum AdaptiveState {
    First {
        stream: BindingsStream,
        trigger: BoxFuture<'static, ()>,
        switch: PlanSwitch,
    },
    Switching(BoxFuture<'static, SwitchOutcome>),
    Second(BindingsStream),
    FirstOnly(BindingsStream),
    Done,
}

/// The output stream of an adaptive join.
pub struct AdaptiveJoinStream {
    state: AdaptiveState,
    session: AdaptiveSession,
}

impl AdaptiveJoinStream {
    fn start_switch(&mut self) {
        if let AdaptiveState::First { stream, switch, .. } =
            mem::replace(&mut self.state, AdaptiveState::Done)
        {
            debug!(emitted = self.session.len(), "Re-planning adaptive join");
            self.state = AdaptiveState::Switching(switch.run(stream).boxed());
        }
    }
}

impl Stream for AdaptiveJoinStream {
    type Item = JoinResult<Bindings>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match &mut this.state {
                AdaptiveState::First {
                    stream, trigger, ..
                } => {
                    if trigger.poll_unpin(cx).is_ready() {
                        this.start_switch();
                        continue;
                    }

                    match ready!(stream.poll_next_unpin(cx)) {
                        Some(Ok(bindings)) => {
                            this.session.record(&bindings);
                            return Poll::Ready(Some(Ok(bindings)));
                        }
                        Some(Err(error)) => {
                            this.state = AdaptiveState::Done;
                            return Poll::Ready(Some(Err(error)));
                        }
                        None => {
                            this.state = AdaptiveState::Done;
                            return Poll::Ready(None);
                        }
                    }
                }
                AdaptiveState::Switching(switching) => match ready!(switching.poll_unpin(cx)) {
                    SwitchOutcome::Switched(stream) => {
                        debug!("Adaptive join switched its plan");
                        this.state = AdaptiveState::Second(stream);
                    }
                    SwitchOutcome::Fallback(stream) => {
                        this.session.clear();
                        this.state = AdaptiveState::FirstOnly(stream);
                    }
                    SwitchOutcome::Failed(error) => {
                        this.state = AdaptiveState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                },
                AdaptiveState::Second(stream) => match ready!(stream.poll_next_unpin(cx)) {
                    Some(Ok(bindings)) => {
                        if !this.session.suppress(&bindings) {
                            return Poll::Ready(Some(Ok(bindings)));
                        }
                    }
                    Some(Err(error)) => {
                        this.state = AdaptiveState::Done;
                        return Poll::Ready(Some(Err(error)));
                    }
                    None => {
                        this.state = AdaptiveState::Done;
                        return Poll::Ready(None);
                    }
                },
                AdaptiveState::FirstOnly(stream) => {
                    let next = ready!(stream.poll_next_unpin(cx));
                    if !matches!(next, Some(Ok(_))) {
                        this.state = AdaptiveState::Done;
                    }
                    return Poll::Ready(next);
                }
                AdaptiveState::Done => return Poll::Ready(None),
            }
        }
    }
}

impl fmt::Debug for AdaptiveJoinStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            AdaptiveState::First { .. } => "first",
            AdaptiveState::Switching(_) => "switching",
            AdaptiveState::Second(_) => "second",
            AdaptiveState::FirstOnly(_) => "first-only",
            AdaptiveState::Done => "done",
        };
        f.debug_struct("AdaptiveJoinStream")
            .field("state", &state)
            .field("recorded", &self.session.len())
            .finish()
    }
}
