use crate::algorithms::{
    accept, derived_metadata, inner_product_metadata, multiply, require_entries,
    require_join_type, total_request_cost, JoinAlgorithm,
};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdf_federation_common::{BindingsOutput, BindingsStream, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::{Bindings, Metadata};
use std::pin::Pin;
use std::task::{Context, Poll};

/// An inner join of two or more entries that compares every binding of one entry with every
/// binding of the next.
///
/// This is the fallback for joins without shared variables (cross products) and for entries
/// whose shared variables may be unbound.
#[derive(Debug, Default)]
pub struct InnerNestedLoopJoin;

impl InnerNestedLoopJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-nested-loop";
}

#[async_trait]
impl JoinAlgorithm for InnerNestedLoopJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        require_entries(Self::NAME, metadata, |n| n >= 2, "at least two entries")?;

        Ok(JoinCoefficients {
            iterations: multiply(metadata.iter().map(|m| m.cardinality.value)),
            persisted_items: 0.0,
            blocking_items: 0.0,
            request_time: total_request_cost(metadata),
        })
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        _mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        accept(self, action.join_type, &metadata)?;
        let output_metadata = derived_metadata(&action.entries, inner_product_metadata);

        let mut streams = action.entries.into_iter().map(|entry| entry.output.stream);
        let first = streams
            .next()
            .unwrap_or_else(rdf_federation_common::empty_bindings_stream);
        let stream = streams.fold(first, |outer, inner| {
            Box::pin(NestedLoopJoinStream::new(outer, inner, false)) as BindingsStream
        });
        Ok(BindingsOutput::new(stream, output_metadata))
    }
}

/// Joins every binding of the outer stream with every binding of the inner stream.
///
/// The inner stream is materialized while the first outer binding is processed and replayed for
/// all further outer bindings. If `keep_unmatched` is set, outer bindings without a compatible
/// inner binding are emitted unchanged (a left outer join).
pub struct NestedLoopJoinStream {
    outer: Option<BindingsStream>,
    inner: Option<BindingsStream>,
    inner_items: Vec<Bindings>,
    current: Option<Bindings>,
    position: usize,
    matched: bool,
    keep_unmatched: bool,
}

impl NestedLoopJoinStream {
    /// Creates a new [NestedLoopJoinStream].
    pub fn new(outer: BindingsStream, inner: BindingsStream, keep_unmatched: bool) -> Self {
        Self {
            outer: Some(outer),
            inner: Some(inner),
            inner_items: Vec::new(),
            current: None,
            position: 0,
            matched: false,
            keep_unmatched,
        }
    }

    fn close(&mut self) {
        self.outer = None;
        self.inner = None;
        self.inner_items = Vec::new();
        self.current = None;
    }

    /// Whether no outer binding can produce a result anymore.
    fn inner_is_exhausted_and_empty(&self) -> bool {
        self.inner.is_none() && self.inner_items.is_empty() && !self.keep_unmatched
    }
}

impl Stream for NestedLoopJoinStream {
    type Item = JoinResult<Bindings>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.current.is_none() {
                if this.inner_is_exhausted_and_empty() {
                    this.close();
                }
                let Some(outer) = this.outer.as_mut() else {
                    return Poll::Ready(None);
                };
                match outer.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => {
                        this.current = Some(bindings);
                        this.position = 0;
                        this.matched = false;
                    }
                    Poll::Ready(Some(Err(error))) => {
                        this.close();
                        return Poll::Ready(Some(Err(error)));
                    }
                    Poll::Ready(None) => {
                        this.close();
                        return Poll::Ready(None);
                    }
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }

            if let Some(candidate) = this.inner_items.get(this.position) {
                this.position += 1;
                let merged = this.current.as_ref().and_then(|current| current.merge(candidate));
                if let Some(merged) = merged {
                    this.matched = true;
                    return Poll::Ready(Some(Ok(merged)));
                }
                continue;
            }

            if let Some(inner) = this.inner.as_mut() {
                match inner.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => this.inner_items.push(bindings),
                    Poll::Ready(Some(Err(error))) => {
                        this.close();
                        return Poll::Ready(Some(Err(error)));
                    }
                    Poll::Ready(None) => this.inner = None,
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }

            let unmatched = !this.matched;
            if let Some(current) = this.current.take() {
                if this.keep_unmatched && unmatched {
                    return Poll::Ready(Some(Ok(current)));
                }
            }
        }
    }
}
