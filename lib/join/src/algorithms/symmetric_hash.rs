use crate::algorithms::{
    accept, binary_entries, binary_index_key, derived_metadata, inner_sum_metadata,
    require_entries, require_join_type, total_request_cost, JoinAlgorithm,
};
use crate::index::BindingsIndex;
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdf_federation_common::{
    BindingsOutput, BindingsStream, JoinError, JoinRejection, JoinResult, JoinType,
};
use rdf_federation_model::{Bindings, Metadata, Variable};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A non-blocking inner join of two entries that indexes both sides while they arrive.
///
/// Every binding first probes the index of the other side and is then added to the index of its
/// own side. Hence, results are emitted as soon as both matching bindings have been seen.
#[derive(Debug, Default)]
pub struct InnerSymmetricHashJoin;

impl InnerSymmetricHashJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-symmetric-hash";
}

#[async_trait]
impl JoinAlgorithm for InnerSymmetricHashJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        require_entries(Self::NAME, metadata, |n| n == 2, "exactly two entries")?;
        if binary_index_key(Self::NAME, metadata)?.is_empty() {
            return Err(JoinRejection::new(
                Self::NAME,
                "requires at least one shared variable",
            ));
        }

        let items: f64 = metadata.iter().map(|m| m.cardinality.value).sum();
        Ok(JoinCoefficients {
            iterations: items,
            persisted_items: items,
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
        let keys = binary_index_key(Self::NAME, &metadata).unwrap_or_default();
        let output_metadata = derived_metadata(&action.entries, inner_sum_metadata);
        let (left, right) = binary_entries(Self::NAME, action)?;

        let stream = SymmetricHashJoinStream::new(left.output.stream, right.output.stream, keys);
        Ok(BindingsOutput::new(Box::pin(stream), output_metadata))
    }
}

/// The stream of an [InnerSymmetricHashJoin].
///
/// Both inputs are polled alternately so that neither side is drained while the other one is
/// starved.
pub struct SymmetricHashJoinStream {
    inputs: [Option<BindingsStream>; 2],
    indexes: [Option<BindingsIndex<Bindings>>; 2],
    pending: VecDeque<Bindings>,
    next_side: usize,
}

impl SymmetricHashJoinStream {
    /// Creates a new [SymmetricHashJoinStream] that joins on `keys`.
    pub fn new(left: BindingsStream, right: BindingsStream, keys: Vec<Variable>) -> Self {
        Self {
            inputs: [Some(left), Some(right)],
            indexes: [
                Some(BindingsIndex::new(keys.clone())),
                Some(BindingsIndex::new(keys)),
            ],
            pending: VecDeque::new(),
            next_side: 0,
        }
    }

    /// Destroys both inputs and releases the indexes.
    fn close(&mut self) {
        self.inputs = [None, None];
        self.indexes = [None, None];
    }

    fn fail(&mut self, error: JoinError) -> Poll<Option<JoinResult<Bindings>>> {
        self.close();
        self.pending.clear();
        Poll::Ready(Some(Err(error)))
    }

    /// Joins `bindings`, which arrived on `side`, with everything seen on the other side.
    fn process(&mut self, side: usize, bindings: Bindings) -> JoinResult<()> {
        let other = 1 - side;
        if let Some(index) = &self.indexes[other] {
            let merged = index
                .get(&bindings)
                .iter()
                .filter_map(|candidate| bindings.merge(candidate));
            self.pending.extend(merged);
        }

        // Only needed while the other side can still probe it.
        if self.inputs[other].is_some() {
            if let Some(index) = &mut self.indexes[side] {
                index.insert(bindings)?;
            }
        }
        Ok(())
    }

    fn finish_side(&mut self, side: usize) {
        let other = 1 - side;
        self.inputs[side] = None;
        self.indexes[other] = None;

        let nothing_to_probe = self.indexes[side]
            .as_ref()
            .map_or(true, BindingsIndex::is_empty);
        if nothing_to_probe {
            self.close();
        }
    }

    fn is_exhausted(&self) -> bool {
        self.inputs.iter().all(Option::is_none)
    }
}

impl Stream for SymmetricHashJoinStream {
    type Item = JoinResult<Bindings>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        'outer: loop {
            if let Some(bindings) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(bindings)));
            }
            if self.is_exhausted() {
                return Poll::Ready(None);
            }

            for offset in 0..2 {
                let side = (self.next_side + offset) % 2;
                let Some(input) = self.inputs[side].as_mut() else {
                    continue;
                };

                match input.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => {
                        self.next_side = 1 - side;
                        if let Err(error) = self.process(side, bindings) {
                            return self.fail(error);
                        }
                        continue 'outer;
                    }
                    Poll::Ready(Some(Err(error))) => return self.fail(error),
                    Poll::Ready(None) => {
                        self.finish_side(side);
                        continue 'outer;
                    }
                    Poll::Pending => {}
                }
            }
            return Poll::Pending;
        }
    }
}
