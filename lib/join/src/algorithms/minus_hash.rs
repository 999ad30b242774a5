use crate::algorithms::{
    accept, binary_entries, binary_index_key, derived_metadata, minus_metadata, multiply,
    require_entries, require_join_type, total_request_cost, HashProbeJoinStream, JoinAlgorithm,
    ProbeMode,
};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{BindingsOutput, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::Metadata;

/// Evaluates a SPARQL `MINUS` by indexing the right entry and streaming the left entry.
///
/// Left bindings that share no variable with a right binding are never removed by it. The
/// variables of the metadata are only used as the index key; if no variable is known to be
/// shared, every left binding is compared with every right binding.
#[derive(Debug, Default)]
pub struct MinusHashJoin;

impl MinusHashJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "minus-hash";
}

#[async_trait]
impl JoinAlgorithm for MinusHashJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Minus)?;
        require_entries(Self::NAME, metadata, |n| n == 2, "exactly two entries")?;
        let keys = binary_index_key(Self::NAME, metadata)?;

        let left = metadata[0].cardinality.value;
        let right = metadata[1].cardinality.value;
        let probes = if keys.is_empty() {
            multiply([left, right])
        } else {
            left
        };
        Ok(JoinCoefficients {
            iterations: probes + right,
            persisted_items: right,
            blocking_items: right,
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
        let output_metadata = derived_metadata(&action.entries, minus_metadata);
        let (left, right) = binary_entries(Self::NAME, action)?;

        let stream = HashProbeJoinStream::new(
            right.output.stream,
            left.output.stream,
            keys,
            ProbeMode::Minus,
        );
        Ok(BindingsOutput::new(Box::pin(stream), output_metadata))
    }
}
