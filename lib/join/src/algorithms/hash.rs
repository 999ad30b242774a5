use crate::algorithms::{
    accept, binary_entries, binary_index_key, derived_metadata, inner_sum_metadata,
    require_entries, require_join_type, total_request_cost, HashProbeJoinStream, JoinAlgorithm,
    ProbeMode,
};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{BindingsOutput, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::Metadata;

/// A blocking inner join of two entries. Materializes the first entry into an index and streams
/// the second entry through it.
#[derive(Debug, Default)]
pub struct InnerHashJoin;

impl InnerHashJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-hash";
}

#[async_trait]
impl JoinAlgorithm for InnerHashJoin {
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

        let build = metadata[0].cardinality.value;
        let probe = metadata[1].cardinality.value;
        Ok(JoinCoefficients {
            iterations: build + probe,
            persisted_items: build,
            blocking_items: build,
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

        let stream = HashProbeJoinStream::new(
            left.output.stream,
            right.output.stream,
            keys,
            ProbeMode::Inner,
        );
        Ok(BindingsOutput::new(Box::pin(stream), output_metadata))
    }
}
