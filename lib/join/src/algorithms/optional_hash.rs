use crate::algorithms::{
    accept, binary_entries, binary_index_key, derived_metadata, optional_metadata,
    require_entries, require_join_type, total_request_cost, HashProbeJoinStream, JoinAlgorithm,
    ProbeMode,
};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{BindingsOutput, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::Metadata;

/// A left outer join that indexes the optional (right) entry on the variables it shares with the
/// left entry.
///
/// Blocks until the right entry has been materialized, then streams the left entry. Left
/// bindings without a compatible right binding are emitted unchanged.
#[derive(Debug, Default)]
pub struct OptionalHashJoin;

impl OptionalHashJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "optional-hash";
}

#[async_trait]
impl JoinAlgorithm for OptionalHashJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Optional)?;
        require_entries(Self::NAME, metadata, |n| n == 2, "exactly two entries")?;
        binary_index_key(Self::NAME, metadata)?;

        let left = metadata[0].cardinality.value;
        let right = metadata[1].cardinality.value;
        Ok(JoinCoefficients {
            iterations: left + right,
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
        let output_metadata = derived_metadata(&action.entries, optional_metadata);
        let (left, right) = binary_entries(Self::NAME, action)?;

        let stream = HashProbeJoinStream::new(
            right.output.stream,
            left.output.stream,
            keys,
            ProbeMode::Optional,
        );
        Ok(BindingsOutput::new(Box::pin(stream), output_metadata))
    }
}
