use crate::algorithms::{
    accept, binary_entries, derived_metadata, multiply, optional_metadata, require_entries,
    require_join_type, total_request_cost, JoinAlgorithm, NestedLoopJoinStream,
};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{BindingsOutput, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::Metadata;

/// A left outer join without an index.
///
/// Unlike [OptionalHashJoin](crate::algorithms::OptionalHashJoin), this join also handles shared
/// variables that may be unbound.
#[derive(Debug, Default)]
pub struct OptionalNestedLoopJoin;

impl OptionalNestedLoopJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "optional-nested-loop";
}

#[async_trait]
impl JoinAlgorithm for OptionalNestedLoopJoin {
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
        let output_metadata = derived_metadata(&action.entries, optional_metadata);
        let (left, right) = binary_entries(Self::NAME, action)?;

        let stream = NestedLoopJoinStream::new(left.output.stream, right.output.stream, true);
        Ok(BindingsOutput::new(Box::pin(stream), output_metadata))
    }
}
