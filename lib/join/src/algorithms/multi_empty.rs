use crate::algorithms::{accept, inner_product_metadata, require_join_type, JoinAlgorithm};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{
    empty_bindings_stream, BindingsOutput, JoinRejection, JoinResult, JoinType, StaticMetadata,
};
use rdf_federation_model::Metadata;
use std::sync::Arc;

/// An inner join where one of the entries is known to be empty.
///
/// No entry is consumed. Dropping the entries closes their streams.
#[derive(Debug, Default)]
pub struct InnerMultiEmptyJoin;

impl InnerMultiEmptyJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-multi-empty";
}

#[async_trait]
impl JoinAlgorithm for InnerMultiEmptyJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        if !metadata.iter().any(|m| m.cardinality.is_exactly_empty()) {
            return Err(JoinRejection::new(
                Self::NAME,
                "requires an entry with an exact cardinality of zero",
            ));
        }
        Ok(JoinCoefficients::default())
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        _mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        accept(self, action.join_type, &metadata)?;
        drop(action);

        let output_metadata = inner_product_metadata(&metadata);
        Ok(BindingsOutput::new(
            empty_bindings_stream(),
            Arc::new(StaticMetadata::new(output_metadata)),
        ))
    }
}
