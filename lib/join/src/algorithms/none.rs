use crate::algorithms::{accept, require_entries, require_join_type, JoinAlgorithm};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{
    bindings_stream, BindingsOutput, JoinRejection, JoinResult, JoinType, StaticMetadata,
};
use rdf_federation_model::{Bindings, Cardinality, Metadata, MetadataVariable};
use std::sync::Arc;

/// The inner join of zero entries, which is a single empty binding.
#[derive(Debug, Default)]
pub struct InnerNoneJoin;

impl InnerNoneJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-none";
}

#[async_trait]
impl JoinAlgorithm for InnerNoneJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        require_entries(Self::NAME, metadata, |n| n == 0, "no entries")?;
        Ok(JoinCoefficients::default())
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        _mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        accept(self, action.join_type, &metadata)?;
        let metadata = Metadata::new(Cardinality::exact(1), Vec::<MetadataVariable>::new());
        Ok(BindingsOutput::new(
            bindings_stream([Bindings::empty()]),
            Arc::new(StaticMetadata::new(metadata)),
        ))
    }
}
