use crate::algorithms::{accept, require_entries, require_join_type, JoinAlgorithm};
use crate::{JoinAction, JoinCoefficients, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{
    empty_bindings_stream, BindingsOutput, JoinRejection, JoinResult, JoinType, StaticMetadata,
};
use rdf_federation_model::Metadata;
use std::sync::Arc;

/// The inner join of a single entry, which is the entry itself.
#[derive(Debug, Default)]
pub struct InnerSingleJoin;

impl InnerSingleJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-single";
}

#[async_trait]
impl JoinAlgorithm for InnerSingleJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        require_entries(Self::NAME, metadata, |n| n == 1, "exactly one entry")?;
        Ok(JoinCoefficients::default())
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        _mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        accept(self, action.join_type, &metadata)?;
        Ok(match action.entries.into_iter().next() {
            Some(entry) => entry.output,
            None => BindingsOutput::new(
                empty_bindings_stream(),
                Arc::new(StaticMetadata::new(Metadata::unknown())),
            ),
        })
    }
}
