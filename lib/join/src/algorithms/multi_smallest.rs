use crate::algorithms::{
    accept, multiply, require_entries, require_join_type, total_request_cost, JoinAlgorithm,
};
use crate::{JoinAction, JoinCoefficients, JoinEntry, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{BindingsOutput, JoinError, JoinRejection, JoinResult, JoinType};
use rdf_federation_model::{GraphPattern, Metadata};

/// Joins three or more entries by first joining the two smallest entries and then joining their
/// result with the remaining entries.
///
/// Both joins are planned by the mediator. The adaptive controller is disabled for the first one.
#[derive(Debug, Default)]
pub struct InnerMultiSmallestJoin;

impl InnerMultiSmallestJoin {
    /// The name of the algorithm.
    pub const NAME: &'static str = "inner-multi-smallest";
}

#[async_trait]
impl JoinAlgorithm for InnerMultiSmallestJoin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection> {
        require_join_type(Self::NAME, join_type, JoinType::Inner)?;
        require_entries(Self::NAME, metadata, |n| n >= 3, "at least three entries")?;

        let mut cardinalities = metadata
            .iter()
            .map(|m| m.cardinality.value)
            .collect::<Vec<_>>();
        cardinalities.sort_by(f64::total_cmp);
        let (smallest, rest) = cardinalities.split_at(2);

        Ok(JoinCoefficients {
            iterations: multiply(smallest.iter().copied()) + rest.iter().sum::<f64>(),
            persisted_items: 0.0,
            blocking_items: 0.0,
            request_time: total_request_cost(metadata),
        })
    }

    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput> {
        accept(self, action.join_type, &metadata)?;
        let count = action.entries.len();
        let context = action.context;

        let mut entries = action.entries.into_iter().zip(metadata).collect::<Vec<_>>();
        entries.sort_by(|(_, lhs), (_, rhs)| {
            lhs.cardinality.value.total_cmp(&rhs.cardinality.value)
        });
        let mut entries = entries.into_iter().map(|(entry, _)| entry);
        let (Some(first), Some(second)) = (entries.next(), entries.next()) else {
            return Err(JoinError::NoApplicableJoinAlgorithm {
                join_type: JoinType::Inner,
                entries: count,
                rejections: vec![JoinRejection::new(Self::NAME, "requires at least three entries")],
            });
        };
        let remaining = entries.collect::<Vec<_>>();

        let operation = GraphPattern::Join {
            left: Box::new(first.operation.clone()),
            right: Box::new(second.operation.clone()),
        };
        let smallest = JoinAction::inner(vec![first, second])
            .with_context(context.clone().with_skip_adaptive(true));
        let output = mediator.join(smallest).await?;

        let mut entries = Vec::with_capacity(remaining.len() + 1);
        entries.push(JoinEntry::new(operation, output));
        entries.extend(remaining);
        mediator
            .join(JoinAction::inner(entries).with_context(context))
            .await
    }
}
