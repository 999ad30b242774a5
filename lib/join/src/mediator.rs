use crate::adaptive::join_adaptive;
use crate::algorithms::JoinAlgorithmRef;
use crate::{
    CoefficientComparator, JoinAction, JoinAlgorithmRegistry, JoinCoefficients, JoinConfig,
    JoinEntry, JoinExplanation,
};
use futures::future::join_all;
use itertools::{Either, Itertools};
use rdf_federation_common::{BindingsOutput, JoinError, JoinResult, JoinType, MetadataRef};
use rdf_federation_model::{Cardinality, Metadata};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The algorithm chosen for a join, together with its estimated cost.
#[derive(Clone, Debug)]
pub struct JoinSelection {
    /// The winning algorithm.
    pub algorithm: JoinAlgorithmRef,
    /// The coefficients the algorithm reported.
    pub coefficients: JoinCoefficients,
}

/// Plans and executes joins.
///
/// The mediator tests every algorithm of its registry, ranks the accepted ones with its
/// [CoefficientComparator], and runs the cheapest one. Ties are broken by declaration order.
/// Inner joins are additionally wrapped by the adaptive controller if it is enabled.
///
/// Cloning a mediator is cheap.
#[derive(Clone)]
pub struct JoinMediator {
    registry: Arc<JoinAlgorithmRegistry>,
    comparator: Arc<dyn CoefficientComparator>,
    config: Arc<JoinConfig>,
}

impl JoinMediator {
    /// Creates a new [JoinMediator].
    pub fn new(registry: JoinAlgorithmRegistry, config: JoinConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            comparator: config.coefficient_policy().comparator(),
            config: Arc::new(config),
        }
    }

    /// Replaces the comparator that was derived from the coefficient policy of the
    /// configuration.
    #[must_use]
    pub fn with_comparator(mut self, comparator: Arc<dyn CoefficientComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Returns the registered algorithms.
    pub fn registry(&self) -> &JoinAlgorithmRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Resolves the metadata of every entry.
    ///
    /// Metadata that cannot be resolved is replaced by [Metadata::unknown]. Unless the configuration
    /// trusts estimates, every estimated cardinality is replaced by an unbounded one.
    ///
    /// The returned future does not borrow the entries.
    pub fn resolve_metadata(
        &self,
        entries: &[JoinEntry],
    ) -> impl Future<Output = Vec<Metadata>> + Send + 'static {
        let providers = entries
            .iter()
            .map(|entry| Arc::clone(&entry.output.metadata))
            .collect::<Vec<MetadataRef>>();
        let unbounded_estimates = self.config.unbounded_estimates();

        async move {
            let resolved = join_all(providers.iter().map(|provider| provider.metadata())).await;
            resolved
                .into_iter()
                .map(|metadata| match metadata {
                    Ok(mut metadata) => {
                        if unbounded_estimates && !metadata.cardinality.is_exact() {
                            metadata.cardinality = Cardinality::unbounded();
                        }
                        metadata
                    }
                    Err(error) => {
                        warn!(%error, "Could not resolve the metadata of a join entry");
                        Metadata::unknown()
                    }
                })
                .collect()
        }
    }

    /// Selects the cheapest algorithm for a join of type `join_type` over entries with the given
    /// `metadata`.
    ///
    /// This has no side effects. Returns [JoinError::NoApplicableJoinAlgorithm] if every algorithm
    /// rejects the join.
    pub fn select(&self, join_type: JoinType, metadata: &[Metadata]) -> JoinResult<JoinSelection> {
        let (accepted, rejections): (Vec<_>, Vec<_>) =
            self.registry.iter().partition_map(|algorithm| {
                match algorithm.estimate(join_type, metadata) {
                    Ok(coefficients) => Either::Left(JoinSelection {
                        algorithm: Arc::clone(algorithm),
                        coefficients,
                    }),
                    Err(rejection) => {
                        trace!(
                            algorithm = %rejection.algorithm,
                            reason = %rejection.reason,
                            "Join algorithm rejected the join"
                        );
                        Either::Right(rejection)
                    }
                }
            });

        // `min_by` returns the first of several equal elements.
        let selection = accepted
            .into_iter()
            .min_by(|lhs, rhs| self.comparator.compare(&lhs.coefficients, &rhs.coefficients))
            .ok_or_else(|| JoinError::NoApplicableJoinAlgorithm {
                join_type,
                entries: metadata.len(),
                rejections,
            })?;

        debug!(
            algorithm = selection.algorithm.name(),
            coefficients = %selection.coefficients,
            %join_type,
            entries = metadata.len(),
            "Selected join algorithm"
        );
        Ok(selection)
    }

    /// Explains how the given join would be planned, without executing it.
    pub fn explain(
        &self,
        action: &JoinAction,
    ) -> impl Future<Output = JoinExplanation> + Send + 'static {
        let join_type = action.join_type;
        let resolving = self.resolve_metadata(&action.entries);
        let mediator = self.clone();

        async move {
            let metadata = resolving.await;
            let candidates = mediator
                .registry
                .iter()
                .map(|algorithm| (algorithm.name(), algorithm.estimate(join_type, &metadata)))
                .collect();
            let selected = mediator
                .select(join_type, &metadata)
                .ok()
                .map(|selection| selection.algorithm.name());
            JoinExplanation {
                join_type,
                entries: metadata.len(),
                candidates,
                selected,
            }
        }
    }

    /// Plans and executes `action`.
    pub async fn join(&self, action: JoinAction) -> JoinResult<BindingsOutput> {
        if self.is_adaptive(&action) {
            join_adaptive(self.clone(), action).await
        } else {
            self.join_once(action).await
        }
    }

    /// Plans and executes `action` without the adaptive controller.
    pub(crate) async fn join_once(&self, action: JoinAction) -> JoinResult<BindingsOutput> {
        let resolving = self.resolve_metadata(&action.entries);
        let metadata = resolving.await;
        let selection = self.select(action.join_type, &metadata)?;
        selection.algorithm.run(action, metadata, self).await
    }

    fn is_adaptive(&self, action: &JoinAction) -> bool {
        self.config.adaptive().enabled()
            && !action.context.skip_adaptive()
            && action.join_type == JoinType::Inner
            && action.entries.len() >= 2
    }
}

impl Default for JoinMediator {
    fn default() -> Self {
        Self::new(JoinAlgorithmRegistry::default(), JoinConfig::default())
    }
}

impl Debug for JoinMediator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinMediator")
            .field("algorithms", &self.registry.names())
            .field("comparator", &self.comparator)
            .field("config", &self.config)
            .finish()
    }
}
