use crate::{
    CoefficientComparator, JoinCoefficientWeights, LexicographicComparator,
    WeightedSumComparator,
};
use std::sync::Arc;
use std::time::Duration;

/// The default delay after which an adaptive join re-plans.
pub const DEFAULT_ADAPTIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// How the mediator ranks the [JoinCoefficients](crate::JoinCoefficients) of the candidates.
#[derive(Clone, Debug, Default)]
pub enum CoefficientPolicy {
    /// See [LexicographicComparator].
    #[default]
    Lexicographic,
    /// See [WeightedSumComparator].
    WeightedSum(JoinCoefficientWeights),
}

impl CoefficientPolicy {
    /// Creates the comparator that implements this policy.
    pub fn comparator(&self) -> Arc<dyn CoefficientComparator> {
        match self {
            CoefficientPolicy::Lexicographic => Arc::new(LexicographicComparator),
            CoefficientPolicy::WeightedSum(weights) => {
                Arc::new(WeightedSumComparator::new(*weights))
            }
        }
    }
}

/// Configures the adaptive join controller.
#[derive(Clone, Debug)]
pub struct AdaptiveJoinConfig {
    /// Whether inner joins are wrapped by the adaptive controller.
    enabled: bool,
    /// The delay after which the join is re-planned. [None] disables the timer.
    timeout: Option<Duration>,
    /// Whether an invalidation of an entry's metadata triggers re-planning.
    switch_on_invalidation: bool,
}

impl AdaptiveJoinConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that never wraps a join.
    pub fn disabled() -> Self {
        Self::default().with_enabled(false)
    }

    /// Enables or disables the adaptive controller.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the delay after which the join is re-planned.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether an invalidation of an entry's metadata triggers re-planning.
    #[must_use]
    pub fn with_switch_on_invalidation(mut self, switch_on_invalidation: bool) -> Self {
        self.switch_on_invalidation = switch_on_invalidation;
        self
    }

    /// Returns whether inner joins are wrapped by the adaptive controller.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the delay after which the join is re-planned.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns whether an invalidation of an entry's metadata triggers re-planning.
    pub fn switch_on_invalidation(&self) -> bool {
        self.switch_on_invalidation
    }
}

impl Default for AdaptiveJoinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Some(DEFAULT_ADAPTIVE_TIMEOUT),
            switch_on_invalidation: true,
        }
    }
}

/// The configuration of a [JoinMediator](crate::JoinMediator).
#[derive(Clone, Debug)]
pub struct JoinConfig {
    /// The adaptive controller.
    adaptive: AdaptiveJoinConfig,
    /// How candidates are ranked.
    coefficient_policy: CoefficientPolicy,
    /// Whether estimated cardinalities are treated as unknown while planning. Enabled by default.
    unbounded_estimates: bool,
}

impl JoinConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the adaptive controller.
    #[must_use]
    pub fn with_adaptive(mut self, adaptive: AdaptiveJoinConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Sets how the candidates are ranked.
    #[must_use]
    pub fn with_coefficient_policy(mut self, coefficient_policy: CoefficientPolicy) -> Self {
        self.coefficient_policy = coefficient_policy;
        self
    }

    /// If set, every cardinality that is not exact is planned as if it were unbounded. Disabling
    /// this makes the planner trust estimates.
    #[must_use]
    pub fn with_unbounded_estimates(mut self, unbounded_estimates: bool) -> Self {
        self.unbounded_estimates = unbounded_estimates;
        self
    }

    /// Returns the configuration of the adaptive controller.
    pub fn adaptive(&self) -> &AdaptiveJoinConfig {
        &self.adaptive
    }

    /// Returns how the candidates are ranked.
    pub fn coefficient_policy(&self) -> &CoefficientPolicy {
        &self.coefficient_policy
    }

    /// Returns whether estimated cardinalities are treated as unknown while planning.
    pub fn unbounded_estimates(&self) -> bool {
        self.unbounded_estimates
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            adaptive: AdaptiveJoinConfig::default(),
            coefficient_policy: CoefficientPolicy::default(),
            unbounded_estimates: true,
        }
    }
}
