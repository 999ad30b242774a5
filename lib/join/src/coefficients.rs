use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

/// The estimated cost of evaluating a join with a specific algorithm.
///
/// This is a cost vector rather than a single number. How the dimensions are weighed against
/// each other is decided by a [CoefficientComparator].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JoinCoefficients {
    /// The number of probe operations.
    pub iterations: f64,
    /// The peak number of bindings that must be kept in memory.
    pub persisted_items: f64,
    /// The number of bindings that must be consumed before the first result can be produced.
    pub blocking_items: f64,
    /// The estimated cost of requesting data from the sources.
    pub request_time: f64,
}

impl Display for JoinCoefficients {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={}, persisted={}, blocking={}, request_time={}",
            self.iterations, self.persisted_items, self.blocking_items, self.request_time
        )
    }
}

/// Orders [JoinCoefficients] from cheapest to most expensive.
pub trait CoefficientComparator: Debug + Send + Sync {
    /// Compares two coefficient vectors. [Ordering::Less] means that `lhs` is cheaper.
    fn compare(&self, lhs: &JoinCoefficients, rhs: &JoinCoefficients) -> Ordering;
}

/// Compares `iterations` first and breaks ties using `persisted_items`, `blocking_items`, and
/// `request_time` (in that order).
#[derive(Clone, Copy, Debug, Default)]
pub struct LexicographicComparator;

impl CoefficientComparator for LexicographicComparator {
    fn compare(&self, lhs: &JoinCoefficients, rhs: &JoinCoefficients) -> Ordering {
        lhs.iterations
            .total_cmp(&rhs.iterations)
            .then_with(|| lhs.persisted_items.total_cmp(&rhs.persisted_items))
            .then_with(|| lhs.blocking_items.total_cmp(&rhs.blocking_items))
            .then_with(|| lhs.request_time.total_cmp(&rhs.request_time))
    }
}

/// The weights of a [WeightedSumComparator].
///
/// The defaults weigh every dimension equally. They are not tuned for any workload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JoinCoefficientWeights {
    /// The weight of [JoinCoefficients::iterations].
    pub iterations: f64,
    /// The weight of [JoinCoefficients::persisted_items].
    pub persisted_items: f64,
    /// The weight of [JoinCoefficients::blocking_items].
    pub blocking_items: f64,
    /// The weight of [JoinCoefficients::request_time].
    pub request_time: f64,
}

impl Default for JoinCoefficientWeights {
    fn default() -> Self {
        Self {
            iterations: 1.0,
            persisted_items: 1.0,
            blocking_items: 1.0,
            request_time: 1.0,
        }
    }
}

/// Collapses the coefficients into a single scalar using configurable weights.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedSumComparator {
    weights: JoinCoefficientWeights,
}

impl WeightedSumComparator {
    /// Creates a new [WeightedSumComparator].
    pub fn new(weights: JoinCoefficientWeights) -> Self {
        Self { weights }
    }

    /// Computes the scalar cost of `coefficients`.
    ///
    /// A dimension with a weight of zero is ignored, even if its value is unbounded.
    pub fn score(&self, coefficients: &JoinCoefficients) -> f64 {
        weigh(self.weights.iterations, coefficients.iterations)
            + weigh(self.weights.persisted_items, coefficients.persisted_items)
            + weigh(self.weights.blocking_items, coefficients.blocking_items)
            + weigh(self.weights.request_time, coefficients.request_time)
    }
}

impl CoefficientComparator for WeightedSumComparator {
    fn compare(&self, lhs: &JoinCoefficients, rhs: &JoinCoefficients) -> Ordering {
        self.score(lhs).total_cmp(&self.score(rhs))
    }
}

fn weigh(weight: f64, value: f64) -> f64 {
    if weight == 0.0 || value == 0.0 {
        0.0
    } else {
        weight * value
    }
}
