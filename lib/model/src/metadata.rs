use crate::Variable;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Whether a [Cardinality] is known for certain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardinalityKind {
    /// The stream produces exactly this many bindings.
    Exact,
    /// The value is a guess, e.g., taken from a source that was only partially traversed.
    Estimate,
}

/// The (estimated) number of bindings a stream produces.
///
/// Unknown cardinalities are represented as an unbounded estimate (i.e., infinity). This makes
/// cost formulas that build upon them degrade conservatively instead of failing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cardinality {
    /// Whether `value` is exact.
    pub kind: CardinalityKind,
    /// The number of bindings.
    pub value: f64,
}

impl Cardinality {
    /// Creates an exact cardinality.
    #[expect(
        clippy::cast_precision_loss,
        reason = "Counts beyond 2^53 bindings are not exact in practice anyway"
    )]
    pub fn exact(count: u64) -> Self {
        Self {
            kind: CardinalityKind::Exact,
            value: count as f64,
        }
    }

    /// Creates an estimated cardinality.
    pub fn estimate(value: f64) -> Self {
        Self {
            kind: CardinalityKind::Estimate,
            value,
        }
    }

    /// Creates an unknown cardinality.
    pub fn unbounded() -> Self {
        Self::estimate(f64::INFINITY)
    }

    /// Returns whether the cardinality is exact.
    pub fn is_exact(&self) -> bool {
        self.kind == CardinalityKind::Exact
    }

    /// Returns whether nothing is known about the cardinality.
    pub fn is_unbounded(&self) -> bool {
        self.value.is_infinite()
    }

    /// Returns whether the stream is known to produce no bindings at all.
    pub fn is_exactly_empty(&self) -> bool {
        self.is_exact() && self.value == 0.0
    }

    /// Returns the same value, but marked as an estimate.
    #[must_use]
    pub fn into_estimate(self) -> Self {
        Self::estimate(self.value)
    }
}

impl Display for Cardinality {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            CardinalityKind::Exact => write!(f, "{}", self.value),
            CardinalityKind::Estimate => write!(f, "~{}", self.value),
        }
    }
}

/// A variable produced by a bindings stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetadataVariable {
    /// The variable.
    pub variable: Variable,
    /// Whether some bindings of the stream may leave the variable unbound (e.g., because it stems
    /// from an OPTIONAL).
    pub can_be_undef: bool,
}

impl MetadataVariable {
    /// Creates a variable that is bound in every binding.
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            can_be_undef: false,
        }
    }

    /// Creates a variable that may be unbound.
    pub fn undefinable(variable: Variable) -> Self {
        Self {
            variable,
            can_be_undef: true,
        }
    }
}

impl From<Variable> for MetadataVariable {
    fn from(variable: Variable) -> Self {
        Self::new(variable)
    }
}

/// Statistics about a bindings stream that are used for planning joins.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    /// The number of bindings the stream produces.
    pub cardinality: Cardinality,
    /// The variables that may occur in the bindings.
    pub variables: Vec<MetadataVariable>,
    /// The estimated cost of requesting a single binding from the source. Zero for local data.
    pub request_time: f64,
}

impl Metadata {
    /// Creates a new [Metadata] for a local source.
    pub fn new(
        cardinality: Cardinality,
        variables: impl IntoIterator<Item = impl Into<MetadataVariable>>,
    ) -> Self {
        Self {
            cardinality,
            variables: variables.into_iter().map(Into::into).collect(),
            request_time: 0.0,
        }
    }

    /// Creates a [Metadata] that does not know anything about its stream.
    pub fn unknown() -> Self {
        Self {
            cardinality: Cardinality::unbounded(),
            variables: Vec::new(),
            request_time: 0.0,
        }
    }

    /// Sets the estimated cost of requesting a single binding.
    #[must_use]
    pub fn with_request_time(mut self, request_time: f64) -> Self {
        self.request_time = request_time;
        self
    }

    /// Returns the entry for `variable`.
    pub fn variable(&self, variable: &Variable) -> Option<&MetadataVariable> {
        self.variables.iter().find(|v| &v.variable == variable)
    }

    /// Iterates over the variables without their annotations.
    pub fn plain_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().map(|v| &v.variable)
    }
}
