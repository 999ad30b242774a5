//! The join algorithms that can be registered in a [JoinAlgorithmRegistry](crate::JoinAlgorithmRegistry).
//!
//! Each algorithm estimates its cost as [JoinCoefficients] (or rejects the action if it cannot
//! handle its shape) and executes the join as a lazily pulled [BindingsStream](rdf_federation_common::BindingsStream).

mod hash;
mod hash_probe;
mod minus_hash;
mod multi_empty;
mod multi_smallest;
mod nested_loop;
mod none;
mod optional_hash;
mod optional_nested_loop;
mod single;
mod symmetric_hash;

pub use hash::InnerHashJoin;
pub use hash_probe::{HashProbeJoinStream, ProbeMode};
pub use minus_hash::MinusHashJoin;
pub use multi_empty::InnerMultiEmptyJoin;
pub use multi_smallest::InnerMultiSmallestJoin;
pub use nested_loop::{InnerNestedLoopJoin, NestedLoopJoinStream};
pub use none::InnerNoneJoin;
pub use optional_hash::OptionalHashJoin;
pub use optional_nested_loop::OptionalNestedLoopJoin;
pub use single::InnerSingleJoin;
pub use symmetric_hash::{InnerSymmetricHashJoin, SymmetricHashJoinStream};

use crate::{JoinAction, JoinCoefficients, JoinEntry, JoinMediator};
use async_trait::async_trait;
use rdf_federation_common::{
    BindingsOutput, DerivedMetadata, JoinError, JoinRejection, JoinResult, JoinType, MetadataRef,
};
use rdf_federation_model::{Cardinality, Metadata, MetadataVariable, Variable};
use std::fmt::Debug;
use std::sync::Arc;

/// A reference-counted pointer to a [JoinAlgorithm].
pub type JoinAlgorithmRef = Arc<dyn JoinAlgorithm>;

/// A strategy for evaluating joins.
///
/// This is the extension point for new join strategies. Estimation must be pure; only
/// [JoinAlgorithm::run] may have side effects.
#[async_trait]
pub trait JoinAlgorithm: Debug + Send + Sync {
    /// The unique name of the algorithm, used for configuration and explanations.
    fn name(&self) -> &'static str;

    /// Estimates the cost of a join of the given type over entries with the given (resolved)
    /// `metadata`, one element per entry.
    ///
    /// Returns a [JoinRejection] if the algorithm structurally cannot handle the join.
    fn estimate(
        &self,
        join_type: JoinType,
        metadata: &[Metadata],
    ) -> Result<JoinCoefficients, JoinRejection>;

    /// Executes the join.
    ///
    /// `metadata` is the metadata that was used to estimate the action. The mediator is passed
    /// along so that algorithms can delegate sub-joins.
    async fn run(
        &self,
        action: JoinAction,
        metadata: Vec<Metadata>,
        mediator: &JoinMediator,
    ) -> JoinResult<BindingsOutput>;
}

/// Rejects joins of any other type than `supported`.
pub(crate) fn require_join_type(
    name: &str,
    join_type: JoinType,
    supported: JoinType,
) -> Result<(), JoinRejection> {
    if join_type == supported {
        Ok(())
    } else {
        Err(JoinRejection::new(
            name,
            format!("does not support {join_type} joins"),
        ))
    }
}

/// Rejects joins unless `accept` holds for their number of entries.
pub(crate) fn require_entries(
    name: &str,
    metadata: &[Metadata],
    accept: impl Fn(usize) -> bool,
    requirement: &str,
) -> Result<(), JoinRejection> {
    if accept(metadata.len()) {
        Ok(())
    } else {
        Err(JoinRejection::new(name, format!("requires {requirement}")))
    }
}

/// Re-validates the join in [JoinAlgorithm::run], turning a rejection into an error.
pub(crate) fn accept(
    algorithm: &dyn JoinAlgorithm,
    join_type: JoinType,
    metadata: &[Metadata],
) -> JoinResult<JoinCoefficients> {
    algorithm
        .estimate(join_type, metadata)
        .map_err(|rejection| JoinError::NoApplicableJoinAlgorithm {
            join_type,
            entries: metadata.len(),
            rejections: vec![rejection],
        })
}

/// Splits the entries of a binary join into its left and right entry.
pub(crate) fn binary_entries(
    name: &str,
    action: JoinAction,
) -> JoinResult<(JoinEntry, JoinEntry)> {
    let join_type = action.join_type;
    let count = action.entries.len();
    let mut entries = action.entries.into_iter();
    match (entries.next(), entries.next(), entries.next()) {
        (Some(left), Some(right), None) => Ok((left, right)),
        _ => Err(JoinError::NoApplicableJoinAlgorithm {
            join_type,
            entries: count,
            rejections: vec![JoinRejection::new(name, "requires exactly two entries")],
        }),
    }
}

/// Returns the index key of a binary join over entries with the given `metadata`.
pub(crate) fn binary_index_key(
    name: &str,
    metadata: &[Metadata],
) -> Result<Vec<Variable>, JoinRejection> {
    match metadata {
        [lhs, rhs] => index_key(name, lhs, rhs),
        _ => Err(JoinRejection::new(name, "requires exactly two entries")),
    }
}

/// Returns the variables of `lhs` that also occur in `rhs`, in the order of `lhs`.
pub(crate) fn shared_variables(lhs: &Metadata, rhs: &Metadata) -> Vec<Variable> {
    lhs.plain_variables()
        .filter(|variable| rhs.variable(variable).is_some())
        .cloned()
        .collect()
}

/// Returns the shared variables of `lhs` and `rhs` if they can be used as an index key.
///
/// A variable that can be unbound in some bindings cannot be looked up in an index.
pub(crate) fn index_key(
    name: &str,
    lhs: &Metadata,
    rhs: &Metadata,
) -> Result<Vec<Variable>, JoinRejection> {
    let shared = shared_variables(lhs, rhs);
    for variable in &shared {
        let undefinable = [lhs, rhs]
            .iter()
            .any(|m| m.variable(variable).is_some_and(|v| v.can_be_undef));
        if undefinable {
            return Err(JoinRejection::new(
                name,
                format!("shared variable {variable} can be undefined"),
            ));
        }
    }
    Ok(shared)
}

/// Estimates the cost of requesting every binding of an entry from its source.
pub(crate) fn request_cost(metadata: &Metadata) -> f64 {
    if metadata.request_time == 0.0 {
        0.0
    } else {
        metadata.cardinality.value * metadata.request_time
    }
}

/// Sums the request cost of all entries.
pub(crate) fn total_request_cost(metadata: &[Metadata]) -> f64 {
    metadata.iter().map(request_cost).sum()
}

/// Multiplies cardinalities. A zero wins over an unbounded value.
pub(crate) fn multiply(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut result = 1.0;
    for value in values {
        if value == 0.0 {
            return 0.0;
        }
        result *= value;
    }
    result
}

/// Creates a metadata accessor for the output of a join over `entries`.
pub(crate) fn derived_metadata(
    entries: &[JoinEntry],
    derivation: fn(&[Metadata]) -> Metadata,
) -> MetadataRef {
    let inputs = entries
        .iter()
        .map(|entry| Arc::clone(&entry.output.metadata))
        .collect();
    Arc::new(DerivedMetadata::new(inputs, derivation))
}

/// The union of the variables of all inputs.
///
/// A variable can only be undefined in the result if it can be undefined in every input.
fn inner_variables(metadata: &[Metadata]) -> Vec<MetadataVariable> {
    let mut result: Vec<MetadataVariable> = Vec::new();
    for variable in metadata.iter().flat_map(|m| &m.variables) {
        match result.iter_mut().find(|v| v.variable == variable.variable) {
            Some(existing) => existing.can_be_undef &= variable.can_be_undef,
            None => result.push(variable.clone()),
        }
    }
    result
}

/// The variables of a left outer join. Variables that only occur on the right can be undefined.
fn optional_variables(left: &Metadata, right: &Metadata) -> Vec<MetadataVariable> {
    let mut result = left.variables.clone();
    for variable in &right.variables {
        if left.variable(&variable.variable).is_none() {
            result.push(MetadataVariable::undefinable(variable.variable.clone()));
        }
    }
    result
}

/// The metadata of an inner join whose cardinality is estimated as the product of its inputs.
pub(crate) fn inner_product_metadata(metadata: &[Metadata]) -> Metadata {
    inner_metadata(metadata, multiply(metadata.iter().map(|m| m.cardinality.value)))
}

/// The metadata of an inner join whose cardinality is estimated as the sum of its inputs.
pub(crate) fn inner_sum_metadata(metadata: &[Metadata]) -> Metadata {
    inner_metadata(metadata, metadata.iter().map(|m| m.cardinality.value).sum())
}

/// The output of an inner join over an exactly empty input is empty, but it is only reported as
/// exact if every input is exact.
fn inner_metadata(metadata: &[Metadata], estimate: f64) -> Metadata {
    let cardinality = if metadata.iter().any(|m| m.cardinality.is_exactly_empty()) {
        if metadata.iter().all(|m| m.cardinality.is_exact()) {
            Cardinality::exact(0)
        } else {
            Cardinality::estimate(0.0)
        }
    } else {
        Cardinality::estimate(estimate)
    };
    Metadata::new(cardinality, inner_variables(metadata))
}

/// The metadata of a left outer join.
pub(crate) fn optional_metadata(metadata: &[Metadata]) -> Metadata {
    let [left, right] = metadata else {
        return Metadata::unknown();
    };
    let cardinality = if right.cardinality.is_exactly_empty() || left.cardinality.is_exactly_empty()
    {
        if left.cardinality.is_exact() && right.cardinality.is_exact() {
            left.cardinality
        } else {
            left.cardinality.into_estimate()
        }
    } else {
        let product = multiply([left.cardinality.value, right.cardinality.value]);
        Cardinality::estimate(left.cardinality.value.max(product))
    };
    Metadata::new(cardinality, optional_variables(left, right))
}

/// The metadata of a SPARQL `MINUS`.
pub(crate) fn minus_metadata(metadata: &[Metadata]) -> Metadata {
    let [left, right] = metadata else {
        return Metadata::unknown();
    };
    let cardinality = if right.cardinality.is_exactly_empty() {
        left.cardinality
    } else {
        left.cardinality.into_estimate()
    };
    Metadata::new(cardinality, left.variables.clone())
}
