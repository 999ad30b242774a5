use crate::algorithms::{
    InnerHashJoin, InnerMultiEmptyJoin, InnerMultiSmallestJoin, InnerNestedLoopJoin,
    InnerNoneJoin, InnerSingleJoin, InnerSymmetricHashJoin, JoinAlgorithmRef, MinusHashJoin,
    OptionalHashJoin, OptionalNestedLoopJoin,
};
use rdf_federation_common::{JoinError, JoinResult};
use std::sync::Arc;

/// The strategy registry of the join mediator.
///
/// Holds the join algorithms in declaration order. The order matters, as the mediator picks the
/// first algorithm if two algorithms report equal coefficients.
#[derive(Clone, Debug)]
pub struct JoinAlgorithmRegistry {
    algorithms: Vec<JoinAlgorithmRef>,
}

impl JoinAlgorithmRegistry {
    /// Creates a new [JoinAlgorithmRegistry] without any algorithm.
    pub fn empty() -> Self {
        Self {
            algorithms: Vec::new(),
        }
    }

    /// Creates a registry that only contains the built-in algorithms with the given names, in
    /// declaration order.
    ///
    /// Returns [JoinError::UnknownJoinAlgorithm] if a name does not refer to a built-in
    /// algorithm.
    pub fn with_algorithms(names: &[&str]) -> JoinResult<Self> {
        let builtins = Self::default();
        if let Some(unknown) = names.iter().find(|name| builtins.get(name).is_none()) {
            return Err(JoinError::UnknownJoinAlgorithm((*unknown).to_owned()));
        }

        let algorithms = builtins
            .algorithms
            .into_iter()
            .filter(|algorithm| names.contains(&algorithm.name()))
            .collect();
        Ok(Self { algorithms })
    }

    /// Appends `algorithm`. An algorithm with the same name is replaced in place.
    pub fn register(&mut self, algorithm: JoinAlgorithmRef) {
        match self
            .algorithms
            .iter_mut()
            .find(|existing| existing.name() == algorithm.name())
        {
            Some(existing) => *existing = algorithm,
            None => self.algorithms.push(algorithm),
        }
    }

    /// Returns the algorithm called `name`.
    pub fn get(&self, name: &str) -> Option<&JoinAlgorithmRef> {
        self.algorithms
            .iter()
            .find(|algorithm| algorithm.name() == name)
    }

    /// Iterates over the algorithms in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &JoinAlgorithmRef> {
        self.algorithms.iter()
    }

    /// Returns the names of the algorithms in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|a| a.name()).collect()
    }

    /// Returns the number of registered algorithms.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Returns whether no algorithm is registered.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

impl Default for JoinAlgorithmRegistry {
    fn default() -> Self {
        let algorithms: Vec<JoinAlgorithmRef> = vec![
            Arc::new(InnerNoneJoin),
            Arc::new(InnerSingleJoin),
            Arc::new(InnerMultiEmptyJoin),
            Arc::new(InnerSymmetricHashJoin),
            Arc::new(InnerHashJoin),
            Arc::new(InnerMultiSmallestJoin),
            Arc::new(InnerNestedLoopJoin),
            Arc::new(OptionalHashJoin),
            Arc::new(OptionalNestedLoopJoin),
            Arc::new(MinusHashJoin),
        ];
        Self { algorithms }
    }
}
