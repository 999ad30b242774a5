use rdf_federation_common::{JoinError, JoinResult};
use rdf_federation_model::{Bindings, Term, Variable};
use rustc_hash::FxHashMap;

/// A hash index over bindings, keyed by the terms bound to an ordered list of variables.
///
/// The key of a binding is the tuple of its terms for the key variables. Bindings that do not
/// bind every key variable cannot be inserted and never match a lookup. An index with no key
/// variables places every value in a single bucket, which turns lookups into a full scan.
///
/// The index only grows. It is owned by a single join execution and dropped together with it.
#[derive(Clone, Debug)]
pub struct BindingsIndex<V> {
    /// The key variables.
    keys: Vec<Variable>,
    /// The values of each key.
    entries: FxHashMap<Vec<Term>, Vec<V>>,
    /// The total number of values.
    len: usize,
}

impl<V> BindingsIndex<V> {
    /// Creates a new, empty [BindingsIndex].
    pub fn new(keys: Vec<Variable>) -> Self {
        Self {
            keys,
            entries: FxHashMap::default(),
            len: 0,
        }
    }

    /// Returns the key variables.
    pub fn keys(&self) -> &[Variable] {
        &self.keys
    }

    /// Returns the total number of values in the index.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the index contains no value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` under the key of `bindings`.
    ///
    /// Returns [JoinError::IndexKeyMismatch] if `bindings` lacks a key variable.
    pub fn put(&mut self, bindings: &Bindings, value: V) -> JoinResult<()> {
        let key = self
            .key_of(bindings)
            .map_err(|missing| JoinError::IndexKeyMismatch(missing.clone()))?;
        self.entries.entry(key).or_default().push(value);
        self.len += 1;
        Ok(())
    }

    /// Returns every value whose key matches the terms of `bindings`.
    ///
    /// Returns an empty slice if `bindings` lacks a key variable.
    pub fn get(&self, bindings: &Bindings) -> &[V] {
        let Ok(key) = self.key_of(bindings) else {
            return &[];
        };
        self.entries.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over all values in the index.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().flatten()
    }

    /// Extracts the key of `bindings` or returns the first key variable that is not bound.
    fn key_of(&self, bindings: &Bindings) -> Result<Vec<Term>, &Variable> {
        self.keys
            .iter()
            .map(|variable| bindings.get(variable).cloned().ok_or(variable))
            .collect()
    }
}

impl BindingsIndex<Bindings> {
    /// Inserts `bindings` under its own key.
    pub fn insert(&mut self, bindings: Bindings) -> JoinResult<()> {
        let key = bindings.clone();
        self.put(&key, bindings)
    }
}
