use crate::{Term, Variable};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::{fmt, slice};

/// An immutable mapping from variables to RDF terms, i.e., a single solution of a (partial)
/// SPARQL query.
///
/// The entries are kept sorted by variable name. This gives every binding a canonical form, so
/// structural equality and hashing do not depend on the order in which variables were bound.
/// The entries are shared between clones, which makes passing bindings through join operators
/// cheap. Every modification (e.g., [Bindings::merge]) creates a new instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bindings {
    entries: Arc<[(Variable, Term)]>,
}

impl Bindings {
    /// Creates a new [Bindings] without any bound variable.
    pub fn empty() -> Self {
        Self {
            entries: Arc::new([]),
        }
    }

    /// Creates a new [Bindings] from a list of variable-term pairs.
    ///
    /// If a variable occurs more than once, the last term wins.
    pub fn new(entries: impl IntoIterator<Item = (Variable, Term)>) -> Self {
        let mut entries = entries.into_iter().collect::<Vec<_>>();
        entries.sort_by(|(lhs, _), (rhs, _)| compare_variables(lhs, rhs));

        let mut result: Vec<(Variable, Term)> = Vec::with_capacity(entries.len());
        for (variable, term) in entries {
            match result.last_mut() {
                Some(last) if last.0 == variable => last.1 = term,
                _ => result.push((variable, term)),
            }
        }

        Self {
            entries: result.into(),
        }
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the term bound to `variable`.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.entries
            .binary_search_by(|(candidate, _)| compare_variables(candidate, variable))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Returns whether `variable` is bound.
    pub fn contains(&self, variable: &Variable) -> bool {
        self.get(variable).is_some()
    }

    /// Iterates over the variable-term pairs in canonical order.
    pub fn iter(&self) -> BindingsIter<'_> {
        BindingsIter {
            inner: self.entries.iter(),
        }
    }

    /// Iterates over the bound variables in canonical order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().map(|(variable, _)| variable)
    }

    /// Returns whether `self` and `other` agree on every variable bound in both.
    ///
    /// Bindings without any common variable are always compatible.
    pub fn is_compatible(&self, other: &Bindings) -> bool {
        let (lhs, rhs) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match compare_variables(&lhs[i].0, &rhs[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if lhs[i].1 != rhs[j].1 {
                        return false;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        true
    }

    /// Returns whether both bindings bind at least one common variable.
    pub fn shares_variable(&self, other: &Bindings) -> bool {
        let (lhs, rhs) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match compare_variables(&lhs[i].0, &rhs[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }

    /// Merges two compatible bindings into a new one that contains the variables of both.
    ///
    /// Returns [None] if the bindings are not compatible.
    pub fn merge(&self, other: &Bindings) -> Option<Bindings> {
        if other.is_empty() {
            return Some(self.clone());
        }
        if self.is_empty() {
            return Some(other.clone());
        }

        let (lhs, rhs) = (&self.entries, &other.entries);
        let mut result = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match compare_variables(&lhs[i].0, &rhs[j].0) {
                Ordering::Less => {
                    result.push(lhs[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    result.push(rhs[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    if lhs[i].1 != rhs[j].1 {
                        return None;
                    }
                    result.push(lhs[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        result.extend_from_slice(&lhs[i..]);
        result.extend_from_slice(&rhs[j..]);

        Some(Self {
            entries: result.into(),
        })
    }

    /// Returns a new [Bindings] that only contains the given `variables`.
    #[must_use]
    pub fn project(&self, variables: &[Variable]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(variable, _)| variables.contains(variable))
                .cloned()
                .collect(),
        }
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<(Variable, Term)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (Variable, Term)>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a Variable, &'a Term);
    type IntoIter = BindingsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for Bindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable}: {term}")?;
        }
        f.write_str("}")
    }
}

/// An iterator over the variable-term pairs of a [Bindings].
#[derive(Debug)]
pub struct BindingsIter<'a> {
    inner: slice::Iter<'a, (Variable, Term)>,
}

impl<'a> Iterator for BindingsIter<'a> {
    type Item = (&'a Variable, &'a Term);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(variable, term)| (variable, term))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn compare_variables(lhs: &Variable, rhs: &Variable) -> Ordering {
    lhs.as_str().cmp(rhs.as_str())
}
