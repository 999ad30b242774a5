use rdf_federation_model::Bindings;
use rustc_hash::FxHashMap;

/// The multiset of bindings that the first plan of an adaptive join has emitted.
///
/// The second plan re-produces these bindings. Each of them is suppressed exactly as often as it
/// was recorded.
#[derive(Debug, Default)]
pub struct AdaptiveSession {
    counts: FxHashMap<Bindings, usize>,
    pending: usize,
}

impl AdaptiveSession {
    /// Creates a new empty [AdaptiveSession].
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `bindings` has been emitted.
    pub fn record(&mut self, bindings: &Bindings) {
        *self.counts.entry(bindings.clone()).or_default() += 1;
        self.pending += 1;
    }

    /// Returns whether `bindings` has already been emitted and consumes one recorded occurrence.
    pub fn suppress(&mut self, bindings: &Bindings) -> bool {
        let Some(count) = self.counts.get_mut(bindings) else {
            return false;
        };

        *count -= 1;
        if *count == 0 {
            self.counts.remove(bindings);
        }
        self.pending -= 1;
        if self.pending == 0 {
            self.counts = FxHashMap::default();
        }
        true
    }

    /// Returns the number of recorded occurrences that have not been suppressed yet.
    pub fn len(&self) -> usize {
        self.pending
    }

    /// Returns whether every recorded binding has been suppressed.
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Forgets every recorded binding.
    pub fn clear(&mut self) {
        self.counts = FxHashMap::default();
        self.pending = 0;
    }
}
