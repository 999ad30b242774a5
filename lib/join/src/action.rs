use rdf_federation_common::{BindingsOutput, JoinType};
use rdf_federation_model::GraphPattern;

/// One operand of a join: the operation that produced the bindings and its evaluated output.
#[derive(Debug)]
pub struct JoinEntry {
    /// The algebra of the operand.
    pub operation: GraphPattern,
    /// The bindings and metadata of the operand.
    pub output: BindingsOutput,
}

impl JoinEntry {
    /// Creates a new [JoinEntry].
    pub fn new(operation: GraphPattern, output: BindingsOutput) -> Self {
        Self { operation, output }
    }
}

/// Information that is passed along while executing a join.
#[derive(Clone, Debug, Default)]
pub struct JoinContext {
    skip_adaptive: bool,
}

impl JoinContext {
    /// Creates a new default [JoinContext].
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables (or re-enables) the adaptive controller for joins that run in this context.
    ///
    /// The adaptive controller sets this flag when it invokes the mediator itself. Otherwise,
    /// each re-planned join would be wrapped again.
    #[must_use]
    pub fn with_skip_adaptive(mut self, skip_adaptive: bool) -> Self {
        self.skip_adaptive = skip_adaptive;
        self
    }

    /// Returns whether adaptive re-planning is disabled.
    pub fn skip_adaptive(&self) -> bool {
        self.skip_adaptive
    }
}

/// A request to join a list of entries.
#[derive(Debug)]
pub struct JoinAction {
    /// The kind of join.
    pub join_type: JoinType,
    /// The operands. For optional and minus joins, the first entry is the left-hand side.
    pub entries: Vec<JoinEntry>,
    /// The execution context.
    pub context: JoinContext,
}

impl JoinAction {
    /// Creates a new [JoinAction] with a default context.
    pub fn new(join_type: JoinType, entries: Vec<JoinEntry>) -> Self {
        Self {
            join_type,
            entries,
            context: JoinContext::default(),
        }
    }

    /// Creates an inner join.
    pub fn inner(entries: Vec<JoinEntry>) -> Self {
        Self::new(JoinType::Inner, entries)
    }

    /// Creates a left outer join of `left` and `right`.
    pub fn optional(left: JoinEntry, right: JoinEntry) -> Self {
        Self::new(JoinType::Optional, vec![left, right])
    }

    /// Creates a SPARQL `MINUS` of `left` and `right`.
    pub fn minus(left: JoinEntry, right: JoinEntry) -> Self {
        Self::new(JoinType::Minus, vec![left, right])
    }

    /// Replaces the context.
    #[must_use]
    pub fn with_context(mut self, context: JoinContext) -> Self {
        self.context = context;
        self
    }
}
