use std::fmt;
use std::fmt::{Display, Formatter};

/// The kind of join that should be computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Emits the merge of every compatible pair of bindings.
    Inner,
    /// Left outer join (SPARQL `OPTIONAL`). Left bindings without a compatible right binding are
    /// emitted unchanged.
    Optional,
    /// SPARQL `MINUS`. Emits the left bindings that have no compatible right binding with at least
    /// one shared variable.
    Minus,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "inner"),
            JoinType::Optional => write!(f, "optional"),
            JoinType::Minus => write!(f, "minus"),
        }
    }
}
