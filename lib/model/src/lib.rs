mod bindings;
mod metadata;

pub use bindings::*;
pub use metadata::*;

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, Literal, LiteralRef, NamedNode, NamedNodeRef, Term, TermRef,
    Variable, VariableNameParseError, VariableRef,
};

// Re-export the SPARQL algebra that describes the operation behind a join entry.
pub use spargebra::algebra::GraphPattern;
pub use spargebra::term::TriplePattern;
