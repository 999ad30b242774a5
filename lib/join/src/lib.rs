//! The multi-way join subsystem of the federated SPARQL engine.
//!
//! A [JoinAction] bundles two or more [JoinEntry]s (an operation together with its streaming
//! bindings and metadata). The [JoinMediator] asks every [JoinAlgorithm] of its
//! [JoinAlgorithmRegistry] for [JoinCoefficients], runs the cheapest one, and, for inner joins,
//! wraps the execution in an adaptive controller that may restart the join with refreshed
//! metadata without losing or duplicating results.

mod action;
pub mod adaptive;
pub mod algorithms;
mod coefficients;
mod config;
mod explanation;
mod index;
mod mediator;
mod registry;

pub use action::*;
pub use algorithms::{JoinAlgorithm, JoinAlgorithmRef};
pub use coefficients::*;
pub use config::*;
pub use explanation::JoinExplanation;
pub use index::BindingsIndex;
pub use mediator::{JoinMediator, JoinSelection};
pub use registry::JoinAlgorithmRegistry;

pub use rdf_federation_common::{
    BindingsOutput, BindingsStream, JoinError, JoinRejection, JoinResult, JoinType,
};
