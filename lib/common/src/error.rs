use crate::JoinType;
use rdf_federation_model::Variable;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// The result type of the join subsystem.
pub type JoinResult<T> = Result<T, JoinError>;

/// An error raised while planning or executing a join.
///
/// The variants separate planning bugs (e.g., [JoinError::NoApplicableJoinAlgorithm]) from
/// failures of the data sources (e.g., [JoinError::UpstreamStream]). Errors are cheap to clone so
/// that a single upstream failure can be reported to every reader of a replayed stream.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JoinError {
    /// Every registered join algorithm rejected the join action.
    #[error(
        "No join algorithm can evaluate a {join_type} join over {entries} entries ({})",
        format_rejections(.rejections)
    )]
    NoApplicableJoinAlgorithm {
        /// The requested join type.
        join_type: JoinType,
        /// The number of join entries.
        entries: usize,
        /// Why each algorithm rejected the action.
        rejections: Vec<JoinRejection>,
    },
    /// An input stream of the join failed.
    #[error("An upstream bindings stream failed: {0}")]
    UpstreamStream(#[source] Arc<dyn Error + Send + Sync>),
    /// The metadata of an input could not be resolved.
    #[error("The metadata of an upstream stream is unavailable: {0}")]
    MetadataUnavailable(#[source] Arc<dyn Error + Send + Sync>),
    /// A binding that lacks one of the key variables was inserted into an index.
    #[error("The bindings do not bind the index key variable {0}")]
    IndexKeyMismatch(Variable),
    /// The configuration referenced a join algorithm that does not exist.
    #[error("The join algorithm '{0}' is unknown")]
    UnknownJoinAlgorithm(String),
}

impl JoinError {
    /// Wraps an error of an upstream data source.
    pub fn upstream(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::UpstreamStream(Arc::from(error.into()))
    }

    /// Wraps an error that occurred while resolving metadata.
    pub fn metadata(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::MetadataUnavailable(Arc::from(error.into()))
    }
}

/// The reason why a join algorithm cannot evaluate a join action.
///
/// This is not an error. The mediator collects rejections as negative test results and only
/// reports them if no algorithm accepted the action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRejection {
    /// The name of the rejecting algorithm.
    pub algorithm: String,
    /// A human-readable reason.
    pub reason: String,
}

impl JoinRejection {
    /// Creates a new [JoinRejection].
    pub fn new(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            reason: reason.into(),
        }
    }
}

impl Display for JoinRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.algorithm, self.reason)
    }
}

fn format_rejections(rejections: &[JoinRejection]) -> String {
    if rejections.is_empty() {
        return "no algorithm registered".to_owned();
    }
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
