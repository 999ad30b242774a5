use crate::{JoinResult, MetadataRef, StaticMetadata};
use futures::{stream, Stream};
use rdf_federation_model::{Bindings, Cardinality, Metadata, MetadataVariable};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;

/// A lazily pulled stream of bindings.
///
/// Dropping the stream destroys it. Implementations must release their resources and stop
/// pulling from their inputs once dropped.
pub type BindingsStream = Pin<Box<dyn Stream<Item = JoinResult<Bindings>> + Send>>;

/// Creates a [BindingsStream] that emits the given bindings.
pub fn bindings_stream<I>(bindings: I) -> BindingsStream
where
    I: IntoIterator<Item = Bindings>,
    I::IntoIter: Send + 'static,
{
    Box::pin(stream::iter(bindings.into_iter().map(Ok)))
}

/// Creates a [BindingsStream] that ends immediately.
pub fn empty_bindings_stream() -> BindingsStream {
    Box::pin(stream::empty())
}

/// The result of evaluating an operation: a stream of bindings together with an accessor for
/// its metadata.
pub struct BindingsOutput {
    /// The bindings.
    pub stream: BindingsStream,
    /// Resolves the metadata of `stream`.
    pub metadata: MetadataRef,
}

impl BindingsOutput {
    /// Creates a new [BindingsOutput].
    pub fn new(stream: BindingsStream, metadata: MetadataRef) -> Self {
        Self { stream, metadata }
    }

    /// Creates a [BindingsOutput] for a materialized list of bindings with an exact cardinality.
    pub fn materialized(
        bindings: Vec<Bindings>,
        variables: impl IntoIterator<Item = impl Into<MetadataVariable>>,
    ) -> Self {
        let metadata = Metadata::new(Cardinality::exact(bindings.len() as u64), variables);
        Self {
            stream: bindings_stream(bindings),
            metadata: Arc::new(StaticMetadata::new(metadata)),
        }
    }
}

impl Debug for BindingsOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingsOutput")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
