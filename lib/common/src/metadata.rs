use crate::JoinResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use rdf_federation_model::Metadata;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, OnceCell};

/// A reference-counted pointer to a [MetadataProvider].
pub type MetadataRef = Arc<dyn MetadataProvider>;

/// Lazily resolves the [Metadata] of a bindings stream.
///
/// Providers are expected to cache their result. The join subsystem only reads metadata, it never
/// modifies it.
#[async_trait]
pub trait MetadataProvider: Debug + Send + Sync {
    /// Resolves the current metadata.
    async fn metadata(&self) -> JoinResult<Metadata>;

    /// Returns a handle that signals when the metadata returned by [Self::metadata] became stale.
    ///
    /// Providers whose metadata never changes return [None].
    fn validation_state(&self) -> Option<MetadataValidationState> {
        None
    }
}

/// Tracks whether a previously resolved [Metadata] is still accurate.
///
/// Once invalidated, a state never becomes valid again. Providers hand out a new state together
/// with the refreshed metadata.
#[derive(Clone, Debug, Default)]
pub struct MetadataValidationState {
    inner: Arc<ValidationStateInner>,
}

#[derive(Debug, Default)]
struct ValidationStateInner {
    invalidated: AtomicBool,
    notify: Notify,
}

impl MetadataValidationState {
    /// Creates a new, valid state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the metadata is still accurate.
    pub fn is_valid(&self) -> bool {
        !self.inner.invalidated.load(Ordering::Acquire)
    }

    /// Marks the metadata as stale and wakes everyone waiting in [Self::invalidated].
    pub fn invalidate(&self) {
        if !self.inner.invalidated.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns a future that completes once the state has been invalidated.
    pub fn invalidated(&self) -> impl Future<Output = ()> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        async move {
            loop {
                // Register before checking the flag, so that no notification can be missed.
                let notified = inner.notify.notified();
                if inner.invalidated.load(Ordering::Acquire) {
                    return;
                }
                notified.await;
            }
        }
    }
}

/// A [MetadataProvider] with a fixed value.
#[derive(Debug, Clone)]
pub struct StaticMetadata {
    metadata: Metadata,
}

impl StaticMetadata {
    /// Creates a new [StaticMetadata].
    pub fn new(metadata: Metadata) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadata {
    async fn metadata(&self) -> JoinResult<Metadata> {
        Ok(self.metadata.clone())
    }
}

/// A [MetadataProvider] whose value is refined while its source is consumed.
///
/// Sources whose size is only known after some pages were fetched (e.g., hypermedia
/// collections) publish better statistics via [MutableMetadata::update]. Every update invalidates
/// the previously handed out [MetadataValidationState].
#[derive(Debug)]
pub struct MutableMetadata {
    current: RwLock<(Metadata, MetadataValidationState)>,
}

impl MutableMetadata {
    /// Creates a new [MutableMetadata] with an initial value.
    pub fn new(metadata: Metadata) -> Self {
        Self {
            current: RwLock::new((metadata, MetadataValidationState::new())),
        }
    }

    /// Replaces the metadata and invalidates the previous value.
    pub fn update(&self, metadata: Metadata) {
        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, (metadata, MetadataValidationState::new()))
        };
        previous.1.invalidate();
    }
}

#[async_trait]
impl MetadataProvider for MutableMetadata {
    async fn metadata(&self) -> JoinResult<Metadata> {
        Ok(self.current.read().0.clone())
    }

    fn validation_state(&self) -> Option<MetadataValidationState> {
        Some(self.current.read().1.clone())
    }
}

/// Computes the metadata of an operator from the metadata of its inputs.
pub type MetadataDerivation = Box<dyn Fn(&[Metadata]) -> Metadata + Send + Sync>;

/// A [MetadataProvider] that resolves once all its inputs resolved.
///
/// The result is computed at most once.
pub struct DerivedMetadata {
    inputs: Vec<MetadataRef>,
    derivation: MetadataDerivation,
    cached: OnceCell<Metadata>,
}

impl DerivedMetadata {
    /// Creates a new [DerivedMetadata].
    pub fn new(
        inputs: Vec<MetadataRef>,
        derivation: impl Fn(&[Metadata]) -> Metadata + Send + Sync + 'static,
    ) -> Self {
        Self {
            inputs,
            derivation: Box::new(derivation),
            cached: OnceCell::new(),
        }
    }
}

impl Debug for DerivedMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedMetadata")
            .field("inputs", &self.inputs)
            .field("cached", &self.cached.get())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataProvider for DerivedMetadata {
    async fn metadata(&self) -> JoinResult<Metadata> {
        let metadata = self
            .cached
            .get_or_try_init(|| async {
                let mut resolved = Vec::with_capacity(self.inputs.len());
                for input in &self.inputs {
                    resolved.push(input.metadata().await?);
                }
                Ok::<_, crate::JoinError>((self.derivation)(&resolved))
            })
            .await?;
        Ok(metadata.clone())
    }
}
