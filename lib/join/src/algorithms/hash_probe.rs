use crate::index::BindingsIndex;
use futures::{Stream, StreamExt};
use rdf_federation_common::{BindingsStream, JoinError, JoinResult};
use rdf_federation_model::{Bindings, Variable};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// How a [HashProbeJoinStream] treats a probing binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeMode {
    /// Emits the merge with each compatible indexed binding.
    Inner,
    /// Like [ProbeMode::Inner], but emits the probing binding unchanged if nothing matches.
    Optional,
    /// Emits the probing binding only if no indexed binding is compatible with it and binds one of
    /// its variables.
    Minus,
}

/// A blocking hash join. Materializes the build side into a [BindingsIndex] and then streams the
/// probe side through it.
pub struct HashProbeJoinStream {
    build: Option<BindingsStream>,
    probe: Option<BindingsStream>,
    index: BindingsIndex<Bindings>,
    pending: VecDeque<Bindings>,
    mode: ProbeMode,
}

impl HashProbeJoinStream {
    /// Creates a new [HashProbeJoinStream] that indexes `build` on `keys`.
    ///
    /// Without keys, every probing binding is checked against the whole build side.
    pub fn new(
        build: BindingsStream,
        probe: BindingsStream,
        keys: Vec<Variable>,
        mode: ProbeMode,
    ) -> Self {
        Self {
            build: Some(build),
            probe: Some(probe),
            index: BindingsIndex::new(keys),
            pending: VecDeque::new(),
            mode,
        }
    }

    fn close(&mut self) {
        self.build = None;
        self.probe = None;
        self.index = BindingsIndex::new(Vec::new());
        self.pending.clear();
    }

    fn fail(&mut self, error: JoinError) -> Poll<Option<JoinResult<Bindings>>> {
        self.close();
        Poll::Ready(Some(Err(error)))
    }

    fn probe(&mut self, bindings: Bindings) {
        let candidates = self.index.get(&bindings);
        match self.mode {
            ProbeMode::Inner => {
                let merged = candidates.iter().filter_map(|c| bindings.merge(c));
                self.pending.extend(merged);
            }
            ProbeMode::Optional => {
                let before = self.pending.len();
                let merged = candidates.iter().filter_map(|c| bindings.merge(c));
                self.pending.extend(merged);
                if self.pending.len() == before {
                    self.pending.push_back(bindings);
                }
            }
            ProbeMode::Minus => {
                let removed = candidates
                    .iter()
                    .any(|c| bindings.shares_variable(c) && bindings.is_compatible(c));
                if !removed {
                    self.pending.push_back(bindings);
                }
            }
        }
    }
}

impl Stream for HashProbeJoinStream {
    type Item = JoinResult<Bindings>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(bindings) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(bindings)));
            }

            if let Some(build) = self.build.as_mut() {
                match build.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => {
                        if let Err(error) = self.index.insert(bindings) {
                            return self.fail(error);
                        }
                    }
                    Poll::Ready(Some(Err(error))) => return self.fail(error),
                    Poll::Ready(None) => {
                        self.build = None;
                        if self.mode == ProbeMode::Inner && self.index.is_empty() {
                            self.close();
                        }
                    }
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }

            let Some(probe) = self.probe.as_mut() else {
                return Poll::Ready(None);
            };
            match probe.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bindings))) => self.probe(bindings),
                Poll::Ready(Some(Err(error))) => return self.fail(error),
                Poll::Ready(None) => {
                    self.close();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
