use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use rdf_federation_common::{BindingsStream, JoinError, JoinResult};
use rdf_federation_model::Bindings;
use std::collections::VecDeque;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Shares a single bindings stream between several readers.
///
/// The source is pulled on demand by whichever reader needs the next binding. Pulled bindings are
/// buffered, so a reader that is created later replays everything from the start. Once
/// [ReplayableBindings::release_history] is called, bindings are discarded as soon as they have
/// been read. From then on, only a single reader may remain.
#[derive(Clone)]
pub struct ReplayableBindings {
    state: Arc<Mutex<ReplayState>>,
}

struct ReplayState {
    source: Option<BindingsStream>,
    /// The bindings that have been pulled from the source and are still retained.
    buffer: VecDeque<Bindings>,
    /// The position of the first element of `buffer` in the source stream.
    offset: usize,
    retain: bool,
    terminal: Option<Terminal>,
    waiters: Vec<Waker>,
}

#[derive(Clone)]
enum Terminal {
    Ended,
    Failed(JoinError),
}

impl ReplayState {
    fn wake_all(&mut self) {
        for waker in self.waiters.drain(..) {
            waker.wake();
        }
    }

    fn register(&mut self, waker: &Waker) {
        if !self.waiters.iter().any(|w| w.will_wake(waker)) {
            self.waiters.push(waker.clone());
        }
    }
}

impl ReplayableBindings {
    /// Creates a new [ReplayableBindings] that replays `source`.
    pub fn new(source: BindingsStream) -> Self {
        let state = ReplayState {
            source: Some(source),
            buffer: VecDeque::new(),
            offset: 0,
            retain: true,
            terminal: None,
            waiters: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Creates a reader that starts at the oldest retained binding.
    pub fn reader(&self) -> ReplayReader {
        let position = self.state.lock().offset;
        ReplayReader {
            state: Arc::clone(&self.state),
            position,
            finished: false,
        }
    }

    /// Stops retaining bindings for future readers.
    pub fn release_history(&self) {
        self.state.lock().retain = false;
    }

    /// Returns the number of bindings that are currently buffered.
    pub fn buffered(&self) -> usize {
        self.state.lock().buffer.len()
    }
}

impl Debug for ReplayableBindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplayableBindings")
            .field("buffered", &state.buffer.len())
            .field("offset", &state.offset)
            .field("retain", &state.retain)
            .finish_non_exhaustive()
    }
}

/// A reader of a [ReplayableBindings].
pub struct ReplayReader {
    state: Arc<Mutex<ReplayState>>,
    position: usize,
    finished: bool,
}

impl Stream for ReplayReader {
    type Item = JoinResult<Bindings>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        let this = &mut *self;
        let mut state = this.state.lock();
        loop {
            this.position = this.position.max(state.offset);
            if let Some(bindings) = state.buffer.get(this.position - state.offset).cloned() {
                this.position += 1;
                if !state.retain {
                    while state.offset < this.position && state.buffer.pop_front().is_some() {
                        state.offset += 1;
                    }
                }
                return Poll::Ready(Some(Ok(bindings)));
            }

            if let Some(terminal) = state.terminal.clone() {
                this.finished = true;
                return Poll::Ready(match terminal {
                    Terminal::Ended => None,
                    Terminal::Failed(error) => Some(Err(error)),
                });
            }

            let Some(source) = state.source.as_mut() else {
                this.finished = true;
                return Poll::Ready(None);
            };
            match source.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bindings))) => {
                    state.buffer.push_back(bindings);
                    state.wake_all();
                }
                Poll::Ready(Some(Err(error))) => {
                    state.source = None;
                    state.terminal = Some(Terminal::Failed(error));
                    state.wake_all();
                }
                Poll::Ready(None) => {
                    state.source = None;
                    state.terminal = Some(Terminal::Ended);
                    state.wake_all();
                }
                Poll::Pending => {
                    // The source only remembers the waker of the last reader that polled it.
                    state.register(cx.waker());
                    return Poll::Pending;
                }
            }
        }
    }
}

impl Drop for ReplayReader {
    fn drop(&mut self) {
        // Another reader may be waiting for a binding that this reader would have pulled.
        self.state.lock().wake_all();
    }
}
