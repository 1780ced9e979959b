//! Priority speech queue
//!
//! Pending utterances form a single list. High priority requests are
//! inserted at the front, normal requests at the back. One utterance plays
//! at a time and an in-flight utterance is never preempted except by
//! [`SpeechQueue::clear`].

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use super::{Priority, SpeechEngine, SpeechSettings};

/// Resolves once its utterance has been played or discarded
#[derive(Debug)]
pub struct SpeechTicket {
    rx: oneshot::Receiver<()>,
}

impl SpeechTicket {
    fn resolved() -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        Self { rx }
    }
}

impl Future for SpeechTicket {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender also counts as done
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

struct PendingSpeech {
    text: String,
    done: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<PendingSpeech>,
    /// An utterance is being played
    playing: bool,
    /// Completion handle of the utterance being played
    current: Option<oneshot::Sender<()>>,
    /// A drain task is running
    draining: bool,
}

struct Inner {
    engine: Arc<dyn SpeechEngine>,
    settings: SpeechSettings,
    gap: Duration,
    state: Mutex<QueueState>,
    /// Bumped by every clear so the drain task can abandon playback
    generation: watch::Sender<u64>,
}

/// Serializes spoken output through a single engine
///
/// Cloning yields another handle to the same queue. Enqueueing spawns a
/// drain task on the current tokio runtime when none is running.
#[derive(Clone)]
pub struct SpeechQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("pending", &self.pending_len())
            .field("speaking", &self.is_speaking())
            .finish_non_exhaustive()
    }
}

impl SpeechQueue {
    /// Create a queue playing through `engine`
    ///
    /// `gap` is the pause between consecutive utterances.
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>, settings: SpeechSettings, gap: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                engine,
                settings,
                gap,
                state: Mutex::new(QueueState::default()),
                generation,
            }),
        }
    }

    /// Queue `text` for playback
    ///
    /// The returned ticket resolves when this utterance has finished
    /// playing, failed, or been discarded by [`clear`](Self::clear).
    /// Blank text is not queued and its ticket is already resolved.
    pub fn enqueue(&self, text: impl Into<String>, priority: Priority) -> SpeechTicket {
        let text = text.into();
        if text.trim().is_empty() {
            return SpeechTicket::resolved();
        }

        let (done, rx) = oneshot::channel();
        self.push(text, priority, Some(done));
        SpeechTicket { rx }
    }

    /// Queue `text` without waiting for it
    pub fn say(&self, text: impl Into<String>, priority: Priority) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.push(text, priority, None);
        }
    }

    fn push(&self, text: String, priority: Priority, done: Option<oneshot::Sender<()>>) {
        tracing::debug!(text = %text, ?priority, "queueing speech");

        let item = PendingSpeech { text, done };

        let start_drain = {
            let mut state = self.inner.lock();
            match priority {
                Priority::High => state.pending.push_front(item),
                Priority::Normal => state.pending.push_back(item),
            }
            !std::mem::replace(&mut state.draining, true)
        };

        if start_drain {
            tokio::spawn(Arc::clone(&self.inner).drain());
        }
    }

    /// Queue `text` and wait until it has been played or discarded
    pub async fn speak(&self, text: impl Into<String>, priority: Priority) {
        self.enqueue(text, priority).await;
    }

    /// Discard every pending utterance and halt the one playing
    ///
    /// All outstanding tickets resolve. New requests are accepted
    /// immediately afterwards.
    pub fn clear(&self) {
        let (discarded, interrupted, current) = {
            let mut state = self.inner.lock();
            let discarded: Vec<PendingSpeech> = state.pending.drain(..).collect();
            let interrupted = std::mem::take(&mut state.playing);
            let current = state.current.take();
            self.inner.generation.send_modify(|g| *g = g.wrapping_add(1));
            (discarded, interrupted, current)
        };

        if interrupted {
            self.inner.engine.cancel();
        }

        tracing::debug!(
            discarded = discarded.len(),
            interrupted,
            "speech queue cleared"
        );

        for done in discarded.into_iter().filter_map(|item| item.done) {
            let _ = done.send(());
        }
        if let Some(done) = current {
            let _ = done.send(());
        }
    }

    /// Whether an utterance is playing or waiting to play
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        let state = self.inner.lock();
        state.draining || state.playing
    }

    /// Number of utterances waiting to play
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let mut cleared = self.generation.subscribe();

            let text = {
                let mut state = self.lock();
                let Some(item) = state.pending.pop_front() else {
                    state.draining = false;
                    return;
                };
                state.playing = true;
                state.current = item.done;
                let _ = cleared.borrow_and_update();
                item.text
            };

            tracing::trace!(text = %text, "speaking");

            tokio::select! {
                result = self.engine.speak(&text, &self.settings) => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, text = %text, "speech playback failed");
                    }
                }
                _ = cleared.changed() => {
                    tracing::debug!(text = %text, "speech interrupted");
                }
            }

            let more = {
                let mut state = self.lock();
                state.playing = false;
                if let Some(done) = state.current.take() {
                    let _ = done.send(());
                }
                if state.pending.is_empty() {
                    state.draining = false;
                    false
                } else {
                    true
                }
            };

            if !more {
                return;
            }

            if !self.gap.is_zero() {
                tokio::time::sleep(self.gap).await;
            }
        }
    }
}
