//! Typed-input recognition engine
//!
//! Treats each non-blank line on stdin as a final transcript while the
//! engine is listening. Lines typed while stopped are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use super::{EventSender, RecognitionEngine, RecognitionEvent};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Shared {
    listening: AtomicBool,
    reader_started: AtomicBool,
    closed: AtomicBool,
    eof: Notify,
}

/// Reads commands from standard input
#[derive(Debug, Clone)]
pub struct StdinRecognitionEngine {
    events: EventSender,
    shared: Arc<Shared>,
}

impl StdinRecognitionEngine {
    #[must_use]
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Resolves once stdin has been closed
    pub async fn closed(&self) {
        let notified = self.shared.eof.notified();
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }

    fn spawn_reader(&self) {
        if self.shared.reader_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if !shared.listening.load(Ordering::SeqCst) {
                            tracing::debug!(line, "not listening, input ignored");
                            continue;
                        }
                        let _ = events.send(RecognitionEvent::Result {
                            transcript: line.to_string(),
                            is_final: true,
                            confidence: 1.0,
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }

            tracing::debug!("stdin closed");
            shared.closed.store(true, Ordering::SeqCst);
            if shared.listening.swap(false, Ordering::SeqCst) {
                let _ = events.send(RecognitionEvent::Ended);
            }
            shared.eof.notify_waiters();
        });
    }
}

impl RecognitionEngine for StdinRecognitionEngine {
    fn start(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::Recognition("input closed".to_string()));
        }

        self.spawn_reader();
        self.shared.listening.store(true, Ordering::SeqCst);
        self.events
            .send(RecognitionEvent::Started)
            .map_err(|_| Error::Recognition("session gone".to_string()))
    }

    fn stop(&self) -> Result<()> {
        if self.shared.listening.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(RecognitionEvent::Ended);
        }
        Ok(())
    }
}
