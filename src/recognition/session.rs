//! Continuous listening session
//!
//! Recognition engines deliver bounded streams. The session restarts the
//! engine whenever a stream ends while the user still wants to listen, and
//! every restart is a cancellable scheduled task so `stop` can't race it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::{EventReceiver, EventSender, RecognitionEngine, RecognitionError, RecognitionEvent};
use crate::config::TimingConfig;
use crate::executor::{CommandExecutor, CommandOutcome};
use crate::kitchen::{Kitchen, Notification};
use crate::speech::Priority;
use crate::{Error, Result};

const ACTIVATION_TEXT: &str = "Voice assistant activated. I'm ready for your commands!";

/// Lifecycle phase of a [`RecognitionSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    /// Waiting for the engine to confirm a (re)start
    Starting,
    Listening,
    Stopping,
}

impl SessionPhase {
    /// Whether the user currently wants the session running
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Listening)
    }
}

/// Requests from the UI or CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Start,
    Stop,
}

/// Drives a recognition engine and dispatches final transcripts
pub struct RecognitionSession {
    kitchen: Arc<Kitchen>,
    executor: CommandExecutor,
    engine: Arc<dyn RecognitionEngine>,
    events: EventSender,
    timing: TimingConfig,
    phase: SessionPhase,
    /// Scheduled engine start or restart
    pending_start: Option<JoinHandle<()>>,
    /// Speak the activation message on the next `Started`
    announce: bool,
    commands: JoinSet<CommandOutcome>,
}

impl std::fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("phase", &self.phase)
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl RecognitionSession {
    /// Create a session over `engine`
    ///
    /// `events` must be the sender the engine reports on; the session uses
    /// it to report a failed start as an ended stream.
    #[must_use]
    pub fn new(
        kitchen: Arc<Kitchen>,
        engine: Arc<dyn RecognitionEngine>,
        events: EventSender,
        timing: TimingConfig,
    ) -> Self {
        if engine.is_supported() {
            kitchen.update_session(|s| {
                s.is_supported = true;
                s.voice_status = "Ready".to_string();
            });
            kitchen.notify(Notification::info(
                "🎤 Voice Assistant Ready",
                "Click the microphone button to start voice commands",
            ));
        } else {
            tracing::warn!("speech recognition not supported");
            kitchen.update_session(|s| {
                s.is_supported = false;
                s.voice_status = "Speech recognition not supported".to_string();
            });
            kitchen.notify(Notification::destructive(
                "Voice Not Supported",
                "Speech recognition is not supported in this environment",
            ));
        }

        Self {
            executor: CommandExecutor::new(Arc::clone(&kitchen)),
            kitchen,
            engine,
            events,
            timing,
            phase: SessionPhase::Idle,
            pending_start: None,
            announce: false,
            commands: JoinSet::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Begin listening
    ///
    /// Only valid from [`SessionPhase::Idle`]; otherwise a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the engine is unavailable
    pub fn start(&mut self) -> Result<()> {
        if !self.engine.is_supported() {
            self.kitchen.notify(Notification::destructive(
                "Voice Recognition Unavailable",
                "Speech recognition is not supported in this environment",
            ));
            return Err(Error::Unsupported);
        }

        if self.phase != SessionPhase::Idle {
            tracing::debug!(phase = ?self.phase, "start ignored, session already active");
            return Ok(());
        }

        tracing::info!("starting voice session");

        self.phase = SessionPhase::Starting;
        self.announce = true;
        self.kitchen.update_session(|s| {
            s.is_listening = true;
            s.transcript.clear();
            s.confidence = 0.0;
            s.voice_status = "Starting...".to_string();
        });
        self.schedule_start(self.timing.start_delay);

        Ok(())
    }

    /// Stop listening
    ///
    /// Cancels any scheduled restart and every dispatched command, flushes
    /// speech output and halts the engine. A no-op when already idle.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Idle {
            return;
        }

        tracing::info!("stopping voice session");

        self.phase = SessionPhase::Stopping;
        self.kitchen.update_session(|s| {
            s.is_listening = false;
            s.transcript.clear();
            s.voice_status = "Stopped".to_string();
        });
        self.cancel_pending_start();
        // Commands first, or a reply queues its next line behind the clear
        self.commands.abort_all();
        self.kitchen.clear_speech_queue();
        if let Err(e) = self.engine.stop() {
            tracing::warn!(error = %e, "failed to stop recognition engine");
        }
        self.phase = SessionPhase::Idle;
    }

    /// Apply one engine event
    pub fn handle_event(&mut self, event: RecognitionEvent) {
        self.sync_listening();

        match event {
            RecognitionEvent::Started => self.on_started(),
            RecognitionEvent::Result {
                transcript,
                is_final,
                confidence,
            } => self.on_result(transcript, is_final, confidence),
            RecognitionEvent::Error(error) => self.on_error(error),
            RecognitionEvent::Ended => self.on_ended(),
        }
    }

    /// Wait for every dispatched command to finish
    pub async fn wait_for_commands(&mut self) {
        while let Some(result) = self.commands.join_next().await {
            log_command_result(result);
        }
        self.sync_listening();
    }

    /// Run until `controls` closes, then stop and drain commands
    pub async fn run(
        mut self,
        mut events: EventReceiver,
        mut controls: mpsc::Receiver<SessionControl>,
    ) {
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_event(event),
                control = controls.recv() => match control {
                    Some(SessionControl::Start) => {
                        if let Err(e) = self.start() {
                            tracing::warn!(error = %e, "cannot start voice session");
                        }
                    }
                    Some(SessionControl::Stop) => self.stop(),
                    None => break,
                },
                Some(result) = self.commands.join_next(), if !self.commands.is_empty() => {
                    log_command_result(result);
                    self.sync_listening();
                }
            }
        }

        self.stop();
        self.wait_for_commands().await;
        tracing::debug!("voice session finished");
    }

    fn on_started(&mut self) {
        if self.phase != SessionPhase::Starting {
            tracing::debug!(phase = ?self.phase, "ignoring stale start");
            return;
        }

        self.phase = SessionPhase::Listening;
        self.kitchen
            .update_session(|s| s.voice_status = "Listening...".to_string());
        tracing::debug!("recognition listening");

        if std::mem::take(&mut self.announce) {
            self.kitchen.say(ACTIVATION_TEXT, Priority::High);
            self.kitchen.notify(Notification::info(
                "🎤 Voice Assistant Active",
                "Listening for your commands...",
            ));
        }
    }

    fn on_result(&mut self, transcript: String, is_final: bool, confidence: f32) {
        if !self.phase.is_active() {
            tracing::debug!("ignoring transcript while idle");
            return;
        }

        self.kitchen
            .update_session(|s| s.transcript.clone_from(&transcript));

        if !is_final || transcript.trim().is_empty() {
            return;
        }

        self.kitchen.update_session(|s| s.confidence = confidence);
        tracing::info!(transcript = %transcript, confidence, "final transcript");

        let executor = self.executor.clone();
        self.commands
            .spawn(async move { executor.process_command(&transcript).await });

        while let Some(result) = self.commands.try_join_next() {
            log_command_result(result);
        }
    }

    fn on_error(&mut self, error: RecognitionError) {
        let status = format!("Error: {}", error.code());
        self.kitchen
            .update_session(|s| s.voice_status.clone_from(&status));

        if error == RecognitionError::NotAllowed {
            let err = Error::from(error);
            tracing::error!(error = %err, "recognition stopped");
            self.kitchen.notify(Notification::destructive(
                "Microphone Access Denied",
                "Please allow microphone access to use voice commands",
            ));
            self.kitchen.update_session(|s| s.is_listening = false);
            self.cancel_pending_start();
            self.phase = SessionPhase::Idle;
        } else {
            tracing::warn!(error = %error, "recognition error");
        }
    }

    fn on_ended(&mut self) {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Stopping => {
                self.phase = SessionPhase::Idle;
            }
            SessionPhase::Starting | SessionPhase::Listening => {
                if self.kitchen.session().is_listening {
                    tracing::debug!("recognition ended, restarting");
                    self.phase = SessionPhase::Starting;
                    self.schedule_start(self.timing.restart_delay);
                } else {
                    self.phase = SessionPhase::Idle;
                }
            }
        }
    }

    /// Halt if a command turned listening off
    fn sync_listening(&mut self) {
        if self.phase.is_active() && !self.kitchen.session().is_listening {
            tracing::debug!("listening disabled, halting recognition");
            self.cancel_pending_start();
            if let Err(e) = self.engine.stop() {
                tracing::warn!(error = %e, "failed to stop recognition engine");
            }
            self.phase = SessionPhase::Idle;
        }
    }

    fn schedule_start(&mut self, delay: Duration) {
        self.cancel_pending_start();

        let kitchen = Arc::clone(&self.kitchen);
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();

        self.pending_start = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if !kitchen.session().is_listening {
                return;
            }

            if let Err(e) = engine.start() {
                tracing::error!(error = %e, "failed to start recognition");
                kitchen.update_session(|s| {
                    s.is_listening = false;
                    s.voice_status = "Error starting recognition".to_string();
                });
                let _ = events.send(RecognitionEvent::Ended);
            }
        }));
    }

    fn cancel_pending_start(&mut self) {
        if let Some(handle) = self.pending_start.take() {
            handle.abort();
        }
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.cancel_pending_start();
    }
}

fn log_command_result(result: std::result::Result<CommandOutcome, tokio::task::JoinError>) {
    match result {
        Ok(outcome) => {
            tracing::debug!(
                intent = outcome.intent.kind(),
                success = outcome.success,
                "command finished"
            );
        }
        Err(e) if e.is_cancelled() => tracing::debug!("command cancelled"),
        Err(e) => tracing::error!(error = %e, "command task failed"),
    }
}
