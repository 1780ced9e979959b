//! Text-to-speech engines

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{SpeechEngine, SpeechSettings};
use crate::{Error, Result};

/// Average conversational speaking rate at rate 1.0
const WORDS_PER_MINUTE: f32 = 160.0;

/// Prints utterances and waits roughly as long as speaking them would take
#[derive(Debug, Default)]
pub struct ConsoleSpeechEngine {
    /// Skip the simulated speaking time
    instant: bool,
}

impl ConsoleSpeechEngine {
    /// Create an engine that simulates speaking time
    #[must_use]
    pub const fn new() -> Self {
        Self { instant: false }
    }

    /// Create an engine that completes immediately
    #[must_use]
    pub const fn instant() -> Self {
        Self { instant: true }
    }

    #[allow(clippy::cast_precision_loss)]
    fn speaking_time(text: &str, settings: &SpeechSettings) -> Duration {
        let words = text.split_whitespace().count() as f32;
        let rate = settings.rate.max(0.1);
        Duration::from_secs_f32(words * 60.0 / (WORDS_PER_MINUTE * rate))
    }
}

#[async_trait]
impl SpeechEngine for ConsoleSpeechEngine {
    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<()> {
        println!("🔊 {text}");

        if !self.instant {
            tokio::time::sleep(Self::speaking_time(text, settings)).await;
        }

        Ok(())
    }

    fn cancel(&self) {}
}

/// Speaks through an external TTS program such as `espeak` or `say`
///
/// Each utterance runs one child process. Dropping the `speak` future
/// kills the child, which is how an interrupted utterance is halted.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    program: String,
}

impl CommandSpeechEngine {
    /// Create an engine for `program`
    ///
    /// # Errors
    ///
    /// Returns error if the program name is empty
    pub fn new(program: impl Into<String>) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(Error::Config("TTS command must not be empty".to_string()));
        }

        tracing::debug!(program = %program, "command speech engine initialized");
        Ok(Self { program })
    }

    /// Command-line arguments for one utterance
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn args(&self, text: &str, settings: &SpeechSettings) -> Vec<String> {
        let name = Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program);

        match name {
            "espeak" | "espeak-ng" => vec![
                "-v".to_string(),
                settings.language.to_lowercase(),
                "-s".to_string(),
                ((175.0 * settings.rate).round() as u32).to_string(),
                "-p".to_string(),
                ((50.0 * settings.pitch).round().clamp(0.0, 99.0) as u32).to_string(),
                "-a".to_string(),
                ((200.0 * settings.volume).round().clamp(0.0, 200.0) as u32).to_string(),
                text.to_string(),
            ],
            "say" => vec![
                "-r".to_string(),
                ((WORDS_PER_MINUTE * settings.rate).round() as u32).to_string(),
                text.to_string(),
            ],
            _ => vec![text.to_string()],
        }
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(self.args(text, settings))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Speech(format!("failed to start {}: {e}", self.program)))?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::Speech(format!("{} exited with {status}", self.program)));
        }

        Ok(())
    }

    fn cancel(&self) {}
}
