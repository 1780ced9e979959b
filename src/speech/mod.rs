//! Speech output
//!
//! Spoken responses are serialized through a [`SpeechQueue`] that plays one
//! utterance at a time on a [`SpeechEngine`].

mod engine;
mod queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use engine::{CommandSpeechEngine, ConsoleSpeechEngine};
pub use queue::{SpeechQueue, SpeechTicket};

use crate::Result;
use crate::config::VoiceConfig;

/// Speech queue priority tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Jumps to the front of the pending queue
    High,
    /// Appended to the end of the pending queue
    #[default]
    Normal,
}

/// Voice parameters applied to every utterance
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    /// BCP 47 language tag
    pub language: String,
    /// Speaking rate multiplier
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

impl From<&VoiceConfig> for SpeechSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            language: config.language.clone(),
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// Text-to-speech backend
///
/// `speak` resolves when the utterance has finished playing. The queue
/// treats an error the same as completion. Dropping the `speak` future
/// must stop playback.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak a single utterance
    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<()>;

    /// Halt any in-flight utterance
    fn cancel(&self);
}
